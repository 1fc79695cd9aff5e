//! Contamination engine - pollution state machine per column.
//!
//! Checks run in a fixed priority order (dead creature, then poisonous
//! item, then lateral neighbor) and short-circuit on the first transition
//! found, so at most one transition is applied per column per tick.
//! Transitions are one-directional: nothing here ever cleans a column.

use crate::codec::needed_blocks;
use crate::components::*;
use crate::config::WellConfig;
use crate::shaft::retention_depth;
use crate::world::{Aabb, Block, EntityKind, WorldEntity, WorldResource};
use bevy_ecs::prelude::*;

/// Whether any entity of `kind` has a collision volume intersecting an
/// occupied column cell.
fn overlapping_entity(
    entities: &[WorldEntity],
    cells: &[BlockPos],
    kind: EntityKind,
) -> bool {
    entities.iter().any(|entity| {
        entity.kind == kind
            && cells
                .iter()
                .any(|cell| entity.aabb.intersects(&Aabb::of_block(*cell)))
    })
}

/// Non-clean state of a laterally adjacent column of the same water family,
/// checked for every occupied level against its four horizontal neighbors.
fn neighbor_state(
    world: &WorldResource,
    cells: &[BlockPos],
    quality: &WaterQuality,
) -> Option<Contamination> {
    for cell in cells {
        for neighbor in cell.horizontal_neighbors() {
            if let Block::WellWater(w) = world.block_at(neighbor) {
                if w.kind == quality.kind
                    && w.contamination.is_polluted()
                    && w.contamination != quality.contamination
                {
                    return Some(w.contamination);
                }
            }
        }
    }
    None
}

/// Next contamination state for a column, if any trigger fires this tick.
pub fn evaluate_contamination(
    world: &WorldResource,
    config: &WellConfig,
    spring: BlockPos,
    quality: &WaterQuality,
    occupied: u32,
) -> Option<Contamination> {
    if !quality.contamination.can_degrade() || occupied == 0 {
        return None;
    }
    let cells: Vec<BlockPos> = (0..occupied).map(|i| spring.up(i as i32 + 1)).collect();
    let radius = occupied as f64 + config.entity_scan_margin;
    let entities = world.entities_near(spring, radius);

    if overlapping_entity(&entities, &cells, EntityKind::DeadCreature) {
        return Some(Contamination::Tainted);
    }
    if overlapping_entity(&entities, &cells, EntityKind::PoisonItem) {
        return Some(Contamination::Poisoned);
    }
    neighbor_state(world, &cells, quality)
}

/// Per-tick pollution scan over all columns.
pub fn contamination_system(
    config: Res<WellConfig>,
    world: Res<WorldResource>,
    mut query: Query<(
        &SpringPos,
        &Shaft,
        &WaterStore,
        &mut WaterQuality,
        &mut ColumnDirty,
    )>,
) {
    for (pos, shaft, store, mut quality, mut dirty) in query.iter_mut() {
        let depth = retention_depth(shaft, &config);
        let occupied = needed_blocks(store.total_liters, quality.contamination, depth);
        if let Some(next) = evaluate_contamination(&world, &config, pos.0, &quality, occupied) {
            log::debug!(
                "column at {:?} degrades {:?} -> {next:?}",
                pos.0,
                quality.contamination
            );
            quality.contamination = next;
            dirty.mark();
        }
    }
}
