//! Spring production - per-tick accumulation of fractional liters.
//!
//! Each spring runs in one of two mutually exclusive modes. Shallow wells
//! mirror whichever surface water sits nearby and always produce muddy
//! water; aquifer wells draw an equal share of their chunk's rating. Rates
//! are liters per in-game day, so production follows the game calendar and
//! idle catch-up deltas are applied as-is, with no cap.

use crate::aquifer::AquiferRegistry;
use crate::codec::try_change_volume;
use crate::components::*;
use crate::config::{Calendar, WellConfig};
use crate::shaft::retention_depth;
use crate::world::{Block, WorldResource};
use bevy_ecs::prelude::*;

/// Scan the cube of `radius` around `pos` (excluding the center) for
/// surface water. Fresh is preferred over salt when both are present.
pub fn find_surface_water(world: &WorldResource, pos: BlockPos, radius: i32) -> Option<WaterKind> {
    let mut salt_seen = false;
    for dx in -radius..=radius {
        for dy in -radius..=radius {
            for dz in -radius..=radius {
                if dx == 0 && dy == 0 && dz == 0 {
                    continue;
                }
                let probe = BlockPos::new(pos.x + dx, pos.y + dy, pos.z + dz);
                match world.block_at(probe) {
                    Block::SurfaceWater(WaterKind::Fresh) => return Some(WaterKind::Fresh),
                    Block::SurfaceWater(WaterKind::Salt) => salt_seen = true,
                    _ => {}
                }
            }
        }
    }
    salt_seen.then_some(WaterKind::Salt)
}

/// System producing liters for every spring from elapsed calendar days.
///
/// Unloaded chunks pause production silently: `last_simulated_day` is left
/// untouched so the next loaded tick computes the full catch-up delta.
pub fn spring_production_system(
    calendar: Res<Calendar>,
    config: Res<WellConfig>,
    registry: Res<AquiferRegistry>,
    world: Res<WorldResource>,
    mut query: Query<(
        &SpringPos,
        &SpringOrigin,
        &Shaft,
        &mut WaterStore,
        &mut WaterQuality,
        &mut ColumnDirty,
    )>,
) {
    for (pos, origin, shaft, mut store, mut quality, mut dirty) in query.iter_mut() {
        let elapsed = calendar.total_days - store.last_simulated_day;
        if elapsed < config.min_tick_days {
            continue;
        }
        if !world.is_chunk_loaded(pos.0.chunk()) {
            continue;
        }

        let mut rate = 0.0;
        if origin.is_shallow {
            if let Some(kind) = find_surface_water(&world, pos.0, config.shallow_scan_radius) {
                rate = config.shallow_liters_per_day;
                if quality.kind != kind {
                    quality.kind = kind;
                    dirty.mark();
                }
                // Shallow water is always muddy, but a tainted or poisoned
                // column never improves on its own.
                if quality.contamination == Contamination::Clean {
                    quality.contamination = Contamination::Muddy;
                    dirty.mark();
                }
            }
        } else if let Some(record) = registry.record(pos.0.chunk()) {
            let count = registry.spring_count(pos.0.chunk());
            if record.rating > 0 && count > 0 {
                let share = record.rating as f64 / count as f64;
                rate = (share * config.output_ratio).max(0.0) * config.global_multiplier;
                let kind = if record.salty {
                    WaterKind::Salt
                } else {
                    WaterKind::Fresh
                };
                if quality.kind != kind {
                    quality.kind = kind;
                    dirty.mark();
                }
            }
        }

        store.last_simulated_day = calendar.total_days;
        store.accumulated_fraction += rate * elapsed;

        if store.accumulated_fraction >= 1.0 {
            let whole = store.accumulated_fraction.floor();
            store.accumulated_fraction -= whole;
            let depth = retention_depth(shaft, &config);
            let applied =
                try_change_volume(&mut *store, quality.contamination, depth, whole as i64);
            if applied > 0 {
                dirty.mark();
            }
        }
    }
}
