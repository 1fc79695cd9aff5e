//! Column synchronization - making world blocks match spring state.
//!
//! World blocks persist independently of a spring's in-memory liters, and
//! other code paths (other mods, direct world edits) can desync the two.
//! Synchronization rewrites the column to match `total_liters`, water kind,
//! and contamination exactly; reconciliation runs on a slower cadence and
//! favors the observed world state over the stored scalar, since the world
//! is the durable source of truth for player-visible state.

use crate::codec::{
    column_capacity, height_from_volume, needed_blocks, per_block_capacity, volume_from_height,
    LITERS_PER_LEVEL,
};
use crate::components::*;
use crate::config::{SimTick, WellConfig};
use crate::shaft::retention_depth;
use crate::world::{Block, WellWaterBlock, WorldResource};
use bevy_ecs::prelude::*;

fn base_block(quality: &WaterQuality, height: u8) -> Block {
    Block::WellWater(WellWaterBlock {
        kind: quality.kind,
        contamination: quality.contamination,
        height,
        natural: true,
    })
}

/// Rewrite the column above `spring` so the occupied blocks match
/// `total_liters`, kind, and contamination exactly, and nothing else.
///
/// `clear_scan` is how many levels above the retention depth are swept for
/// leftover blocks after shaft shrinkage.
pub fn synchronize_column(
    world: &WorldResource,
    spring: BlockPos,
    store: &mut WaterStore,
    quality: &WaterQuality,
    retention_depth: u32,
    clear_scan: u32,
) {
    let cap = per_block_capacity(quality.contamination);
    let capacity = column_capacity(retention_depth, quality.contamination);
    // Shaft capacity may have shrunk since the last successful write.
    if store.total_liters > capacity {
        store.total_liters = capacity;
    }
    let needed = needed_blocks(store.total_liters, quality.contamination, retention_depth);

    // First pass, bottom-up: claim the cells the column needs and clear the
    // ones it no longer does. An unrelated solid block aborts growth at its
    // level; it is never overwritten.
    for level in 0..retention_depth {
        let cell = spring.up(level as i32 + 1);
        let current = world.block_at(cell);
        if level < needed {
            match current {
                Block::WellWater(w) if w.natural => {}
                Block::Air | Block::WellWater(_) => world.set_block(cell, base_block(quality, 1)),
                _ => break,
            }
        } else if current.is_governed_water() {
            world.set_block(cell, Block::Air);
        }
    }

    // Second pass: exact per-block fill, walking up while the block matches
    // this spring's base code. The first block reached with nothing
    // remaining is cleared instead of left as a duplicate top block.
    let mut remaining = store.total_liters.min(capacity);
    for level in 0..retention_depth {
        let cell = spring.up(level as i32 + 1);
        match world.block_at(cell) {
            Block::WellWater(observed) if observed.natural => {
                if remaining == 0 {
                    world.set_block(cell, Block::Air);
                    continue;
                }
                let volume = remaining.min(cap);
                let target = WellWaterBlock {
                    kind: quality.kind,
                    contamination: quality.contamination,
                    height: height_from_volume(volume),
                    natural: true,
                };
                if observed != target {
                    world.set_block(cell, Block::WellWater(target));
                }
                remaining -= volume;
            }
            _ => break,
        }
    }

    // Sweep above the retention depth: blocks there must never hold this
    // spring's water.
    for level in retention_depth..retention_depth + clear_scan {
        let cell = spring.up(level as i32 + 1);
        if world.block_at(cell).is_governed_water() {
            world.set_block(cell, Block::Air);
        }
    }
}

/// System rewriting columns whose liters, kind, or contamination changed.
pub fn column_sync_system(
    config: Res<WellConfig>,
    world: Res<WorldResource>,
    mut query: Query<(
        &SpringPos,
        &Shaft,
        &mut WaterStore,
        &WaterQuality,
        &mut ColumnDirty,
    )>,
) {
    let sweep_top = config.clay_max_depth.max(config.stone_max_depth);
    for (pos, shaft, mut store, quality, mut dirty) in query.iter_mut() {
        if !dirty.is_set() {
            continue;
        }
        let depth = retention_depth(shaft, &config);
        let clear_scan = sweep_top.saturating_sub(depth);
        synchronize_column(&world, pos.0, &mut *store, quality, depth, clear_scan);
        dirty.clear();
    }
}

// ============================================================================
// RECONCILIATION
// ============================================================================

/// Volume range implied by the blocks actually observed above a spring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObservedColumn {
    /// Contiguous governed blocks found above the spring.
    pub blocks: u32,
    /// Smallest stored total consistent with the observed heights.
    pub min_liters: u32,
    /// Largest stored total consistent with the observed heights.
    pub max_liters: u32,
    /// Best single estimate, used when snapping.
    pub estimate: u32,
}

/// Walk the contiguous governed run above `spring` and derive the plausible
/// `[min, max]` volume range. The range, not a point value, accounts for the
/// ambiguity in a partially filled top block; blocks below the top are
/// assumed full.
pub fn observe_column(world: &WorldResource, spring: BlockPos, max_scan: u32) -> ObservedColumn {
    let mut run: Vec<WellWaterBlock> = Vec::new();
    for level in 0..max_scan {
        match world.block_at(spring.up(level as i32 + 1)) {
            // A zero height never comes from the codec; a block carrying one
            // is foreign and ends the run rather than entering the math.
            Block::WellWater(w) if w.natural && w.height >= 1 => run.push(w),
            _ => break,
        }
    }

    let mut observed = ObservedColumn {
        blocks: run.len() as u32,
        ..Default::default()
    };
    for (index, block) in run.iter().enumerate() {
        let cap = per_block_capacity(block.contamination);
        let volume = volume_from_height(block.height).min(cap);
        observed.estimate += volume;
        if index + 1 < run.len() {
            observed.min_liters += cap;
            observed.max_liters += cap;
        } else {
            let lower = ((block.height as u32 - 1) * LITERS_PER_LEVEL + 1).min(cap);
            observed.min_liters += lower;
            observed.max_liters += volume;
        }
    }
    observed
}

/// Snap the stored total to the observed best estimate when it falls outside
/// the plausible range. Returns true when a snap happened; the caller must
/// then trigger a resync. Best-effort self-healing, not a strict invariant.
pub fn reconcile_spring(
    world: &WorldResource,
    spring: BlockPos,
    store: &mut WaterStore,
    max_scan: u32,
) -> bool {
    let observed = observe_column(world, spring, max_scan);
    if store.total_liters >= observed.min_liters && store.total_liters <= observed.max_liters {
        return false;
    }
    log::debug!(
        "column at {spring:?}: stored {} outside observed [{}, {}], snapping to {}",
        store.total_liters,
        observed.min_liters,
        observed.max_liters,
        observed.estimate
    );
    store.total_liters = observed.estimate;
    true
}

/// Slow-cadence drift correction against third-party world edits. Springs
/// with a pending sync are skipped so freshly produced liters are not
/// mistaken for drift.
pub fn reconcile_system(
    tick: Res<SimTick>,
    config: Res<WellConfig>,
    world: Res<WorldResource>,
    mut query: Query<(&SpringPos, &Shaft, &mut WaterStore, &mut ColumnDirty)>,
) {
    if !tick.is_due(config.reconcile_interval_ticks) {
        return;
    }
    let max_scan = config.clay_max_depth.max(config.stone_max_depth);
    for (pos, _shaft, mut store, mut dirty) in query.iter_mut() {
        if dirty.is_set() {
            continue;
        }
        if reconcile_spring(&world, pos.0, &mut *store, max_scan) {
            dirty.mark();
        }
    }
}
