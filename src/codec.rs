//! Conversions between continuous liter quantities and the discretized
//! per-block column representation.
//!
//! A column block encodes its fill as a level height `1..=7` at 10 liters
//! per level, capping at 70 liters per block. Muddy water packs far less
//! per block (9 liters), which is what gives shallow wells their reduced
//! capacity.

use crate::components::{Contamination, WaterStore};

/// Liters represented by one level of block height.
pub const LITERS_PER_LEVEL: u32 = 10;

/// Maximum block level height.
pub const MAX_LEVEL: u8 = 7;

/// Liters a fully filled clean block holds.
pub const BLOCK_CAPACITY: u32 = 70;

/// Liters a fully filled muddy block holds.
pub const MUDDY_BLOCK_CAPACITY: u32 = 9;

/// Per-block liter ceiling for the given pollution state.
pub fn per_block_capacity(contamination: Contamination) -> u32 {
    match contamination {
        Contamination::Muddy => MUDDY_BLOCK_CAPACITY,
        _ => BLOCK_CAPACITY,
    }
}

/// Total liters a column of `retention_depth` blocks may legally hold.
pub fn column_capacity(retention_depth: u32, contamination: Contamination) -> u32 {
    retention_depth * per_block_capacity(contamination)
}

/// Level height encoding a block volume: `clamp(ceil(v / 10), 1, 7)`.
pub fn height_from_volume(volume: u32) -> u8 {
    let levels = volume.div_ceil(LITERS_PER_LEVEL);
    levels.clamp(1, MAX_LEVEL as u32) as u8
}

/// Volume implied by a level height: `min(70, h * 10)`.
pub fn volume_from_height(height: u8) -> u32 {
    (height as u32 * LITERS_PER_LEVEL).min(BLOCK_CAPACITY)
}

/// Number of column blocks needed to hold `total` liters, capped at the
/// retention depth.
pub fn needed_blocks(total: u32, contamination: Contamination, retention_depth: u32) -> u32 {
    let cap = per_block_capacity(contamination);
    let held = total.min(column_capacity(retention_depth, contamination));
    held.div_ceil(cap).min(retention_depth)
}

/// Apply a clamped volume change and return the delta actually applied.
///
/// The stored total is first clamped into `[0, capacity]` in case capacity
/// shrank since the last write (shaft lining broken, water turned muddy),
/// then `delta` is applied and clamped again. The return value is the
/// authoritative contract: consumers must use it instead of assuming their
/// full request succeeded. Requests beyond capacity or below zero are never
/// errors.
pub fn try_change_volume(
    store: &mut WaterStore,
    contamination: Contamination,
    retention_depth: u32,
    delta: i64,
) -> i64 {
    let capacity = column_capacity(retention_depth, contamination) as i64;
    let current = (store.total_liters as i64).clamp(0, capacity);
    let target = (current + delta).clamp(0, capacity);
    store.total_liters = target as u32;
    target - current
}
