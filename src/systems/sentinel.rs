//! Sentinel check for orphaned well water.
//!
//! When a spring block is destroyed out from under its column, the blocks
//! above it keep existing in the world with no governing spring. The host
//! game invokes this check from its periodic block tick; a well-water block
//! with no spring within the bounded scan depth below it self-clears.

use crate::components::BlockPos;
use crate::world::{Block, WorldResource};

/// Clear `pos` if it holds well water with no governing spring within
/// `scan_depth` blocks below it. Returns true when the block was cleared.
pub fn sentinel_check(world: &WorldResource, pos: BlockPos, scan_depth: u32) -> bool {
    if !matches!(world.block_at(pos), Block::WellWater(_)) {
        return false;
    }
    for step in 1..=scan_depth as i32 {
        if world.block_at(pos.down(step)) == Block::Spring {
            return false;
        }
    }
    log::debug!("orphaned well water at {pos:?} self-cleared");
    world.set_block(pos, Block::Air);
    true
}
