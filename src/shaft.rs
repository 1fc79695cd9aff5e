//! Shaft lining analysis.
//!
//! A spring retains water in the column above it only as deep as its shaft
//! lining allows. The analyzer classifies the horizontal ring of blocks at
//! each level and walks upward while the lining stays uniform; it is a pure
//! read of world state and runs on a slow cadence because shaft geometry
//! rarely changes.

use crate::components::{BlockPos, ColumnDirty, Shaft, ShaftMaterial, SpringPos};
use crate::config::{SimTick, WellConfig};
use crate::world::{Block, WorldResource};
use bevy_ecs::prelude::*;

/// Lining material a single block counts toward, if any.
fn lining_of(block: Block) -> Option<ShaftMaterial> {
    match block {
        Block::Clay => Some(ShaftMaterial::ClayRing),
        Block::StoneBricks => Some(ShaftMaterial::StoneRing),
        _ => None,
    }
}

/// Classify the horizontal ring at `center`: all four neighbors must be the
/// same recognized lining material, otherwise the ring counts as unlined.
pub fn classify_ring(world: &WorldResource, center: BlockPos) -> ShaftMaterial {
    let mut ring = ShaftMaterial::None;
    for neighbor in center.horizontal_neighbors() {
        let Some(material) = lining_of(world.block_at(neighbor)) else {
            return ShaftMaterial::None;
        };
        if ring == ShaftMaterial::None {
            ring = material;
        } else if ring != material {
            return ShaftMaterial::None;
        }
    }
    ring
}

/// Walk upward from the level above the spring while the ring material stays
/// uniform, stopping at the first mismatch or at the material maximum.
pub fn validate_column(
    world: &WorldResource,
    spring: BlockPos,
    material: ShaftMaterial,
    max_levels: u32,
) -> u32 {
    if material == ShaftMaterial::None {
        return 0;
    }
    for level in 0..max_levels {
        if classify_ring(world, spring.up(level as i32 + 1)) != material {
            return level;
        }
    }
    max_levels
}

/// Configured maximum lined depth for a material.
pub fn material_max(material: ShaftMaterial, config: &WellConfig) -> u32 {
    match material {
        ShaftMaterial::None => 0,
        ShaftMaterial::ClayRing => config.clay_max_depth,
        ShaftMaterial::StoneRing => config.stone_max_depth,
    }
}

/// Column levels the capacity math may use:
/// `max(base_depth, min(validated_height, material_max))`. An unlined shaft
/// still retains the floor depth.
pub fn retention_depth(shaft: &Shaft, config: &WellConfig) -> u32 {
    let lined = shaft
        .validated_height
        .min(material_max(shaft.material, config));
    config.base_depth.max(lined)
}

/// Re-classify the shaft of a spring against the current world state.
pub fn analyze_shaft(world: &WorldResource, spring: BlockPos, config: &WellConfig) -> Shaft {
    let material = classify_ring(world, spring.up(1));
    let validated_height = validate_column(world, spring, material, material_max(material, config));
    Shaft {
        material,
        validated_height,
    }
}

/// Slow-cadence system re-validating every spring's shaft lining. A changed
/// result marks the column dirty so capacity clamping and block cleanup run
/// in the same tick's synchronization pass.
pub fn shaft_validation_system(
    tick: Res<SimTick>,
    config: Res<WellConfig>,
    world: Res<WorldResource>,
    mut query: Query<(&SpringPos, &mut Shaft, &mut ColumnDirty)>,
) {
    if !tick.is_due(config.shaft_interval_ticks) {
        return;
    }
    for (pos, mut shaft, mut dirty) in query.iter_mut() {
        let observed = analyze_shaft(&world, pos.0, &config);
        if *shaft != observed {
            *shaft = observed;
            dirty.mark();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::VoxelWorld;

    fn lined_world(center: BlockPos, levels: u32, block: Block) -> WorldResource {
        let mut world = VoxelWorld::new();
        world.line_shaft(center.up(1), levels, block);
        WorldResource::new(world)
    }

    #[test]
    fn test_classify_ring_uniform() {
        let spring = BlockPos::new(0, 10, 0);
        let world = lined_world(spring, 1, Block::Clay);
        assert_eq!(classify_ring(&world, spring.up(1)), ShaftMaterial::ClayRing);
    }

    #[test]
    fn test_classify_ring_mismatch_is_none() {
        let spring = BlockPos::new(0, 10, 0);
        let world = lined_world(spring, 1, Block::Clay);
        // Swap one neighbor for stone: the ring no longer counts.
        world.set_block(BlockPos::new(1, 11, 0), Block::StoneBricks);
        assert_eq!(classify_ring(&world, spring.up(1)), ShaftMaterial::None);
        // A missing neighbor also disqualifies it.
        world.set_block(BlockPos::new(1, 11, 0), Block::Air);
        assert_eq!(classify_ring(&world, spring.up(1)), ShaftMaterial::None);
    }

    #[test]
    fn test_validate_column_stops_at_mismatch() {
        let spring = BlockPos::new(0, 0, 0);
        let world = lined_world(spring, 5, Block::Clay);
        let height = validate_column(&world, spring, ShaftMaterial::ClayRing, 6);
        assert_eq!(height, 5);
    }

    #[test]
    fn test_validate_column_honors_material_max() {
        let spring = BlockPos::new(0, 0, 0);
        let world = lined_world(spring, 10, Block::Clay);
        let height = validate_column(&world, spring, ShaftMaterial::ClayRing, 6);
        assert_eq!(height, 6);
    }

    #[test]
    fn test_retention_depth_scenario() {
        // Clay ring, validated height 5, clay max 6, base depth 1 -> 5,
        // giving a clean capacity of 350 liters.
        let config = WellConfig::default();
        let shaft = Shaft {
            material: ShaftMaterial::ClayRing,
            validated_height: 5,
        };
        assert_eq!(retention_depth(&shaft, &config), 5);
        assert_eq!(
            crate::codec::column_capacity(5, crate::components::Contamination::Clean),
            350
        );
    }

    #[test]
    fn test_retention_depth_floor_without_lining() {
        let config = WellConfig::default();
        let shaft = Shaft::default();
        assert_eq!(retention_depth(&shaft, &config), config.base_depth);
    }

    #[test]
    fn test_analyze_shaft_reads_world() {
        let spring = BlockPos::new(0, 0, 0);
        let world = lined_world(spring, 3, Block::StoneBricks);
        let config = WellConfig::default();
        let shaft = analyze_shaft(&world, spring, &config);
        assert_eq!(shaft.material, ShaftMaterial::StoneRing);
        assert_eq!(shaft.validated_height, 3);
    }
}
