//! Vertical transfer - cascading excess volume between stacked shafts.
//!
//! When a spring's column sits directly above another spring's column, any
//! volume the upper spring cannot retain within its own capacity is pushed
//! down into the lower spring, clamped to the lower spring's free capacity.
//! Totals are conserved: what leaves the upper spring is exactly what the
//! lower spring accepted.

use crate::codec::{column_capacity, try_change_volume};
use crate::components::*;
use crate::config::WellConfig;
use crate::shaft::retention_depth;
use crate::world::{Block, WorldResource};
use bevy_ecs::prelude::*;
use std::collections::HashMap;

/// System draining overflow downward through stacked shafts and promoting
/// orphan spreading blocks under drained columns.
pub fn vertical_transfer_system(
    config: Res<WellConfig>,
    world: Res<WorldResource>,
    mut query: Query<(
        Entity,
        &SpringPos,
        &Shaft,
        &mut WaterStore,
        &WaterQuality,
        &mut ColumnDirty,
    )>,
) {
    // A lower spring's "head" is the cell just above its retention zone;
    // an upper spring standing there forms a stacked pair.
    let mut heads: HashMap<BlockPos, Entity> = HashMap::new();
    let mut pairs: Vec<(Entity, Entity)> = Vec::new();
    for (entity, pos, shaft, _, _, _) in query.iter() {
        let depth = retention_depth(shaft, &config);
        heads.insert(pos.0.up(depth as i32 + 1), entity);
    }
    for (entity, pos, _, _, _, _) in query.iter() {
        if let Some(&lower) = heads.get(&pos.0) {
            if lower != entity {
                pairs.push((entity, lower));
            }
        }
    }

    for (upper, lower) in pairs {
        let Ok([mut up, mut low]) = query.get_many_mut([upper, lower]) else {
            continue;
        };
        let upper_depth = retention_depth(up.2, &config);
        let upper_capacity = column_capacity(upper_depth, up.4.contamination);
        let excess = up.3.total_liters.saturating_sub(upper_capacity);
        if excess == 0 {
            continue;
        }
        let lower_depth = retention_depth(low.2, &config);
        let applied = try_change_volume(
            &mut *low.3,
            low.4.contamination,
            lower_depth,
            excess as i64,
        );
        if applied > 0 {
            up.3.total_liters -= applied as u32;
            up.5.mark();
            low.5.mark();
            log::debug!(
                "transferred {applied} L from spring {:?} down to {:?}",
                up.1 .0,
                low.1 .0
            );
        }
    }

    // A spreading block left immediately below a drained-out spring loses
    // its source; promote it to a natural governing block when its lineage
    // matches, so it does not linger as an orphan.
    for (_, pos, _, store, quality, _) in query.iter() {
        if store.total_liters != 0 {
            continue;
        }
        let below = pos.0.down(1);
        if let Block::WellWater(w) = world.block_at(below) {
            if !w.natural && w.kind == quality.kind {
                world.set_block(below, Block::WellWater(crate::world::WellWaterBlock {
                    natural: true,
                    ..w
                }));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aquifer::AquiferRegistry;
    use crate::config::Calendar;
    use crate::world::{BlockAccess, VoxelWorld, WellWaterBlock};

    fn setup(blocks: VoxelWorld) -> (World, Schedule) {
        let mut world = World::new();
        world.insert_resource(Calendar::default());
        world.insert_resource(WellConfig::default());
        world.insert_resource(AquiferRegistry::new());
        world.insert_resource(WorldResource::new(blocks));
        let mut schedule = Schedule::default();
        schedule.add_systems(vertical_transfer_system);
        (world, schedule)
    }

    fn spawn_spring(
        world: &mut World,
        pos: BlockPos,
        validated: u32,
        liters: u32,
    ) -> Entity {
        world
            .spawn(SpringBundle {
                pos: SpringPos(pos),
                store: WaterStore {
                    total_liters: liters,
                    ..Default::default()
                },
                shaft: Shaft {
                    material: if validated > 0 {
                        ShaftMaterial::ClayRing
                    } else {
                        ShaftMaterial::None
                    },
                    validated_height: validated,
                },
                ..Default::default()
            })
            .id()
    }

    #[test]
    fn test_transfer_conserves_volume() {
        let (mut world, mut schedule) = setup(VoxelWorld::new());
        // Lower shaft: depth 2, capacity 140, holding 50.
        let lower = spawn_spring(&mut world, BlockPos::new(0, 0, 0), 2, 50);
        // Upper spring right above the lower column, over its own capacity
        // of 70 (unlined, base depth 1) after a lining collapse.
        let upper = spawn_spring(&mut world, BlockPos::new(0, 3, 0), 0, 200);

        schedule.run(&mut world);

        let u = world.get::<WaterStore>(upper).unwrap().total_liters;
        let l = world.get::<WaterStore>(lower).unwrap().total_liters;
        assert_eq!(u + l, 250, "transfer must conserve total volume");
        assert_eq!(l, 140, "lower spring fills to its capacity");
        assert_eq!(u, 110);
    }

    #[test]
    fn test_no_transfer_within_capacity() {
        let (mut world, mut schedule) = setup(VoxelWorld::new());
        let lower = spawn_spring(&mut world, BlockPos::new(0, 0, 0), 2, 50);
        let upper = spawn_spring(&mut world, BlockPos::new(0, 3, 0), 0, 60);

        schedule.run(&mut world);

        assert_eq!(world.get::<WaterStore>(upper).unwrap().total_liters, 60);
        assert_eq!(world.get::<WaterStore>(lower).unwrap().total_liters, 50);
    }

    #[test]
    fn test_no_transfer_without_stacked_pair() {
        let (mut world, mut schedule) = setup(VoxelWorld::new());
        // Not aligned with the lower column head.
        let lower = spawn_spring(&mut world, BlockPos::new(0, 0, 0), 2, 50);
        let upper = spawn_spring(&mut world, BlockPos::new(0, 9, 0), 0, 200);

        schedule.run(&mut world);

        assert_eq!(world.get::<WaterStore>(upper).unwrap().total_liters, 200);
        assert_eq!(world.get::<WaterStore>(lower).unwrap().total_liters, 50);
    }

    #[test]
    fn test_spreading_block_promoted_below_drained_spring() {
        let pos = BlockPos::new(0, 10, 0);
        let mut blocks = VoxelWorld::new();
        blocks.set_block(
            pos.down(1),
            Block::WellWater(WellWaterBlock {
                kind: WaterKind::Fresh,
                contamination: Contamination::Clean,
                height: 2,
                natural: false,
            }),
        );
        let (mut world, mut schedule) = setup(blocks);
        spawn_spring(&mut world, pos, 2, 0);

        schedule.run(&mut world);

        let res = world.resource::<WorldResource>().clone();
        let promoted = res.block_at(pos.down(1)).well_water().unwrap();
        assert!(promoted.natural);
    }

    #[test]
    fn test_spreading_block_of_other_family_left_alone() {
        let pos = BlockPos::new(0, 10, 0);
        let mut blocks = VoxelWorld::new();
        blocks.set_block(
            pos.down(1),
            Block::WellWater(WellWaterBlock {
                kind: WaterKind::Salt,
                contamination: Contamination::Clean,
                height: 2,
                natural: false,
            }),
        );
        let (mut world, mut schedule) = setup(blocks);
        spawn_spring(&mut world, pos, 2, 0);

        schedule.run(&mut world);

        let res = world.resource::<WorldResource>().clone();
        assert!(!res.block_at(pos.down(1)).well_water().unwrap().natural);
    }
}
