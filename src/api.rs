//! Public API for the groundwater simulation.
//!
//! This module provides the main interface for the host game (or any other
//! client) to drive the simulation: digging and removing springs, stepping
//! the calendar, withdrawing water, and persisting state.
//!
//! ## Calendar Time
//!
//! `step(elapsed_days)` advances the in-game calendar by a fractional day
//! count and runs one tick of every system. Production is proportional to
//! calendar time, so hosts with variable tick rates or game-speed settings
//! pass whatever span actually elapsed.

use crate::aquifer::AquiferRegistry;
use crate::codec::{column_capacity, try_change_volume};
use crate::components::*;
use crate::config::{Calendar, SimTick, WellConfig};
use crate::shaft::{analyze_shaft, retention_depth, shaft_validation_system};
use crate::systems::*;
use crate::world::{Block, WorldResource};
use bevy_ecs::prelude::*;

/// The main simulation container.
///
/// Holds the ECS world and schedule, providing a clean API for:
/// - Digging and removing springs
/// - Stepping the simulation forward
/// - Withdrawing water on behalf of consumers
/// - Saving and loading spring state
pub struct WellWorld {
    world: World,
    schedule: Schedule,
    tick: u64,
}

impl WellWorld {
    /// Create a simulation bound to a host world service.
    pub fn new(world_service: WorldResource) -> Self {
        Self::with_config(WellConfig::default(), world_service)
    }

    /// Create a simulation with custom configuration.
    pub fn with_config(config: WellConfig, world_service: WorldResource) -> Self {
        let mut world = World::new();

        world.insert_resource(Calendar::default());
        world.insert_resource(SimTick::default());
        world.insert_resource(AquiferRegistry::new());
        world.insert_resource(world_service);
        world.insert_resource(config);

        // Chained so each stage sees the previous stage's writes: shaft
        // geometry and drift correction first, then water state, then
        // projection back into world blocks.
        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                shaft_validation_system,
                reconcile_system,
                spring_production_system,
                contamination_system,
                column_sync_system,
                vertical_transfer_system,
            )
                .chain(),
        );

        Self {
            world,
            schedule,
            tick: 0,
        }
    }

    /// Install a worldgen aquifer record for a chunk.
    pub fn set_aquifer(&mut self, chunk: ChunkPos, rating: u8, salty: bool) {
        self.world
            .resource_mut::<AquiferRegistry>()
            .insert_record(chunk, rating, salty);
    }

    /// Step the simulation forward by `elapsed_days` of calendar time.
    pub fn step(&mut self, elapsed_days: f64) {
        self.world.resource_mut::<Calendar>().advance(elapsed_days);
        self.world.resource_mut::<SimTick>().increment();
        self.schedule.run(&mut self.world);
        self.tick += 1;
    }

    /// Get the current tick number.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Get the current calendar day.
    pub fn current_day(&self) -> f64 {
        self.world.resource::<Calendar>().total_days
    }

    // ========================================================================
    // SPRING LIFECYCLE
    // ========================================================================

    /// Dig a spring at `pos`, replacing whatever block is there.
    ///
    /// The block dug out decides the mode: loose ground (soil, sand, gravel)
    /// yields a shallow well, anything else an aquifer well. The shaft is
    /// analyzed immediately so pre-built linings count from the first tick.
    pub fn dig_spring(&mut self, pos: BlockPos) -> Entity {
        // Digging where a spring already sits must not double-register it.
        if let Some(existing) = self.spring_at(pos) {
            return existing;
        }
        let config = self.world.resource::<WellConfig>().clone();
        let service = self.world.resource::<WorldResource>().clone();
        let origin_material = service.block_at(pos);
        service.set_block(pos, Block::Spring);
        self.world
            .resource_mut::<AquiferRegistry>()
            .register_spring(pos);

        let shaft = analyze_shaft(&service, pos, &config);
        log::debug!(
            "spring dug at {pos:?} out of {origin_material:?}, lining {:?} x {}",
            shaft.material,
            shaft.validated_height
        );
        let entity = self
            .world
            .spawn(SpringBundle {
                pos: SpringPos(pos),
                origin: SpringOrigin {
                    is_shallow: origin_material.is_loose_ground(),
                    origin_material,
                },
                shaft,
                ..Default::default()
            })
            .id();

        // Adopt any water blocks already sitting above the new spring, the
        // world-load and re-dig cases.
        let max_scan = config.clay_max_depth.max(config.stone_max_depth);
        let mut snapped = false;
        if let Some(mut store) = self.world.get_mut::<WaterStore>(entity) {
            snapped = reconcile_spring(&service, pos, &mut *store, max_scan);
        }
        if snapped {
            if let Some(mut dirty) = self.world.get_mut::<ColumnDirty>(entity) {
                dirty.mark();
            }
        }
        entity
    }

    /// Remove the spring at `pos`, if any. The column blocks above it are
    /// left in place and become orphans for the sentinel check.
    pub fn remove_spring(&mut self, pos: BlockPos) -> bool {
        let Some(entity) = self.spring_at(pos) else {
            return false;
        };
        self.world.despawn(entity);
        self.world
            .resource_mut::<AquiferRegistry>()
            .deregister_spring(pos);
        let service = self.world.resource::<WorldResource>().clone();
        service.set_block(pos, Block::Air);
        log::debug!("spring removed at {pos:?}");
        true
    }

    /// Entity of the spring at `pos`, if one exists.
    pub fn spring_at(&mut self, pos: BlockPos) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &SpringPos)>();
        query
            .iter(&self.world)
            .find(|(_, p)| p.0 == pos)
            .map(|(e, _)| e)
    }

    /// Number of springs currently alive.
    pub fn spring_count(&mut self) -> usize {
        let mut query = self.world.query::<&SpringPos>();
        query.iter(&self.world).count()
    }

    // ========================================================================
    // CONSUMER ACCESS
    // ========================================================================

    /// Liters currently stored by the spring at `pos`.
    pub fn available_volume(&mut self, pos: BlockPos) -> u32 {
        self.spring_at(pos)
            .and_then(|e| self.world.get::<WaterStore>(e))
            .map(|s| s.total_liters)
            .unwrap_or(0)
    }

    /// Capacity of the spring at `pos` under its current shaft and
    /// contamination state.
    pub fn capacity(&mut self, pos: BlockPos) -> u32 {
        let Some(entity) = self.spring_at(pos) else {
            return 0;
        };
        let config = self.world.resource::<WellConfig>().clone();
        let (Some(shaft), Some(quality)) = (
            self.world.get::<Shaft>(entity),
            self.world.get::<WaterQuality>(entity),
        ) else {
            return 0;
        };
        column_capacity(retention_depth(shaft, &config), quality.contamination)
    }

    /// Water kind of the spring at `pos`.
    pub fn water_kind(&mut self, pos: BlockPos) -> Option<WaterKind> {
        let entity = self.spring_at(pos)?;
        self.world.get::<WaterQuality>(entity).map(|q| q.kind)
    }

    /// Contamination state of the spring at `pos`.
    pub fn contamination(&mut self, pos: BlockPos) -> Option<Contamination> {
        let entity = self.spring_at(pos)?;
        self.world
            .get::<WaterQuality>(entity)
            .map(|q| q.contamination)
    }

    /// Withdraw up to `liters` from the spring at `pos`. Returns the amount
    /// actually withdrawn, which may be less when the store runs dry.
    pub fn withdraw(&mut self, pos: BlockPos, liters: u32) -> u32 {
        (-self.change_volume(pos, -(liters as i64))) as u32
    }

    /// Apply a signed volume delta to the spring at `pos`, clamped to
    /// `[0, capacity]`. Returns the delta actually applied.
    pub fn change_volume(&mut self, pos: BlockPos, delta: i64) -> i64 {
        let Some(entity) = self.spring_at(pos) else {
            return 0;
        };
        let config = self.world.resource::<WellConfig>().clone();
        let (Some(shaft), Some(quality)) = (
            self.world.get::<Shaft>(entity).copied(),
            self.world.get::<WaterQuality>(entity).copied(),
        ) else {
            return 0;
        };
        let depth = retention_depth(&shaft, &config);
        let Some(mut store) = self.world.get_mut::<WaterStore>(entity) else {
            return 0;
        };
        let before = store.total_liters;
        let applied = try_change_volume(&mut *store, quality.contamination, depth, delta);
        // The defensive clamp can shrink the stored total while reporting a
        // zero applied delta; the column must still resync.
        let changed = store.total_liters != before;
        if changed {
            if let Some(mut dirty) = self.world.get_mut::<ColumnDirty>(entity) {
                dirty.mark();
            }
        }
        applied
    }

    /// Run the orphaned-water sentinel check at `pos` on behalf of the
    /// host's block tick. Returns true when the block self-cleared.
    pub fn run_sentinel_at(&mut self, pos: BlockPos) -> bool {
        let config = self.world.resource::<WellConfig>().clone();
        let service = self.world.resource::<WorldResource>().clone();
        sentinel_check(&service, pos, config.sentinel_scan_depth)
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Capture all spring state for persistence.
    pub fn save(&mut self) -> SaveState {
        let day = self.current_day();
        let mut query = self.world.query::<(
            &SpringPos,
            &WaterStore,
            &WaterQuality,
            &Shaft,
            &SpringOrigin,
        )>();
        let springs = query
            .iter(&self.world)
            .map(|(pos, store, quality, shaft, origin)| {
                SpringRecord::from_parts(pos.0, store, quality, shaft, origin)
            })
            .collect();
        SaveState { day, springs }
    }

    /// Save state as a JSON string.
    pub fn save_json(&mut self) -> Result<String, serde_json::Error> {
        save_to_json(&self.save())
    }

    /// Restore springs from a save state. The stored scalars are taken as
    /// authoritative: every restored column is marked dirty so the next tick
    /// rewrites its world blocks to match.
    pub fn load(&mut self, state: &SaveState) {
        self.world.resource_mut::<Calendar>().total_days = state.day;
        let service = self.world.resource::<WorldResource>().clone();
        for record in &state.springs {
            let pos = record.position();
            service.set_block(pos, Block::Spring);
            self.world
                .resource_mut::<AquiferRegistry>()
                .register_spring(pos);
            let entity = self.world.spawn(record.to_bundle()).id();
            if let Some(mut dirty) = self.world.get_mut::<ColumnDirty>(entity) {
                dirty.mark();
            }
        }
        log::debug!("loaded {} springs at day {}", state.springs.len(), state.day);
    }

    /// Restore springs from a JSON string.
    pub fn load_json(&mut self, data: &str) -> Result<(), serde_json::Error> {
        let state = save_from_json(data)?;
        self.load(&state);
        Ok(())
    }

    /// Get direct access to the ECS world (for advanced usage).
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Get mutable access to the ECS world (for advanced usage).
    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{BlockAccess, VoxelWorld};
    use std::sync::{Arc, RwLock};

    fn shared_sim() -> (Arc<RwLock<VoxelWorld>>, WellWorld) {
        let shared = Arc::new(RwLock::new(VoxelWorld::new()));
        let sim = WellWorld::new(WorldResource(shared.clone()));
        (shared, sim)
    }

    #[test]
    fn test_dig_and_produce() {
        let (shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        sim.set_aquifer(pos.chunk(), 40, false);
        sim.dig_spring(pos);

        // rating 40, one spring, output ratio 0.5 -> 20 L/day.
        sim.step(1.0);

        assert_eq!(sim.available_volume(pos), 20);
        assert_eq!(sim.water_kind(pos), Some(WaterKind::Fresh));
        // Column sync placed a governing block above the spring.
        let block = shared.read().unwrap().block_at(pos.up(1));
        let water = block.well_water().unwrap();
        assert!(water.natural);
        assert_eq!(water.height, 2);
    }

    #[test]
    fn test_dig_in_loose_ground_makes_shallow_well() {
        let (shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        shared.write().unwrap().set_block(pos, Block::Soil);
        shared
            .write()
            .unwrap()
            .set_block(pos.up(2), Block::SurfaceWater(WaterKind::Fresh));
        let entity = sim.dig_spring(pos);
        assert!(sim.world().get::<SpringOrigin>(entity).unwrap().is_shallow);

        sim.step(1.0);

        // 10 L produced, clamped to the unlined muddy capacity of 9.
        assert_eq!(sim.available_volume(pos), 9);
        assert_eq!(sim.contamination(pos), Some(Contamination::Muddy));
    }

    #[test]
    fn test_prebuilt_lining_counts_immediately() {
        let (shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        shared
            .write()
            .unwrap()
            .line_shaft(pos.up(1), 4, Block::Clay);
        sim.set_aquifer(pos.chunk(), 40, false);
        sim.dig_spring(pos);

        // Retention depth 4 -> capacity 280, visible before any slow-cadence
        // re-validation ran.
        assert_eq!(sim.capacity(pos), 280);
    }

    #[test]
    fn test_withdraw_clamps_to_available() {
        let (_shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        sim.set_aquifer(pos.chunk(), 40, false);
        sim.dig_spring(pos);
        sim.step(1.0);
        assert_eq!(sim.available_volume(pos), 20);

        assert_eq!(sim.withdraw(pos, 5), 5);
        assert_eq!(sim.available_volume(pos), 15);
        assert_eq!(sim.withdraw(pos, 100), 15);
        assert_eq!(sim.available_volume(pos), 0);
    }

    #[test]
    fn test_withdrawal_updates_blocks_next_tick() {
        let (shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        sim.set_aquifer(pos.chunk(), 40, false);
        sim.dig_spring(pos);
        sim.step(1.0);
        sim.withdraw(pos, 20);

        // Zero elapsed time: no production, but the dirty column resyncs.
        sim.step(0.0);
        assert_eq!(shared.read().unwrap().block_at(pos.up(1)), Block::Air);
    }

    #[test]
    fn test_remove_spring_orphans_column() {
        let (shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        sim.set_aquifer(pos.chunk(), 40, false);
        sim.dig_spring(pos);
        sim.step(1.0);
        assert!(shared.read().unwrap().block_at(pos.up(1)).is_governed_water());

        assert!(sim.remove_spring(pos));
        assert_eq!(sim.spring_count(), 0);
        assert_eq!(shared.read().unwrap().block_at(pos), Block::Air);

        // The leftover block is cleared only when its sentinel fires.
        assert!(shared.read().unwrap().block_at(pos.up(1)).is_governed_water());
        assert!(sim.run_sentinel_at(pos.up(1)));
        assert_eq!(shared.read().unwrap().block_at(pos.up(1)), Block::Air);
    }

    #[test]
    fn test_redig_adopts_existing_column() {
        let (shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        shared.write().unwrap().set_block(
            pos.up(1),
            Block::WellWater(crate::world::WellWaterBlock {
                kind: WaterKind::Fresh,
                contamination: Contamination::Clean,
                height: 7,
                natural: true,
            }),
        );

        sim.dig_spring(pos);
        assert_eq!(sim.available_volume(pos), 70);
    }

    #[test]
    fn test_digging_twice_keeps_one_spring() {
        let (_shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        sim.set_aquifer(pos.chunk(), 40, false);
        let first = sim.dig_spring(pos);
        let second = sim.dig_spring(pos);

        assert_eq!(first, second);
        assert_eq!(sim.spring_count(), 1);

        // One spring, one share: rating 40 x 0.5 = 20 L/day, not doubled.
        sim.step(1.0);
        assert_eq!(sim.available_volume(pos), 20);
    }

    #[test]
    fn test_capacity_shrink_resyncs_on_zero_delta() {
        let (shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        shared
            .write()
            .unwrap()
            .line_shaft(pos.up(1), 4, Block::Clay);
        let entity = sim.dig_spring(pos);
        assert_eq!(sim.change_volume(pos, 280), 280);
        sim.step(0.0);
        assert!(shared.read().unwrap().block_at(pos.up(4)).is_governed_water());

        // The lining result collapses out from under the stored volume.
        *sim.world_mut().get_mut::<Shaft>(entity).unwrap() = Shaft::default();

        // Zero requested, zero applied, but the clamp shrank the store and
        // the column must resync down to the base depth.
        assert_eq!(sim.change_volume(pos, 0), 0);
        assert_eq!(sim.available_volume(pos), 70);
        sim.step(0.0);
        assert!(shared.read().unwrap().block_at(pos.up(1)).is_governed_water());
        for level in 2..=4 {
            assert_eq!(shared.read().unwrap().block_at(pos.up(level)), Block::Air);
        }
    }

    #[test]
    fn test_remove_missing_spring_is_noop() {
        let (_shared, mut sim) = shared_sim();
        assert!(!sim.remove_spring(BlockPos::new(0, 10, 0)));
    }

    #[test]
    fn test_contamination_through_full_schedule() {
        let (shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        sim.set_aquifer(pos.chunk(), 40, false);
        sim.dig_spring(pos);
        sim.step(1.0);

        shared.write().unwrap().add_entity(crate::world::WorldEntity {
            kind: crate::world::EntityKind::DeadCreature,
            aabb: crate::world::Aabb::of_block(pos.up(1)),
        });
        sim.step(0.1);

        assert_eq!(sim.contamination(pos), Some(Contamination::Tainted));
        let block = shared.read().unwrap().block_at(pos.up(1));
        assert_eq!(
            block.well_water().unwrap().contamination,
            Contamination::Tainted
        );
    }

    #[test]
    fn test_save_load_round_trip() {
        let (_shared, mut sim) = shared_sim();
        let pos = BlockPos::new(0, 10, 0);
        sim.set_aquifer(pos.chunk(), 40, false);
        sim.dig_spring(pos);
        sim.step(1.5);
        let json = sim.save_json().unwrap();

        let (restored_blocks, mut restored) = shared_sim();
        restored.set_aquifer(pos.chunk(), 40, false);
        restored.load_json(&json).unwrap();

        assert_eq!(restored.spring_count(), 1);
        assert_eq!(restored.available_volume(pos), 30);
        assert_eq!(restored.current_day(), 1.5);
        assert_eq!(restored_blocks.read().unwrap().block_at(pos), Block::Spring);

        // Production resumes from the saved calendar without a catch-up jump.
        restored.step(1.0);
        assert_eq!(restored.available_volume(pos), 50);
    }

    #[test]
    fn test_two_springs_split_chunk_output() {
        let (_shared, mut sim) = shared_sim();
        let a = BlockPos::new(0, 10, 0);
        let b = BlockPos::new(5, 10, 5);
        sim.set_aquifer(a.chunk(), 40, false);
        sim.dig_spring(a);
        sim.dig_spring(b);

        sim.step(1.0);

        assert_eq!(sim.available_volume(a), 10);
        assert_eq!(sim.available_volume(b), 10);
    }
}
