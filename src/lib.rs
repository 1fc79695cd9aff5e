//! Wellspring - Groundwater Simulation Core
//!
//! A tick-driven ECS simulation of springs, wells, and groundwater for a
//! voxel survival game. Uses `bevy_ecs` for the entity-component-system
//! architecture; the host game supplies world block access through the
//! [`world::BlockAccess`] contract.

pub mod api;
pub mod aquifer;
pub mod codec;
pub mod components;
pub mod config;
pub mod shaft;
pub mod systems;
pub mod world;

pub use api::WellWorld;
pub use aquifer::{AquiferRecord, AquiferRegistry};
pub use components::*;
pub use config::{Calendar, SimTick, WellConfig};
pub use systems::*;
pub use world::{Block, BlockAccess, VoxelWorld, WellWaterBlock, WorldResource};
