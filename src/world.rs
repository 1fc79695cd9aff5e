//! World block model and the authoritative world-state service.
//!
//! The simulation never owns world blocks: it reads and writes them through
//! the [`BlockAccess`] contract implemented by the host game. Block identity
//! is never cached across ticks because other systems can mutate blocks
//! between ticks. [`VoxelWorld`] is an in-memory implementation used by
//! tests, demos, and hosts that mirror authoritative state into the core.

use crate::components::{BlockPos, ChunkPos, Contamination, WaterKind};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

// ============================================================================
// BLOCK MODEL
// ============================================================================

/// Payload of a placed well-water block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WellWaterBlock {
    pub kind: WaterKind,
    pub contamination: Contamination,
    /// Discretized fill level, `1..=7`.
    pub height: u8,
    /// True for a governing ("natural") block owned by a spring's column,
    /// false for a spreading block left behind by flow.
    pub natural: bool,
}

/// Block identity at a world position, reduced to the kinds the simulation
/// distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    Air,
    /// Loose soil; digging a spring here makes it shallow.
    Soil,
    Sand,
    Gravel,
    /// Recognized clay shaft lining.
    Clay,
    /// Recognized stone shaft lining.
    StoneBricks,
    /// Any other solid block the simulation must not overwrite.
    Rock,
    /// A placed spring source block.
    Spring,
    /// Natural surface water (lakes, sea), detected by shallow wells.
    SurfaceWater(WaterKind),
    WellWater(WellWaterBlock),
}

impl Default for Block {
    fn default() -> Self {
        Block::Air
    }
}

impl Block {
    /// Whether digging a spring out of this block yields a shallow well.
    pub fn is_loose_ground(&self) -> bool {
        matches!(self, Block::Soil | Block::Sand | Block::Gravel)
    }

    /// Well-water payload, if this is a well-water block.
    pub fn well_water(&self) -> Option<WellWaterBlock> {
        match self {
            Block::WellWater(w) => Some(*w),
            _ => None,
        }
    }

    /// A governing well-water block that belongs to the column above a
    /// spring. Ownership is positional: any natural block in the contiguous
    /// run above a spring is that spring's.
    pub fn is_governed_water(&self) -> bool {
        matches!(self, Block::WellWater(w) if w.natural)
    }
}

// ============================================================================
// ENTITY OVERLAP MODEL
// ============================================================================

/// Entity categories the contamination engine reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    DeadCreature,
    PoisonItem,
    Other,
}

/// Axis-aligned collision volume in world units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Aabb {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Aabb {
    /// The unit cube occupied by a block position.
    pub fn of_block(pos: BlockPos) -> Self {
        Self {
            min: [pos.x as f64, pos.y as f64, pos.z as f64],
            max: [pos.x as f64 + 1.0, pos.y as f64 + 1.0, pos.z as f64 + 1.0],
        }
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        (0..3).all(|i| self.min[i] < other.max[i] && self.max[i] > other.min[i])
    }

    pub fn center(&self) -> [f64; 3] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
            (self.min[2] + self.max[2]) / 2.0,
        ]
    }
}

/// An entity observed near a column.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorldEntity {
    pub kind: EntityKind,
    pub aabb: Aabb,
}

// ============================================================================
// WORLD SERVICE CONTRACT
// ============================================================================

/// Authoritative world-state service the host game implements.
///
/// All block reads and writes are synchronous calls; operations either
/// complete within the current tick or are re-attempted on the next one.
pub trait BlockAccess {
    fn block_at(&self, pos: BlockPos) -> Block;

    fn set_block(&mut self, pos: BlockPos, block: Block);

    /// Signal the host that neighbors of `pos` should re-evaluate.
    fn notify_neighbors_changed(&mut self, pos: BlockPos);

    /// Entities whose collision volume center lies within `radius` of `pos`.
    fn entities_near(&self, pos: BlockPos, radius: f64) -> Vec<WorldEntity>;

    fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool;
}

/// Resource wrapper for the world service, allowing shared access in ECS
/// systems.
#[derive(Resource, Clone)]
pub struct WorldResource(pub Arc<RwLock<dyn BlockAccess + Send + Sync>>);

impl WorldResource {
    pub fn new<W: BlockAccess + Send + Sync + 'static>(world: W) -> Self {
        let shared: Arc<RwLock<dyn BlockAccess + Send + Sync>> = Arc::new(RwLock::new(world));
        Self(shared)
    }

    /// Read a block (read-only access).
    pub fn block_at(&self, pos: BlockPos) -> Block {
        self.0.read().map(|w| w.block_at(pos)).unwrap_or(Block::Air)
    }

    /// Write a block and notify its neighbors.
    pub fn set_block(&self, pos: BlockPos, block: Block) {
        if let Ok(mut w) = self.0.write() {
            w.set_block(pos, block);
            w.notify_neighbors_changed(pos);
        }
    }

    pub fn entities_near(&self, pos: BlockPos, radius: f64) -> Vec<WorldEntity> {
        self.0
            .read()
            .map(|w| w.entities_near(pos, radius))
            .unwrap_or_default()
    }

    pub fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool {
        self.0
            .read()
            .map(|w| w.is_chunk_loaded(chunk))
            .unwrap_or(false)
    }
}

// ============================================================================
// IN-MEMORY WORLD
// ============================================================================

/// Sparse in-memory voxel world. Unset positions read as air; chunks are
/// loaded unless explicitly marked otherwise.
#[derive(Debug, Default)]
pub struct VoxelWorld {
    blocks: HashMap<BlockPos, Block>,
    entities: Vec<WorldEntity>,
    unloaded: HashSet<ChunkPos>,
    /// Number of `set_block` calls, for write-count assertions in tests.
    pub write_count: usize,
}

impl VoxelWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entity(&mut self, entity: WorldEntity) {
        self.entities.push(entity);
    }

    pub fn clear_entities(&mut self) {
        self.entities.clear();
    }

    pub fn set_chunk_loaded(&mut self, chunk: ChunkPos, loaded: bool) {
        if loaded {
            self.unloaded.remove(&chunk);
        } else {
            self.unloaded.insert(chunk);
        }
    }

    /// Place a square ring of `block` around `center` (the four horizontal
    /// neighbors), repeated for `levels` levels starting at `center`.
    pub fn line_shaft(&mut self, center: BlockPos, levels: u32, block: Block) {
        for level in 0..levels as i32 {
            for n in center.up(level).horizontal_neighbors() {
                self.set_block(n, block);
            }
        }
    }
}

impl BlockAccess for VoxelWorld {
    fn block_at(&self, pos: BlockPos) -> Block {
        self.blocks.get(&pos).copied().unwrap_or(Block::Air)
    }

    fn set_block(&mut self, pos: BlockPos, block: Block) {
        self.write_count += 1;
        if block == Block::Air {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, block);
        }
    }

    fn notify_neighbors_changed(&mut self, _pos: BlockPos) {}

    fn entities_near(&self, pos: BlockPos, radius: f64) -> Vec<WorldEntity> {
        let center = Aabb::of_block(pos).center();
        self.entities
            .iter()
            .filter(|e| {
                let c = e.aabb.center();
                let d2 = (0..3).map(|i| (c[i] - center[i]).powi(2)).sum::<f64>();
                d2 <= radius * radius
            })
            .copied()
            .collect()
    }

    fn is_chunk_loaded(&self, chunk: ChunkPos) -> bool {
        !self.unloaded.contains(&chunk)
    }
}
