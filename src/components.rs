//! ECS components for the groundwater simulation.
//!
//! Components are pure data containers attached to spring entities.
//! All simulation logic lives in systems that query these components.

use crate::world::Block;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Edge length of a world chunk in blocks.
pub const CHUNK_SIZE: i32 = 32;

// ============================================================================
// SPATIAL TYPES
// ============================================================================

/// Integer block position in the world (y = up).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Position `n` blocks above this one.
    pub fn up(&self, n: i32) -> Self {
        Self::new(self.x, self.y + n, self.z)
    }

    /// Position `n` blocks below this one.
    pub fn down(&self, n: i32) -> Self {
        Self::new(self.x, self.y - n, self.z)
    }

    /// The four horizontal neighbors at the same height.
    pub fn horizontal_neighbors(&self) -> [BlockPos; 4] {
        [
            Self::new(self.x + 1, self.y, self.z),
            Self::new(self.x - 1, self.y, self.z),
            Self::new(self.x, self.y, self.z + 1),
            Self::new(self.x, self.y, self.z - 1),
        ]
    }

    /// Chunk containing this position.
    pub fn chunk(&self) -> ChunkPos {
        ChunkPos::new(
            self.x.div_euclid(CHUNK_SIZE),
            self.y.div_euclid(CHUNK_SIZE),
            self.z.div_euclid(CHUNK_SIZE),
        )
    }
}

/// 3D chunk coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl ChunkPos {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

// ============================================================================
// WATER STATE ENUMS
// ============================================================================

/// Base water family of a spring or water block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaterKind {
    #[default]
    Fresh,
    Salt,
}

/// Pollution state of a column. Transitions are one-directional: once
/// `Tainted` or `Poisoned`, no automatic transition moves away from it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Contamination {
    #[default]
    Clean,
    Muddy,
    Tainted,
    Poisoned,
}

impl Contamination {
    /// Whether the state machine can still move out of this state.
    pub fn can_degrade(&self) -> bool {
        matches!(self, Contamination::Clean | Contamination::Muddy)
    }

    /// Whether water in this state is visibly polluted.
    pub fn is_polluted(&self) -> bool {
        !matches!(self, Contamination::Clean)
    }
}

/// Lining material classified around a shaft.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShaftMaterial {
    #[default]
    None,
    ClayRing,
    StoneRing,
}

// ============================================================================
// SPRING COMPONENTS
// ============================================================================

/// World position of a spring block; identity key for the entity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpringPos(pub BlockPos);

/// Stored water volume and production bookkeeping.
#[derive(Component, Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct WaterStore {
    /// Whole liters currently held by the spring.
    pub total_liters: u32,
    /// Sub-liter carry in `[0, 1)`.
    pub accumulated_fraction: f64,
    /// In-game calendar day of the last production tick.
    pub last_simulated_day: f64,
}

/// Water kind and pollution state of the column.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaterQuality {
    pub kind: WaterKind,
    pub contamination: Contamination,
}

/// Last validated shaft lining result.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shaft {
    pub material: ShaftMaterial,
    /// Vertical levels over which the ring material stayed uniform.
    pub validated_height: u32,
}

/// Immutable facts about how the spring came to be.
#[derive(Component, Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpringOrigin {
    /// True if the spring sits on loose soil/sand/gravel and draws from
    /// nearby surface water rather than the chunk aquifer.
    pub is_shallow: bool,
    /// The block the spring replaced. Cosmetic only, never simulated.
    pub origin_material: Block,
}

impl Default for SpringOrigin {
    fn default() -> Self {
        Self {
            is_shallow: false,
            origin_material: Block::Rock,
        }
    }
}

/// Flag set whenever liters, kind, or contamination changed and the world
/// column must be rewritten to match.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct ColumnDirty(pub bool);

impl ColumnDirty {
    pub fn mark(&mut self) {
        self.0 = true;
    }

    pub fn clear(&mut self) {
        self.0 = false;
    }

    pub fn is_set(&self) -> bool {
        self.0
    }
}

// ============================================================================
// BUNDLE HELPERS
// ============================================================================

/// Bundle for spawning a complete spring entity.
#[derive(Bundle, Default)]
pub struct SpringBundle {
    pub pos: SpringPos,
    pub store: WaterStore,
    pub quality: WaterQuality,
    pub shaft: Shaft,
    pub origin: SpringOrigin,
    pub dirty: ColumnDirty,
}

impl Default for SpringPos {
    fn default() -> Self {
        Self(BlockPos::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_pos_chunk() {
        assert_eq!(BlockPos::new(0, 0, 0).chunk(), ChunkPos::new(0, 0, 0));
        assert_eq!(BlockPos::new(31, 31, 31).chunk(), ChunkPos::new(0, 0, 0));
        assert_eq!(BlockPos::new(32, 0, 0).chunk(), ChunkPos::new(1, 0, 0));
        assert_eq!(BlockPos::new(-1, 0, 0).chunk(), ChunkPos::new(-1, 0, 0));
    }

    #[test]
    fn test_block_pos_vertical() {
        let p = BlockPos::new(2, 10, -3);
        assert_eq!(p.up(3), BlockPos::new(2, 13, -3));
        assert_eq!(p.down(10), BlockPos::new(2, 0, -3));
    }

    #[test]
    fn test_horizontal_neighbors_share_height() {
        let p = BlockPos::new(0, 5, 0);
        for n in p.horizontal_neighbors() {
            assert_eq!(n.y, 5);
            assert_ne!(n, p);
        }
    }

    #[test]
    fn test_contamination_finality() {
        assert!(Contamination::Clean.can_degrade());
        assert!(Contamination::Muddy.can_degrade());
        assert!(!Contamination::Tainted.can_degrade());
        assert!(!Contamination::Poisoned.can_degrade());
        assert!(!Contamination::Clean.is_polluted());
        assert!(Contamination::Muddy.is_polluted());
    }
}
