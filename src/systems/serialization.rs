//! Persistence of spring state.
//!
//! Each spring serializes its scalar fields to a flat record; the world
//! blocks themselves are persisted by the host game. Fields missing from a
//! saved record default to safe zero/Clean/None values, never failing the
//! load.

use crate::components::*;
use crate::world::Block;
use serde::{Deserialize, Serialize};

fn default_origin_material() -> Block {
    Block::Rock
}

/// Persisted scalar state of one spring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpringRecord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
    #[serde(default)]
    pub total_liters: u32,
    #[serde(default)]
    pub water_kind: WaterKind,
    #[serde(default)]
    pub contamination: Contamination,
    #[serde(default)]
    pub shaft_material: ShaftMaterial,
    #[serde(default)]
    pub validated_height: u32,
    #[serde(default)]
    pub accumulated_fraction: f64,
    #[serde(default)]
    pub last_simulated_day: f64,
    #[serde(default)]
    pub is_shallow: bool,
    #[serde(default = "default_origin_material")]
    pub origin_material: Block,
}

impl SpringRecord {
    pub fn position(&self) -> BlockPos {
        BlockPos::new(self.x, self.y, self.z)
    }

    pub fn from_parts(
        pos: BlockPos,
        store: &WaterStore,
        quality: &WaterQuality,
        shaft: &Shaft,
        origin: &SpringOrigin,
    ) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            total_liters: store.total_liters,
            water_kind: quality.kind,
            contamination: quality.contamination,
            shaft_material: shaft.material,
            validated_height: shaft.validated_height,
            accumulated_fraction: store.accumulated_fraction,
            last_simulated_day: store.last_simulated_day,
            is_shallow: origin.is_shallow,
            origin_material: origin.origin_material,
        }
    }

    /// Rebuild the entity bundle this record describes.
    pub fn to_bundle(&self) -> SpringBundle {
        SpringBundle {
            pos: SpringPos(self.position()),
            store: WaterStore {
                total_liters: self.total_liters,
                accumulated_fraction: self.accumulated_fraction,
                last_simulated_day: self.last_simulated_day,
            },
            quality: WaterQuality {
                kind: self.water_kind,
                contamination: self.contamination,
            },
            shaft: Shaft {
                material: self.shaft_material,
                validated_height: self.validated_height,
            },
            origin: SpringOrigin {
                is_shallow: self.is_shallow,
                origin_material: self.origin_material,
            },
            dirty: ColumnDirty::default(),
        }
    }
}

/// Complete persisted simulation state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaveState {
    /// In-game calendar day at save time.
    #[serde(default)]
    pub day: f64,
    #[serde(default)]
    pub springs: Vec<SpringRecord>,
}

/// Serialize a save state to a JSON string.
pub fn save_to_json(state: &SaveState) -> Result<String, serde_json::Error> {
    serde_json::to_string(state)
}

/// Deserialize a save state from a JSON string.
pub fn save_from_json(data: &str) -> Result<SaveState, serde_json::Error> {
    serde_json::from_str(data)
}
