//! Per-chunk aquifer records and the registry of springs drawing on them.
//!
//! Aquifer ratings are produced by world generation (an external
//! collaborator) and consumed here as a read-only lookup. The registry also
//! tracks which springs currently occupy each chunk so that chunk output can
//! be divided among them; registration is idempotent because springs
//! re-register on every load.

use crate::components::{BlockPos, ChunkPos};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Groundwater yield record for one chunk. Immutable once generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AquiferRecord {
    /// Available yield, `0..=100`.
    pub rating: u8,
    /// Whether water drawn from this chunk is salty.
    pub salty: bool,
}

/// Registry of aquifer records and spring occupancy per chunk.
#[derive(Resource, Debug, Default)]
pub struct AquiferRegistry {
    records: HashMap<ChunkPos, AquiferRecord>,
    springs: HashMap<ChunkPos, HashSet<BlockPos>>,
}

impl AquiferRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a worldgen-supplied record. Ratings above 100 are clamped.
    pub fn insert_record(&mut self, chunk: ChunkPos, rating: u8, salty: bool) {
        self.records.insert(
            chunk,
            AquiferRecord {
                rating: rating.min(100),
                salty,
            },
        );
    }

    /// Record for a chunk, or `None` if ungenerated.
    pub fn record(&self, chunk: ChunkPos) -> Option<AquiferRecord> {
        self.records.get(&chunk).copied()
    }

    /// Register a spring as occupying its chunk. Idempotent.
    pub fn register_spring(&mut self, pos: BlockPos) {
        let chunk = pos.chunk();
        if self.springs.entry(chunk).or_default().insert(pos) {
            log::debug!("spring registered at {pos:?} in chunk {chunk:?}");
        }
    }

    /// Remove a spring from its chunk. Idempotent.
    pub fn deregister_spring(&mut self, pos: BlockPos) {
        let chunk = pos.chunk();
        if let Some(set) = self.springs.get_mut(&chunk) {
            if set.remove(&pos) {
                log::debug!("spring deregistered at {pos:?} in chunk {chunk:?}");
            }
            if set.is_empty() {
                self.springs.remove(&chunk);
            }
        }
    }

    /// Number of springs currently registered in a chunk.
    pub fn spring_count(&self, chunk: ChunkPos) -> usize {
        self.springs.get(&chunk).map(|s| s.len()).unwrap_or(0)
    }

    /// Positions of springs registered in a chunk.
    pub fn springs_in_chunk(&self, chunk: ChunkPos) -> Vec<BlockPos> {
        self.springs
            .get(&chunk)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }
}
