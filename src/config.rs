//! Simulation configuration and clock resources.

use bevy_ecs::prelude::*;

/// Tunable parameters for the groundwater simulation.
#[derive(Resource, Debug, Clone)]
pub struct WellConfig {
    /// Fraction of the per-spring aquifer share produced per day.
    pub output_ratio: f64,
    /// Server-wide production multiplier.
    pub global_multiplier: f64,
    /// Fixed output of a shallow well with surface water nearby, liters/day.
    pub shallow_liters_per_day: f64,
    /// Elapsed-day threshold below which a production tick is skipped,
    /// preventing sub-epsilon accumulation on fast tick rates.
    pub min_tick_days: f64,
    /// Retention floor that applies even with no shaft lining.
    pub base_depth: u32,
    /// Maximum lined depth recognized for a clay ring shaft.
    pub clay_max_depth: u32,
    /// Maximum lined depth recognized for a stone ring shaft.
    pub stone_max_depth: u32,
    /// Half-extent of the cube scanned for surface water by shallow wells.
    pub shallow_scan_radius: i32,
    /// Extra horizontal margin added to the entity scan around a column.
    pub entity_scan_margin: f64,
    /// Ticks between shaft lining re-validations.
    pub shaft_interval_ticks: u64,
    /// Ticks between column reconciliation passes.
    pub reconcile_interval_ticks: u64,
    /// How far below an orphaned water block the sentinel looks for a
    /// governing spring before self-clearing.
    pub sentinel_scan_depth: u32,
}

impl Default for WellConfig {
    fn default() -> Self {
        Self {
            output_ratio: 0.5,
            global_multiplier: 1.0,
            shallow_liters_per_day: 10.0,
            min_tick_days: 1.0e-5,
            base_depth: 1,
            clay_max_depth: 6,
            stone_max_depth: 12,
            shallow_scan_radius: 3,
            entity_scan_margin: 2.0,
            shaft_interval_ticks: 60,  // ~30 s at a 500 ms tick
            reconcile_interval_ticks: 120,
            sentinel_scan_depth: 16,
        }
    }
}

/// In-game calendar, in fractional days. Production scales with calendar
/// time, not wall clock, so game-speed changes carry through.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct Calendar {
    pub total_days: f64,
}

impl Calendar {
    pub fn advance(&mut self, days: f64) {
        self.total_days += days.max(0.0);
    }
}

/// Global simulation tick counter, used to schedule the slow-cadence
/// shaft-validation and reconciliation systems.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct SimTick(pub u64);

impl SimTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }

    /// Whether a system with the given tick interval runs this tick.
    #[inline]
    pub fn is_due(&self, interval: u64) -> bool {
        interval <= 1 || self.0 % interval == 0
    }
}
