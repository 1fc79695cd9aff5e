//! ECS systems for the groundwater simulation.
//!
//! Systems run chained in a fixed order each tick so every stage sees the
//! output of the previous one:
//!
//! **Group 1 (World observation)** - slow cadence, read world geometry:
//! - `shaft_validation_system` - Re-classifies shaft linings
//! - `reconcile_system` - Corrects stored liters against observed blocks
//!
//! **Group 2 (Water state)** - main per-tick logic:
//! - `spring_production_system` - Accumulates liters from aquifer/surface
//! - `contamination_system` - Applies pollution transitions
//!
//! **Group 3 (World projection)** - write spring state back into blocks:
//! - `column_sync_system` - Rewrites dirty columns block by block
//! - `vertical_transfer_system` - Cascades excess volume down stacked shafts
//!
//! The sentinel check and persistence helpers are host-invoked rather than
//! scheduled.

pub mod column;
pub mod contamination;
pub mod production;
pub mod sentinel;
pub mod serialization;
pub mod transfer;

pub use column::*;
pub use contamination::*;
pub use production::*;
pub use sentinel::*;
pub use serialization::*;
pub use transfer::*;
