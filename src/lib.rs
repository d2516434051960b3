//! Destro Sim - a discrete-event DPS simulator for a destruction warlock
//!
//! A rotation document is compiled into a priority list of condition-gated
//! actions; each iteration replays a fight against a training dummy and the
//! per-iteration counters are merged into an aggregate report.

pub mod actor;
pub mod aura;
pub mod batch;
pub mod config;
pub mod error;
pub mod registry;
pub mod rotation;
pub mod scheduler;
pub mod simulation;
pub mod spells;
pub mod stats;

pub use actor::{Actor, Stats};
pub use config::{SimConfig, TargetKind};
pub use error::{ConfigError, Error, Result, RotationError};
pub use registry::{Buff, Debuff, Item, Registry, Resource, Rune, Spell};
pub use rotation::{load_rotation, CompiledRotation};
pub use simulation::{SimParams, Simulator};
pub use stats::{AggregateResult, SimulationResult};
