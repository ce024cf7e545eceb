//! Agent-based simulation of a population of simple organisms with heritable,
//! mutable traits living in a 2D environment of nutrient and toxicity fields.
//!
//! [`Simulation`] is the entry point: build one from a [`SimConfig`], call
//! [`Simulation::start`], then drive it with [`Simulation::step`] or
//! [`Simulation::tick`]. Every step returns an owned [`SimulationSnapshot`].

pub mod agent;
pub mod config;
pub mod environment;
pub mod field;
pub mod genome;
pub mod render;
pub mod spatial;
pub mod world;

pub use agent::{Agent, AgentId, EnergyBudget, LocalConditions};
pub use config::{SeedParameters, SimConfig, SimConfigError};
pub use environment::{
    Environment, EnvironmentError, EnvironmentParameters, EnvironmentPreset, EnvironmentSnapshot,
    ExtinctionEvent, FieldSchedule, ParameterError, ParameterUpdate, Regenerated, ScheduleError,
    Statistics,
};
pub use field::{Extent, Field, FieldError, FieldKind};
pub use genome::{Trait, TraitSeed, TraitSeedError, Traits};
pub use world::{PopulationSummary, Simulation, SimulationError, SimulationSnapshot};
