pub mod statistics;

pub use statistics::{trait_means, ExtinctionEvent, Statistics};

use crate::agent::{Agent, LocalConditions};
use crate::field::{Extent, Field, FieldKind};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Global scalar parameters of the environment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentParameters {
    /// Ambient temperature; 50 is the physiological optimum.
    pub temperature: f64,
    /// Ambient pH; 7 is the physiological optimum.
    pub ph: f64,
    /// Base level of the nutrient field.
    pub nutrients: f64,
    /// Base level of the toxicity field.
    pub toxicity: f64,
    /// Antibiotic level. Stored and reported; no physiological effect yet.
    pub antibiotics: f64,
    /// Soft population ceiling gating reproduction within a step.
    pub carrying_capacity: usize,
    /// Width of the environment extent in world units.
    pub width: f64,
    /// Height of the environment extent in world units.
    pub height: f64,
}

impl Default for EnvironmentParameters {
    fn default() -> Self {
        EnvironmentPreset::Neutral.parameters()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("parameter `{name}` must be finite (got {value})")]
    NonFinite { name: &'static str, value: f64 },
    #[error("parameter `{name}` must not be negative (got {value})")]
    Negative { name: &'static str, value: f64 },
    #[error("extent must be positive (got {width} x {height})")]
    EmptyExtent { width: f64, height: f64 },
}

impl EnvironmentParameters {
    pub fn extent(&self) -> Extent {
        Extent::new(self.width, self.height)
    }

    pub fn validate(&self) -> Result<(), ParameterError> {
        for (name, value) in [
            ("temperature", self.temperature),
            ("ph", self.ph),
            ("nutrients", self.nutrients),
            ("toxicity", self.toxicity),
            ("antibiotics", self.antibiotics),
            ("width", self.width),
            ("height", self.height),
        ] {
            if !value.is_finite() {
                return Err(ParameterError::NonFinite { name, value });
            }
            if value < 0.0 {
                return Err(ParameterError::Negative { name, value });
            }
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(ParameterError::EmptyExtent {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}

/// Partial parameter update; `None` fields keep their current value.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterUpdate {
    pub temperature: Option<f64>,
    pub ph: Option<f64>,
    pub nutrients: Option<f64>,
    pub toxicity: Option<f64>,
    pub antibiotics: Option<f64>,
    pub carrying_capacity: Option<usize>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl ParameterUpdate {
    pub fn merged(&self, current: &EnvironmentParameters) -> EnvironmentParameters {
        EnvironmentParameters {
            temperature: self.temperature.unwrap_or(current.temperature),
            ph: self.ph.unwrap_or(current.ph),
            nutrients: self.nutrients.unwrap_or(current.nutrients),
            toxicity: self.toxicity.unwrap_or(current.toxicity),
            antibiotics: self.antibiotics.unwrap_or(current.antibiotics),
            carrying_capacity: self.carrying_capacity.unwrap_or(current.carrying_capacity),
            width: self.width.unwrap_or(current.width),
            height: self.height.unwrap_or(current.height),
        }
    }
}

/// Named environment settings for front ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvironmentPreset {
    #[default]
    Neutral,
    Hot,
    Acidic,
    Toxic,
    Scarce,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown environment preset `{0}` (expected neutral, hot, acidic, toxic or scarce)")]
pub struct UnknownPreset(pub String);

impl EnvironmentPreset {
    pub const ALL: [EnvironmentPreset; 5] = [
        EnvironmentPreset::Neutral,
        EnvironmentPreset::Hot,
        EnvironmentPreset::Acidic,
        EnvironmentPreset::Toxic,
        EnvironmentPreset::Scarce,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EnvironmentPreset::Neutral => "neutral",
            EnvironmentPreset::Hot => "hot",
            EnvironmentPreset::Acidic => "acidic",
            EnvironmentPreset::Toxic => "toxic",
            EnvironmentPreset::Scarce => "scarce",
        }
    }

    /// The chemistry of this preset. Capacity and extent are left untouched so
    /// switching presets never resizes the world.
    pub fn update(self) -> ParameterUpdate {
        let (temperature, ph, nutrients, toxicity) = match self {
            EnvironmentPreset::Neutral => (50.0, 7.0, 5.0, 0.5),
            EnvironmentPreset::Hot => (85.0, 7.0, 5.0, 0.5),
            EnvironmentPreset::Acidic => (50.0, 3.5, 5.0, 0.5),
            EnvironmentPreset::Toxic => (50.0, 7.0, 5.0, 3.0),
            EnvironmentPreset::Scarce => (50.0, 7.0, 1.5, 0.5),
        };
        ParameterUpdate {
            temperature: Some(temperature),
            ph: Some(ph),
            nutrients: Some(nutrients),
            toxicity: Some(toxicity),
            antibiotics: Some(0.0),
            ..ParameterUpdate::default()
        }
    }

    pub fn parameters(self) -> EnvironmentParameters {
        let base = EnvironmentParameters {
            temperature: 50.0,
            ph: 7.0,
            nutrients: 5.0,
            toxicity: 0.5,
            antibiotics: 0.0,
            carrying_capacity: 500,
            width: 800.0,
            height: 600.0,
        };
        self.update().merged(&base)
    }
}

impl FromStr for EnvironmentPreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPreset(s.to_string()))
    }
}

/// Field geometry and bookkeeping cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSchedule {
    pub grid_size: usize,
    pub history_capacity: usize,
    pub nutrient_interval: u64,
    pub toxicity_interval: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("grid_size must be in 1..={max} (got {actual})")]
    GridSize { max: usize, actual: usize },
    #[error("history_capacity must be in 1..={max} (got {actual})")]
    HistoryCapacity { max: usize, actual: usize },
    #[error("{name} must be positive")]
    ZeroInterval { name: &'static str },
}

impl FieldSchedule {
    pub const MAX_GRID_SIZE: usize = 1024;
    pub const MAX_HISTORY_CAPACITY: usize = 1_000_000;

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.grid_size == 0 || self.grid_size > Self::MAX_GRID_SIZE {
            return Err(ScheduleError::GridSize {
                max: Self::MAX_GRID_SIZE,
                actual: self.grid_size,
            });
        }
        if self.history_capacity == 0 || self.history_capacity > Self::MAX_HISTORY_CAPACITY {
            return Err(ScheduleError::HistoryCapacity {
                max: Self::MAX_HISTORY_CAPACITY,
                actual: self.history_capacity,
            });
        }
        if self.nutrient_interval == 0 {
            return Err(ScheduleError::ZeroInterval {
                name: "nutrient_regeneration_interval",
            });
        }
        if self.toxicity_interval == 0 {
            return Err(ScheduleError::ZeroInterval {
                name: "toxicity_regeneration_interval",
            });
        }
        Ok(())
    }
}

impl Default for FieldSchedule {
    fn default() -> Self {
        Self {
            grid_size: Field::DEFAULT_GRID_SIZE,
            history_capacity: Statistics::DEFAULT_CAPACITY,
            nutrient_interval: 100,
            toxicity_interval: 150,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EnvironmentError {
    #[error(transparent)]
    Parameters(#[from] ParameterError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

/// Which fields a parameter merge regenerated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Regenerated {
    pub nutrients: bool,
    pub toxicity: bool,
}

/// Parameters, fields and statistics of one simulated world.
#[derive(Clone, Debug)]
pub struct Environment {
    parameters: EnvironmentParameters,
    schedule: FieldSchedule,
    nutrients: Field,
    toxicity: Field,
    statistics: Statistics,
    generation: u64,
}

/// Owned, read-only copy of the environment state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentSnapshot {
    pub generation: u64,
    pub parameters: EnvironmentParameters,
    pub statistics: Statistics,
    pub nutrients: Field,
    pub toxicity: Field,
}

impl Environment {
    pub fn new<R: Rng + ?Sized>(
        parameters: EnvironmentParameters,
        schedule: FieldSchedule,
        rng: &mut R,
    ) -> Result<Self, EnvironmentError> {
        parameters.validate()?;
        schedule.validate()?;
        let extent = parameters.extent();
        let nutrients = Field::generate(
            parameters.nutrients,
            FieldKind::Nutrient,
            extent,
            schedule.grid_size,
            rng,
        );
        let toxicity = Field::generate(
            parameters.toxicity,
            FieldKind::Toxicity,
            extent,
            schedule.grid_size,
            rng,
        );
        Ok(Self {
            parameters,
            schedule,
            nutrients,
            toxicity,
            statistics: Statistics::new(schedule.history_capacity),
            generation: 0,
        })
    }

    pub fn parameters(&self) -> &EnvironmentParameters {
        &self.parameters
    }

    pub fn schedule(&self) -> &FieldSchedule {
        &self.schedule
    }

    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn extent(&self) -> Extent {
        self.parameters.extent()
    }

    pub fn field(&self, kind: FieldKind) -> &Field {
        match kind {
            FieldKind::Nutrient => &self.nutrients,
            FieldKind::Toxicity => &self.toxicity,
        }
    }

    pub fn field_sample(&self, kind: FieldKind, x: f64, y: f64) -> f64 {
        self.field(kind).sample(x, y)
    }

    /// Conditions an agent at `position` experiences this step.
    pub fn conditions_at(&self, position: [f64; 2]) -> LocalConditions {
        LocalConditions {
            temperature: self.parameters.temperature,
            ph: self.parameters.ph,
            nutrient: self.nutrients.sample(position[0], position[1]),
            toxicity: self.toxicity.sample(position[0], position[1]),
            extent: self.extent(),
        }
    }

    /// Merge `update` into the current parameters.
    ///
    /// A field is regenerated only when its base level or the extent actually
    /// changed. Invalid merges are rejected and leave the environment as it was.
    pub fn set_parameters<R: Rng + ?Sized>(
        &mut self,
        update: &ParameterUpdate,
        rng: &mut R,
    ) -> Result<Regenerated, ParameterError> {
        let next = update.merged(&self.parameters);
        next.validate()?;
        let extent_changed =
            next.width != self.parameters.width || next.height != self.parameters.height;
        let regenerated = Regenerated {
            nutrients: extent_changed || next.nutrients != self.parameters.nutrients,
            toxicity: extent_changed || next.toxicity != self.parameters.toxicity,
        };
        self.parameters = next;
        if regenerated.nutrients {
            self.regenerate(FieldKind::Nutrient, rng);
        }
        if regenerated.toxicity {
            self.regenerate(FieldKind::Toxicity, rng);
        }
        Ok(regenerated)
    }

    pub fn regenerate<R: Rng + ?Sized>(&mut self, kind: FieldKind, rng: &mut R) {
        let extent = self.extent();
        let (slot, base) = match kind {
            FieldKind::Nutrient => (&mut self.nutrients, self.parameters.nutrients),
            FieldKind::Toxicity => (&mut self.toxicity, self.parameters.toxicity),
        };
        *slot = Field::generate(base, kind, extent, self.schedule.grid_size, rng);
        tracing::debug!(
            generation = self.generation,
            field = kind.name(),
            base,
            "regenerated field"
        );
    }

    /// Close out one generation: bump the counter, record statistics for the
    /// population as it stood before this step, then run any field
    /// regeneration due at the new generation.
    pub fn advance<R: Rng + ?Sized>(
        &mut self,
        agents: &[Agent],
        rng: &mut R,
    ) -> Option<ExtinctionEvent> {
        self.generation += 1;
        let event = self.statistics.record(self.generation, agents);
        if let Some(e) = &event {
            tracing::info!(
                generation = e.generation,
                previous = e.previous_population,
                current = e.current_population,
                "extinction event"
            );
        }
        if self.generation.is_multiple_of(self.schedule.nutrient_interval) {
            self.regenerate(FieldKind::Nutrient, rng);
        }
        if self.generation.is_multiple_of(self.schedule.toxicity_interval) {
            self.regenerate(FieldKind::Toxicity, rng);
        }
        event
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        EnvironmentSnapshot {
            generation: self.generation,
            parameters: self.parameters,
            statistics: self.statistics.clone(),
            nutrients: self.nutrients.clone(),
            toxicity: self.toxicity.clone(),
        }
    }
}
