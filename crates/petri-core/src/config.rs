use crate::environment::{EnvironmentParameters, FieldSchedule, ParameterError, ScheduleError};
use crate::genome::{TraitSeed, TraitSeedError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a fresh population is seeded on start-up and on reset.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedParameters {
    /// Number of agents created by `initialize_population` / `reset`.
    pub population: usize,
    /// Explicit trait values; unset traits are drawn around the baselines.
    pub traits: TraitSeed,
}

impl Default for SeedParameters {
    fn default() -> Self {
        Self {
            population: 50,
            traits: TraitSeed::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Deterministic seed for reproducible simulation runs.
    pub seed: u64,
    /// Initial environment parameters.
    pub parameters: EnvironmentParameters,
    /// Population seeding used at construction and by `reset`.
    pub seed_parameters: SeedParameters,
    /// Cells per side of the nutrient and toxicity grids.
    pub grid_size: usize,
    /// Maximum entries kept in each rolling history.
    pub history_capacity: usize,
    /// Generations between scheduled nutrient field regenerations.
    pub nutrient_regeneration_interval: u64,
    /// Generations between scheduled toxicity field regenerations.
    pub toxicity_regeneration_interval: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        let schedule = FieldSchedule::default();
        Self {
            seed: 42,
            parameters: EnvironmentParameters::default(),
            seed_parameters: SeedParameters::default(),
            grid_size: schedule.grid_size,
            history_capacity: schedule.history_capacity,
            nutrient_regeneration_interval: schedule.nutrient_interval,
            toxicity_regeneration_interval: schedule.toxicity_interval,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimConfigError {
    #[error(transparent)]
    Parameters(#[from] ParameterError),
    #[error(transparent)]
    TraitSeed(#[from] TraitSeedError),
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
    #[error("initial population ({actual}) exceeds supported maximum ({max})")]
    TooManyAgents { max: usize, actual: usize },
}

impl SimConfig {
    pub const MAX_INITIAL_POPULATION: usize = 1_000_000;

    pub fn validate(&self) -> Result<(), SimConfigError> {
        self.parameters.validate()?;
        self.seed_parameters.traits.validate()?;
        self.schedule().validate()?;
        if self.seed_parameters.population > Self::MAX_INITIAL_POPULATION {
            return Err(SimConfigError::TooManyAgents {
                max: Self::MAX_INITIAL_POPULATION,
                actual: self.seed_parameters.population,
            });
        }
        Ok(())
    }

    pub fn schedule(&self) -> FieldSchedule {
        FieldSchedule {
            grid_size: self.grid_size,
            history_capacity: self.history_capacity,
            nutrient_interval: self.nutrient_regeneration_interval,
            toxicity_interval: self.toxicity_regeneration_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Statistics;
    use crate::field::Field;
    use crate::genome::Trait;

    #[test]
    fn default_config_is_valid() {
        let cfg = SimConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.grid_size, Field::DEFAULT_GRID_SIZE);
        assert_eq!(cfg.history_capacity, Statistics::DEFAULT_CAPACITY);
    }

    #[test]
    fn legacy_config_json_deserializes_with_defaults() {
        let legacy_json = r#"{
            "seed": 7,
            "parameters": { "temperature": 60.0 },
            "seed_parameters": { "population": 10 }
        }"#;
        let cfg: SimConfig = serde_json::from_str(legacy_json).expect("legacy config should parse");
        assert_eq!(cfg.seed, 7);
        assert_eq!(cfg.parameters.temperature, 60.0);
        assert_eq!(cfg.parameters.ph, 7.0);
        assert_eq!(cfg.seed_parameters.population, 10);
        assert_eq!(cfg.nutrient_regeneration_interval, 100);
        assert_eq!(cfg.toxicity_regeneration_interval, 150);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_reports_structured_errors() {
        let cfg = SimConfig {
            grid_size: 0,
            ..SimConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(SimConfigError::Schedule(ScheduleError::GridSize {
                max: FieldSchedule::MAX_GRID_SIZE,
                actual: 0
            }))
        );

        let mut cfg = SimConfig::default();
        cfg.parameters.toxicity = -0.1;
        assert!(matches!(
            cfg.validate(),
            Err(SimConfigError::Parameters(ParameterError::Negative {
                name: "toxicity",
                ..
            }))
        ));

        let mut cfg = SimConfig::default();
        cfg.seed_parameters.traits.speed = Some(0.0);
        assert!(matches!(
            cfg.validate(),
            Err(SimConfigError::TraitSeed(TraitSeedError::NonPositive {
                name: Trait::Speed,
                ..
            }))
        ));

        let cfg = SimConfig {
            toxicity_regeneration_interval: 0,
            ..SimConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(SimConfigError::Schedule(ScheduleError::ZeroInterval {
                name: "toxicity_regeneration_interval"
            }))
        );
    }

    #[test]
    fn config_round_trips_through_json() {
        let cfg = SimConfig::default();
        let json = serde_json::to_string(&cfg).expect("serialize");
        let back: SimConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, cfg);
    }
}
