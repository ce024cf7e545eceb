pub mod lifecycle;
pub mod metrics;

pub use metrics::*;

use crate::agent::{Agent, AgentId};
use crate::config::{SeedParameters, SimConfig, SimConfigError};
use crate::environment::{Environment, EnvironmentError, ParameterError, ParameterUpdate, Regenerated};
use crate::genome::{TraitSeed, TraitSeedError};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use thiserror::Error;

/// Owns the environment and the live population and drives them through
/// discrete steps.
///
/// A simulation starts stopped; [`Simulation::step`] is a no-op until
/// [`Simulation::start`] is called.
pub struct Simulation {
    pub(crate) environment: Environment,
    pub(crate) agents: Vec<Agent>,
    pub(crate) config: SimConfig,
    pub(crate) seed_parameters: SeedParameters,
    pub(crate) rng: ChaCha12Rng,
    pub(crate) running: bool,
    pub(crate) speed: f64,
    pub(crate) next_agent_id: u64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Config(#[from] SimConfigError),
    #[error(transparent)]
    Parameters(#[from] ParameterError),
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    #[error(transparent)]
    TraitSeed(#[from] TraitSeedError),
    #[error("population ({actual}) exceeds supported maximum ({max})")]
    TooManyAgents { max: usize, actual: usize },
    #[error("speed multiplier must be finite (got {0})")]
    InvalidSpeed(f64),
}

impl Simulation {
    pub const MAX_POPULATION: usize = SimConfig::MAX_INITIAL_POPULATION;
    pub const MAX_SPEED: f64 = 1000.0;

    /// Build a stopped simulation with a freshly seeded population.
    pub fn new(config: SimConfig) -> Result<Self, SimulationError> {
        config.validate()?;
        let mut rng = ChaCha12Rng::seed_from_u64(config.seed);
        let environment = Environment::new(config.parameters, config.schedule(), &mut rng)?;
        let mut sim = Self {
            environment,
            agents: Vec::new(),
            seed_parameters: config.seed_parameters,
            config,
            rng,
            running: false,
            speed: 1.0,
            next_agent_id: 0,
        };
        let seed = sim.seed_parameters;
        sim.initialize_population(seed.population, &seed.traits)?;
        Ok(sim)
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Live population in iteration order.
    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn population(&self) -> usize {
        self.agents.iter().filter(|a| a.is_alive()).count()
    }

    pub fn generation(&self) -> u64 {
        self.environment.generation()
    }

    pub fn seed_parameters(&self) -> &SeedParameters {
        &self.seed_parameters
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Store the speed multiplier used by [`Simulation::tick`]. Values below 1
    /// still run one step per tick.
    pub fn set_speed(&mut self, multiplier: f64) -> Result<(), SimulationError> {
        if !multiplier.is_finite() || multiplier > Self::MAX_SPEED {
            return Err(SimulationError::InvalidSpeed(multiplier));
        }
        self.speed = multiplier;
        Ok(())
    }

    /// Steps a driver should run per tick: `round(max(1, speed))`.
    pub fn steps_per_tick(&self) -> u32 {
        self.speed.max(1.0).round() as u32
    }

    /// Merge a partial update into the environment parameters.
    pub fn set_parameters(
        &mut self,
        update: &ParameterUpdate,
    ) -> Result<Regenerated, SimulationError> {
        let regenerated = self.environment.set_parameters(update, &mut self.rng)?;
        self.config.parameters = *self.environment.parameters();
        Ok(regenerated)
    }

    /// Store the seeding used by the next [`Simulation::reset`]. The live
    /// population is left alone.
    pub fn set_seed_parameters(&mut self, seed: SeedParameters) -> Result<(), SimulationError> {
        seed.traits.validate()?;
        check_population(seed.population)?;
        self.seed_parameters = seed;
        Ok(())
    }

    /// Replace the live population with `count` fresh agents placed uniformly
    /// over the extent. Agent ids restart from zero.
    pub fn initialize_population(
        &mut self,
        count: usize,
        traits: &TraitSeed,
    ) -> Result<(), SimulationError> {
        traits.validate()?;
        check_population(count)?;
        let extent = self.environment.extent();
        self.next_agent_id = 0;
        let mut agents = Vec::with_capacity(count);
        for _ in 0..count {
            let id = self.allocate_agent_id();
            let resolved = traits.resolve(&mut self.rng);
            let position = [
                self.rng.random_range(0.0..extent.width),
                self.rng.random_range(0.0..extent.height),
            ];
            agents.push(Agent::new(id, resolved, position, &mut self.rng));
        }
        self.agents = agents;
        tracing::info!(
            population = count,
            generation = self.environment.generation(),
            "initialised population"
        );
        Ok(())
    }

    /// Rebuild the environment from the current parameters, clearing all
    /// statistics, and reseed the population from the stored seed parameters.
    /// Running state and speed are kept.
    pub fn reset(&mut self) -> Result<(), SimulationError> {
        let parameters = *self.environment.parameters();
        let schedule = *self.environment.schedule();
        self.environment = Environment::new(parameters, schedule, &mut self.rng)?;
        let seed = self.seed_parameters;
        self.initialize_population(seed.population, &seed.traits)?;
        tracing::info!(population = seed.population, "simulation reset");
        Ok(())
    }

    /// Owned view of the current state.
    pub fn snapshot(&self) -> SimulationSnapshot {
        SimulationSnapshot {
            agents: self.agents.clone(),
            environment: self.environment.snapshot(),
            running: self.running,
            speed: self.speed,
        }
    }

    pub(crate) fn allocate_agent_id(&mut self) -> AgentId {
        let id = AgentId(self.next_agent_id);
        self.next_agent_id += 1;
        id
    }
}

fn check_population(count: usize) -> Result<(), SimulationError> {
    if count > Simulation::MAX_POPULATION {
        return Err(SimulationError::TooManyAgents {
            max: Simulation::MAX_POPULATION,
            actual: count,
        });
    }
    Ok(())
}
