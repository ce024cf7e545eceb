use crate::agent::Agent;
use crate::environment::{trait_means, EnvironmentParameters, EnvironmentSnapshot, Statistics};
use crate::genome::Traits;
use crate::spatial;
use serde::{Deserialize, Serialize};

/// Owned copy of a simulation's state, safe to retain across steps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationSnapshot {
    pub agents: Vec<Agent>,
    pub environment: EnvironmentSnapshot,
    pub running: bool,
    pub speed: f64,
}

/// Aggregate figures over the living agents of one snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PopulationSummary {
    pub generation: u64,
    pub population: usize,
    pub energy_mean: f64,
    pub age_mean: f64,
    pub trait_means: Option<Traits>,
    pub extinction_events: usize,
}

impl SimulationSnapshot {
    pub fn generation(&self) -> u64 {
        self.environment.generation
    }

    pub fn parameters(&self) -> &EnvironmentParameters {
        &self.environment.parameters
    }

    pub fn statistics(&self) -> &Statistics {
        &self.environment.statistics
    }

    pub fn alive_agents(&self) -> impl Iterator<Item = &Agent> + '_ {
        self.agents.iter().filter(|a| a.is_alive())
    }

    pub fn population(&self) -> usize {
        self.alive_agents().count()
    }

    pub fn summary(&self) -> PopulationSummary {
        let population = self.population();
        let (energy_sum, age_sum) = self
            .alive_agents()
            .fold((0.0, 0.0), |(e, a), agent| {
                (e + agent.energy(), a + f64::from(agent.age()))
            });
        let denom = population.max(1) as f64;
        PopulationSummary {
            generation: self.generation(),
            population,
            energy_mean: energy_sum / denom,
            age_mean: age_sum / denom,
            trait_means: trait_means(&self.agents),
            extinction_events: self.statistics().extinction_events().len(),
        }
    }

    /// Living agents whose centre lies within `radius` of `(x, y)`, in
    /// collection order.
    pub fn agents_within(&self, x: f64, y: f64, radius: f64) -> Vec<&Agent> {
        let tree = spatial::build_index(&self.agents);
        spatial::query_within(&tree, [x, y], radius)
            .into_iter()
            .map(|i| &self.agents[i])
            .collect()
    }

    /// The living agent whose disc covers `(x, y)`. Overlaps resolve to the
    /// nearest centre.
    pub fn pick(&self, x: f64, y: f64) -> Option<&Agent> {
        let tree = spatial::build_index(&self.agents);
        spatial::locate_at(&tree, [x, y]).map(|i| &self.agents[i])
    }
}
