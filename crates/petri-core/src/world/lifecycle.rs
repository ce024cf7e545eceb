use super::{Simulation, SimulationSnapshot};
use crate::agent::AgentId;

/// Births and deaths produced by one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub births: usize,
    pub deaths: usize,
    pub population: usize,
}

impl Simulation {
    /// Advance one generation and return the resulting snapshot. When the
    /// simulation is stopped nothing changes and the current snapshot is
    /// returned.
    pub fn step(&mut self) -> SimulationSnapshot {
        if self.running {
            self.advance_generation();
        }
        self.snapshot()
    }

    /// Run [`Simulation::steps_per_tick`] steps and return the final snapshot.
    pub fn tick(&mut self) -> SimulationSnapshot {
        if self.running {
            for _ in 0..self.steps_per_tick() {
                self.advance_generation();
            }
        }
        self.snapshot()
    }

    /// Statistics are recorded against the population as it stood before this
    /// step. Reproduction is gated on the running count of retained agents and
    /// offspring, so agents earlier in the collection win near the ceiling.
    pub(crate) fn advance_generation(&mut self) -> StepOutcome {
        self.environment.advance(&self.agents, &mut self.rng);

        let capacity = self.environment.parameters().carrying_capacity;
        let extent = self.environment.extent();
        let captured = std::mem::take(&mut self.agents);
        let mut next = Vec::with_capacity(captured.len());
        let mut outcome = StepOutcome::default();

        for mut agent in captured {
            if !agent.is_alive() {
                continue;
            }
            let conditions = self.environment.conditions_at(agent.position());
            if !agent.step(&conditions, &mut self.rng) {
                outcome.deaths += 1;
                continue;
            }
            // Counting the survivor itself, as it is retained before its offspring.
            let offspring = if next.len() + 1 < capacity {
                agent.reproduce(AgentId(self.next_agent_id), extent, &mut self.rng)
            } else {
                None
            };
            next.push(agent);
            if let Some(child) = offspring {
                self.allocate_agent_id();
                outcome.births += 1;
                next.push(child);
            }
        }

        outcome.population = next.len();
        self.agents = next;
        tracing::trace!(
            generation = self.environment.generation(),
            population = outcome.population,
            births = outcome.births,
            deaths = outcome.deaths,
            "step"
        );
        outcome
    }
}
