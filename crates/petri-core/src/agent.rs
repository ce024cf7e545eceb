use crate::field::Extent;
use crate::genome::Traits;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, per-simulation unique agent identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything an agent sees of its surroundings during one step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalConditions {
    pub temperature: f64,
    pub ph: f64,
    pub nutrient: f64,
    pub toxicity: f64,
    pub extent: Extent,
}

/// Per-step energy bookkeeping produced by [`Agent::metabolize`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EnergyBudget {
    pub temperature_factor: f64,
    pub ph_factor: f64,
    pub toxicity_factor: f64,
    pub consumption: f64,
    pub absorbed: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub(crate) id: AgentId,
    pub(crate) position: [f64; 2],
    pub(crate) velocity: [f64; 2],
    pub(crate) traits: Traits,
    pub(crate) age: u32,
    pub(crate) energy: f64,
    pub(crate) alive: bool,
    pub(crate) cooldown: u32,
}

impl Agent {
    pub const INITIAL_ENERGY: f64 = 100.0;
    pub const REPRODUCTION_MIN_ENERGY: f64 = 50.0;
    pub const REPRODUCTION_ENERGY_RETAINED: f64 = 0.7;
    pub const REPRODUCTION_COOLDOWN: u32 = 20;
    pub const OFFSPRING_JITTER: f64 = 5.0;
    pub const VELOCITY_REDRAW_CHANCE: f64 = 0.1;

    pub fn new<R: Rng + ?Sized>(id: AgentId, traits: Traits, position: [f64; 2], rng: &mut R) -> Self {
        Self {
            id,
            position,
            velocity: Self::random_velocity(traits.speed, rng),
            traits,
            age: 0,
            energy: Self::INITIAL_ENERGY,
            alive: true,
            cooldown: 0,
        }
    }

    fn random_velocity<R: Rng + ?Sized>(speed: f64, rng: &mut R) -> [f64; 2] {
        [
            rng.random_range(-1.0..1.0) * speed,
            rng.random_range(-1.0..1.0) * speed,
        ]
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn position(&self) -> [f64; 2] {
        self.position
    }

    pub fn velocity(&self) -> [f64; 2] {
        self.velocity
    }

    pub fn traits(&self) -> &Traits {
        &self.traits
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    pub fn cooldown(&self) -> u32 {
        self.cooldown
    }

    /// Environmental cost multipliers and nutrient uptake at the given
    /// conditions. Resistance terms are unclamped: resistance above 2 turns the
    /// temperature and pH penalties into bonuses.
    pub fn metabolize(&self, conditions: &LocalConditions) -> EnergyBudget {
        let t = &self.traits;
        let temperature_factor =
            1.0 + (conditions.temperature - 50.0).abs() / 50.0 * (1.0 - t.resistance * 0.5);
        let ph_factor = 1.0 + (conditions.ph - 7.0).abs() / 7.0 * (1.0 - t.resistance * 0.5);
        let toxicity_factor = 1.0 + conditions.toxicity * (1.0 - t.resistance * 0.8);
        let consumption =
            t.size * t.metabolism * temperature_factor * ph_factor * toxicity_factor;
        let absorbed = conditions.nutrient * t.size * 0.5 * (0.5 + t.metabolism * 0.5);
        EnergyBudget {
            temperature_factor,
            ph_factor,
            toxicity_factor,
            consumption,
            absorbed,
        }
    }

    /// Advance one tick: pay the metabolic cost, absorb nutrients, age, then
    /// move if still alive. Returns whether the agent survived.
    ///
    /// A dead agent is terminal; further calls change nothing.
    pub fn step<R: Rng + ?Sized>(&mut self, conditions: &LocalConditions, rng: &mut R) -> bool {
        if !self.alive {
            return false;
        }
        let budget = self.metabolize(conditions);
        self.energy -= budget.consumption;
        self.energy += budget.absorbed;
        self.age = self.age.saturating_add(1);
        self.cooldown = self.cooldown.saturating_sub(1);

        if self.energy <= 0.0 || f64::from(self.age) >= self.traits.lifespan {
            self.alive = false;
            return false;
        }
        self.advance_position(conditions.extent, rng);
        true
    }

    /// Wander with occasional heading changes, bouncing off the extent edges.
    fn advance_position<R: Rng + ?Sized>(&mut self, extent: Extent, rng: &mut R) {
        if rng.random::<f64>() < Self::VELOCITY_REDRAW_CHANCE {
            self.velocity = Self::random_velocity(self.traits.speed, rng);
        }
        let bounds = [extent.width, extent.height];
        for axis in 0..2 {
            self.position[axis] += self.velocity[axis];
            if self.position[axis] < 0.0 {
                self.position[axis] = 0.0;
                self.velocity[axis] = -self.velocity[axis];
            } else if self.position[axis] > bounds[axis] {
                self.position[axis] = bounds[axis];
                self.velocity[axis] = -self.velocity[axis];
            }
        }
    }

    pub fn can_reproduce(&self) -> bool {
        self.alive && self.cooldown == 0 && self.energy >= Self::REPRODUCTION_MIN_ENERGY
    }

    /// Spawn one mutated offspring near this agent, paying 30% of current
    /// energy and starting the cooldown. Returns `None`, leaving the parent
    /// untouched, when dead, cooling down or below the energy threshold.
    pub fn reproduce<R: Rng + ?Sized>(
        &mut self,
        child_id: AgentId,
        extent: Extent,
        rng: &mut R,
    ) -> Option<Agent> {
        if !self.can_reproduce() {
            return None;
        }
        self.energy *= Self::REPRODUCTION_ENERGY_RETAINED;
        self.cooldown = Self::REPRODUCTION_COOLDOWN;

        let jitter = Self::OFFSPRING_JITTER;
        let position = extent.clamp([
            self.position[0] + rng.random_range(-jitter..jitter),
            self.position[1] + rng.random_range(-jitter..jitter),
        ]);
        let traits = self.traits.mutated(rng);
        Some(Agent::new(child_id, traits, position, rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha12Rng;

    fn neutral(nutrient: f64, toxicity: f64) -> LocalConditions {
        LocalConditions {
            temperature: 50.0,
            ph: 7.0,
            nutrient,
            toxicity,
            extent: Extent::new(800.0, 600.0),
        }
    }

    fn make_agent(traits: Traits, rng: &mut ChaCha12Rng) -> Agent {
        Agent::new(AgentId(0), traits, [400.0, 300.0], rng)
    }

    #[test]
    fn construction_sets_initial_state() {
        let mut rng = ChaCha12Rng::seed_from_u64(1);
        let traits = Traits {
            speed: 2.0,
            ..Traits::baseline()
        };
        let agent = make_agent(traits, &mut rng);
        assert_eq!(agent.energy(), 100.0);
        assert_eq!(agent.age(), 0);
        assert_eq!(agent.cooldown(), 0);
        assert!(agent.is_alive());
        assert!(agent.velocity().iter().all(|v| v.abs() <= 2.0));
    }

    #[test]
    fn neutral_conditions_have_unit_factors_for_any_resistance() {
        let mut rng = ChaCha12Rng::seed_from_u64(2);
        for resistance in [0.01, 0.5, 1.0, 2.0, 7.5, 100.0] {
            let agent = make_agent(
                Traits {
                    resistance,
                    ..Traits::baseline()
                },
                &mut rng,
            );
            let b = agent.metabolize(&neutral(3.0, 0.0));
            assert_eq!(b.temperature_factor, 1.0);
            assert_eq!(b.ph_factor, 1.0);
            assert_eq!(b.toxicity_factor, 1.0);
        }
    }

    #[test]
    fn step_applies_energy_balance() {
        let mut rng = ChaCha12Rng::seed_from_u64(3);
        let traits = Traits {
            size: 4.0,
            metabolism: 1.5,
            resistance: 0.5,
            ..Traits::baseline()
        };
        let mut agent = make_agent(traits, &mut rng);
        let conditions = LocalConditions {
            temperature: 70.0,
            ph: 5.0,
            nutrient: 2.0,
            toxicity: 1.5,
            extent: Extent::new(800.0, 600.0),
        };
        let t_factor = 1.0 + 20.0 / 50.0 * (1.0 - 0.25);
        let ph_factor = 1.0 + 2.0 / 7.0 * (1.0 - 0.25);
        let tox_factor = 1.0 + 1.5 * (1.0 - 0.4);
        let consumption = 4.0 * 1.5 * t_factor * ph_factor * tox_factor;
        let absorbed = 2.0 * 4.0 * 0.5 * (0.5 + 0.75);
        let expected = 100.0 - consumption + absorbed;

        assert!(agent.step(&conditions, &mut rng));
        assert!((agent.energy() - expected).abs() < 1e-9, "{} vs {expected}", agent.energy());
        assert_eq!(agent.age(), 1);
    }

    #[test]
    fn starving_agent_dies_and_stays_dead() {
        let mut rng = ChaCha12Rng::seed_from_u64(4);
        let traits = Traits {
            size: 200.0,
            ..Traits::baseline()
        };
        let mut agent = make_agent(traits, &mut rng);
        assert!(!agent.step(&neutral(0.0, 0.0), &mut rng));
        assert!(agent.energy() <= 0.0);
        assert!(!agent.is_alive());

        let frozen = agent.clone();
        assert!(!agent.step(&neutral(100.0, 0.0), &mut rng));
        assert_eq!(agent, frozen);
    }

    #[test]
    fn agent_dies_when_reaching_lifespan() {
        let mut rng = ChaCha12Rng::seed_from_u64(5);
        let traits = Traits {
            lifespan: 3.0,
            ..Traits::baseline()
        };
        let mut agent = make_agent(traits, &mut rng);
        assert!(agent.step(&neutral(10.0, 0.0), &mut rng));
        assert!(agent.step(&neutral(10.0, 0.0), &mut rng));
        assert!(!agent.step(&neutral(10.0, 0.0), &mut rng));
        assert_eq!(agent.age(), 3);
    }

    #[test]
    fn movement_bounces_off_extent_edges() {
        let mut rng = ChaCha12Rng::seed_from_u64(6);
        let traits = Traits {
            speed: 50.0,
            ..Traits::baseline()
        };
        let mut agent = make_agent(traits, &mut rng);
        let conditions = neutral(20.0, 0.0);
        for _ in 0..60 {
            agent.step(&conditions, &mut rng);
            assert!(conditions.extent.contains(agent.position()), "{:?}", agent.position());
        }
    }

    #[test]
    fn crossing_the_edge_clamps_and_reflects() {
        let mut rng = ChaCha12Rng::seed_from_u64(7);
        let extent = Extent::new(800.0, 600.0);
        let mut agent = make_agent(Traits::baseline(), &mut rng);
        agent.position = [799.5, 0.5];
        agent.velocity = [1.0, -1.0];
        let mut bounced = false;
        for seed in 0..32 {
            let mut moved = agent.clone();
            let mut r = ChaCha12Rng::seed_from_u64(seed);
            moved.advance_position(extent, &mut r);
            if moved.velocity == [-1.0, 1.0] {
                assert_eq!(moved.position, [800.0, 0.0]);
                bounced = true;
            }
        }
        assert!(bounced, "no seed kept the prior velocity");
    }

    #[test]
    fn step_counts_cooldown_down_to_zero() {
        let mut rng = ChaCha12Rng::seed_from_u64(12);
        let mut agent = make_agent(Traits::baseline(), &mut rng);
        agent.cooldown = 5;
        assert!(agent.step(&neutral(10.0, 0.0), &mut rng));
        assert_eq!(agent.cooldown(), 4);

        agent.cooldown = 0;
        assert!(agent.step(&neutral(10.0, 0.0), &mut rng));
        assert_eq!(agent.cooldown(), 0);
    }

    #[test]
    fn heading_is_redrawn_about_one_step_in_ten() {
        let mut rng = ChaCha12Rng::seed_from_u64(13);
        let speed = 3.0;
        let traits = Traits {
            speed,
            ..Traits::baseline()
        };
        let mut agent = make_agent(traits, &mut rng);
        let extent = Extent::new(1e9, 1e9);
        let centre = [5e8, 5e8];
        let held = [0.25, -0.25];
        let trials = 10_000;
        let mut redrawn = 0usize;
        for _ in 0..trials {
            agent.position = centre;
            agent.velocity = held;
            agent.advance_position(extent, &mut rng);
            if agent.velocity != held {
                redrawn += 1;
                assert!(agent.velocity.iter().all(|v| v.abs() <= speed));
            }
            for axis in 0..2 {
                assert_eq!(agent.position[axis], centre[axis] + agent.velocity[axis]);
            }
        }
        let frac = redrawn as f64 / trials as f64;
        assert!((0.08..=0.12).contains(&frac), "redraw fraction {frac}");
    }

    #[test]
    fn dead_agent_cannot_reproduce() {
        let mut rng = ChaCha12Rng::seed_from_u64(14);
        let mut agent = make_agent(Traits::baseline(), &mut rng);
        agent.alive = false;
        agent.energy = 90.0;
        agent.cooldown = 0;
        assert!(!agent.can_reproduce());
        let before = agent.clone();
        assert!(agent
            .reproduce(AgentId(1), Extent::new(800.0, 600.0), &mut rng)
            .is_none());
        assert_eq!(agent, before);
    }

    #[test]
    fn reproduce_fails_below_threshold_without_side_effects() {
        let mut rng = ChaCha12Rng::seed_from_u64(8);
        let mut agent = make_agent(Traits::baseline(), &mut rng);
        agent.energy = 49.999;
        let before = agent.clone();
        assert!(agent
            .reproduce(AgentId(1), Extent::new(800.0, 600.0), &mut rng)
            .is_none());
        assert_eq!(agent, before);

        agent.energy = 90.0;
        agent.cooldown = 3;
        let before = agent.clone();
        assert!(agent
            .reproduce(AgentId(1), Extent::new(800.0, 600.0), &mut rng)
            .is_none());
        assert_eq!(agent, before);
    }

    #[test]
    fn reproduce_pays_energy_and_spawns_nearby_child() {
        let mut rng = ChaCha12Rng::seed_from_u64(9);
        let mut parent = make_agent(Traits::baseline(), &mut rng);
        parent.energy = 80.0;
        let child = parent
            .reproduce(AgentId(42), Extent::new(800.0, 600.0), &mut rng)
            .expect("parent is eligible");
        assert!((parent.energy() - 56.0).abs() < 1e-12);
        assert_eq!(parent.cooldown(), 20);
        assert_eq!(child.id(), AgentId(42));
        assert_eq!(child.energy(), 100.0);
        assert_eq!(child.age(), 0);
        for axis in 0..2 {
            assert!((child.position()[axis] - parent.position()[axis]).abs() <= 5.0);
        }
        assert!(parent
            .reproduce(AgentId(43), Extent::new(800.0, 600.0), &mut rng)
            .is_none());
    }

    #[test]
    fn offspring_of_zero_mutation_parent_inherit_exact_traits() {
        let mut rng = ChaCha12Rng::seed_from_u64(10);
        let traits = Traits {
            mutation_rate: 0.0,
            ..Traits::baseline()
        };
        let mut parent = make_agent(traits, &mut rng);
        let child = parent
            .reproduce(AgentId(1), Extent::new(800.0, 600.0), &mut rng)
            .expect("eligible");
        assert_eq!(child.traits(), parent.traits());
    }

    #[test]
    fn offspring_position_is_clamped_into_extent() {
        let mut rng = ChaCha12Rng::seed_from_u64(11);
        let extent = Extent::new(800.0, 600.0);
        for _ in 0..50 {
            let mut parent = Agent::new(AgentId(0), Traits::baseline(), [0.0, 600.0], &mut rng);
            let child = parent.reproduce(AgentId(1), extent, &mut rng).expect("eligible");
            assert!(extent.contains(child.position()));
        }
    }
}
