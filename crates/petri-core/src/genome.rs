use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Heritable trait vector of an agent.
///
/// Every value is a strictly positive real with no upper bound. Mutation is
/// multiplicative and unclamped, so long runs can drift arbitrarily far from
/// the seeding baselines, including `mutation_rate` itself.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Traits {
    pub size: f64,
    pub speed: f64,
    pub metabolism: f64,
    pub resistance: f64,
    pub lifespan: f64,
    pub mutation_rate: f64,
}

/// Names a single entry of [`Traits`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trait {
    Size,
    Speed,
    Metabolism,
    Resistance,
    Lifespan,
    MutationRate,
}

impl Trait {
    pub const ALL: [Trait; 6] = [
        Trait::Size,
        Trait::Speed,
        Trait::Metabolism,
        Trait::Resistance,
        Trait::Lifespan,
        Trait::MutationRate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Trait::Size => "size",
            Trait::Speed => "speed",
            Trait::Metabolism => "metabolism",
            Trait::Resistance => "resistance",
            Trait::Lifespan => "lifespan",
            Trait::MutationRate => "mutation_rate",
        }
    }

    /// Baseline value and half-width of the uniform perturbation used when
    /// seeding a trait without an explicit value.
    pub fn baseline(self) -> (f64, f64) {
        match self {
            Trait::Size => (5.0, 1.5),
            Trait::Speed => (1.0, 0.3),
            Trait::Metabolism => (1.0, 0.2),
            Trait::Resistance => (1.0, 0.2),
            Trait::Lifespan => (100.0, 20.0),
            Trait::MutationRate => (0.1, 0.02),
        }
    }
}

impl fmt::Display for Trait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Traits {
    pub fn get(&self, t: Trait) -> f64 {
        match t {
            Trait::Size => self.size,
            Trait::Speed => self.speed,
            Trait::Metabolism => self.metabolism,
            Trait::Resistance => self.resistance,
            Trait::Lifespan => self.lifespan,
            Trait::MutationRate => self.mutation_rate,
        }
    }

    pub fn get_mut(&mut self, t: Trait) -> &mut f64 {
        match t {
            Trait::Size => &mut self.size,
            Trait::Speed => &mut self.speed,
            Trait::Metabolism => &mut self.metabolism,
            Trait::Resistance => &mut self.resistance,
            Trait::Lifespan => &mut self.lifespan,
            Trait::MutationRate => &mut self.mutation_rate,
        }
    }

    /// The baseline trait vector without perturbation.
    pub fn baseline() -> Self {
        Self {
            size: Trait::Size.baseline().0,
            speed: Trait::Speed.baseline().0,
            metabolism: Trait::Metabolism.baseline().0,
            resistance: Trait::Resistance.baseline().0,
            lifespan: Trait::Lifespan.baseline().0,
            mutation_rate: Trait::MutationRate.baseline().0,
        }
    }

    /// Child trait vector: every trait, `mutation_rate` included, goes through
    /// [`mutate_property`] with this (parent) vector's mutation rate.
    pub fn mutated<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let rate = self.mutation_rate;
        let mut child = *self;
        for t in Trait::ALL {
            let v = child.get_mut(t);
            *v = mutate_property(*v, rate, rng);
        }
        child
    }

    pub fn validate(&self) -> Result<(), TraitSeedError> {
        for t in Trait::ALL {
            check_positive(t, self.get(t))?;
        }
        Ok(())
    }
}

impl Default for Traits {
    fn default() -> Self {
        Self::baseline()
    }
}

/// With probability `mutation_rate`, scale `value` by `1 + uniform(-0.2, 0.2)`;
/// otherwise return it unchanged.
///
/// Rates above 1 mutate every time. A rate of exactly 0 never draws a scale
/// factor, which makes the call an exact identity.
pub fn mutate_property<R: Rng + ?Sized>(value: f64, mutation_rate: f64, rng: &mut R) -> f64 {
    if rng.random::<f64>() < mutation_rate {
        value * (1.0 + rng.random_range(-0.2..0.2))
    } else {
        value
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TraitSeedError {
    #[error("trait `{name}` must be positive and finite (got {value})")]
    NonPositive { name: Trait, value: f64 },
}

fn check_positive(name: Trait, value: f64) -> Result<(), TraitSeedError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(TraitSeedError::NonPositive { name, value })
    }
}

/// Optional explicit values for seeding a population. Missing entries are
/// drawn around the trait baselines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraitSeed {
    pub size: Option<f64>,
    pub speed: Option<f64>,
    pub metabolism: Option<f64>,
    pub resistance: Option<f64>,
    pub lifespan: Option<f64>,
    pub mutation_rate: Option<f64>,
}

impl TraitSeed {
    /// A seed pinning every trait to its baseline.
    pub fn balanced() -> Self {
        Self::from_traits(&Traits::baseline())
    }

    pub fn from_traits(traits: &Traits) -> Self {
        Self {
            size: Some(traits.size),
            speed: Some(traits.speed),
            metabolism: Some(traits.metabolism),
            resistance: Some(traits.resistance),
            lifespan: Some(traits.lifespan),
            mutation_rate: Some(traits.mutation_rate),
        }
    }

    pub fn get(&self, t: Trait) -> Option<f64> {
        match t {
            Trait::Size => self.size,
            Trait::Speed => self.speed,
            Trait::Metabolism => self.metabolism,
            Trait::Resistance => self.resistance,
            Trait::Lifespan => self.lifespan,
            Trait::MutationRate => self.mutation_rate,
        }
    }

    pub fn validate(&self) -> Result<(), TraitSeedError> {
        for t in Trait::ALL {
            if let Some(v) = self.get(t) {
                check_positive(t, v)?;
            }
        }
        Ok(())
    }

    /// Resolve a full trait vector, perturbing unset traits uniformly within
    /// `baseline ± spread`.
    pub fn resolve<R: Rng + ?Sized>(&self, rng: &mut R) -> Traits {
        let mut traits = Traits::baseline();
        for t in Trait::ALL {
            let value = match self.get(t) {
                Some(v) => v,
                None => {
                    let (base, spread) = t.baseline();
                    base + rng.random_range(-spread..spread)
                }
            };
            *traits.get_mut(t) = value;
        }
        traits
    }
}
