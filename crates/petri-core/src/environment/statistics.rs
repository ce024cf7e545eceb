use crate::agent::Agent;
use crate::genome::{Trait, Traits};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A sharp population drop between two consecutive generations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtinctionEvent {
    pub generation: u64,
    pub previous_population: usize,
    pub current_population: usize,
}

/// Rolling population and trait history plus the extinction log.
///
/// Histories are FIFO buffers capped at `capacity`; the extinction log is
/// unbounded and append-only.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    capacity: usize,
    population_history: VecDeque<usize>,
    trait_history: VecDeque<Traits>,
    extinction_events: Vec<ExtinctionEvent>,
}

impl Statistics {
    pub const DEFAULT_CAPACITY: usize = 1000;
    /// The previous population must exceed this for a drop to count.
    pub const EXTINCTION_MIN_PREVIOUS: usize = 10;
    /// A drop counts when current <= ratio * previous.
    pub const EXTINCTION_RATIO: f64 = 0.5;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            population_history: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            trait_history: VecDeque::with_capacity(capacity.min(Self::DEFAULT_CAPACITY)),
            extinction_events: Vec::new(),
        }
    }

    /// Record one generation. Returns the extinction event if this
    /// generation triggered one.
    pub(crate) fn record(&mut self, generation: u64, agents: &[Agent]) -> Option<ExtinctionEvent> {
        let population = agents.iter().filter(|a| a.is_alive()).count();
        let previous = self.population_history.back().copied();

        push_capped(&mut self.population_history, population, self.capacity);
        if let Some(means) = trait_means(agents) {
            push_capped(&mut self.trait_history, means, self.capacity);
        }

        let previous = previous?;
        if previous > Self::EXTINCTION_MIN_PREVIOUS
            && population as f64 <= previous as f64 * Self::EXTINCTION_RATIO
        {
            let event = ExtinctionEvent {
                generation,
                previous_population: previous,
                current_population: population,
            };
            self.extinction_events.push(event);
            return Some(event);
        }
        None
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Population counts, oldest first.
    pub fn population_history(&self) -> &VecDeque<usize> {
        &self.population_history
    }

    /// Per-generation trait means, oldest first. Generations with no living
    /// agents have no entry.
    pub fn trait_history(&self) -> &VecDeque<Traits> {
        &self.trait_history
    }

    /// History of a single trait's population mean, oldest first.
    pub fn trait_series(&self, t: Trait) -> impl Iterator<Item = f64> + '_ {
        self.trait_history.iter().map(move |means| means.get(t))
    }

    pub fn extinction_events(&self) -> &[ExtinctionEvent] {
        &self.extinction_events
    }

    pub fn latest_population(&self) -> Option<usize> {
        self.population_history.back().copied()
    }

    pub fn peak_population(&self) -> usize {
        self.population_history.iter().copied().max().unwrap_or(0)
    }
}

impl Default for Statistics {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

fn push_capped<T>(buf: &mut VecDeque<T>, value: T, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while buf.len() >= capacity {
        buf.pop_front();
    }
    buf.push_back(value);
}

/// Arithmetic mean of every trait over the living agents, `None` when there
/// are none.
pub fn trait_means(agents: &[Agent]) -> Option<Traits> {
    let mut count = 0usize;
    let mut sums = [0.0f64; 6];
    for agent in agents.iter().filter(|a| a.is_alive()) {
        for (sum, t) in sums.iter_mut().zip(Trait::ALL) {
            *sum += agent.traits().get(t);
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    let mut means = Traits::baseline();
    for (sum, t) in sums.iter().zip(Trait::ALL) {
        *means.get_mut(t) = sum / count as f64;
    }
    Some(means)
}
