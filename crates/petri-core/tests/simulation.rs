use petri_core::render::{self, RenderOptions, Rgba, Surface};
use petri_core::{
    EnvironmentPreset, FieldKind, ParameterUpdate, SeedParameters, SimConfig, Simulation,
    SimulationError, Trait, TraitSeed,
};

fn config(seed: u64, population: usize) -> SimConfig {
    SimConfig {
        seed,
        parameters: EnvironmentPreset::Neutral.parameters(),
        seed_parameters: SeedParameters {
            population,
            traits: TraitSeed::balanced(),
        },
        ..SimConfig::default()
    }
}

fn started(config: SimConfig) -> Simulation {
    let mut sim = Simulation::new(config).expect("valid config");
    sim.start();
    sim
}

#[test]
fn empty_population_runs_quietly() {
    let mut sim = started(config(1, 0));
    for _ in 0..100 {
        let snapshot = sim.step();
        assert_eq!(snapshot.population(), 0);
    }
    assert_eq!(sim.generation(), 100);
    assert!(sim.snapshot().statistics().extinction_events().is_empty());
}

#[test]
fn nutrient_update_is_visible_in_snapshot() {
    let mut sim = Simulation::new(config(2, 10)).expect("valid config");
    let before = sim.snapshot().environment.nutrients;
    sim.set_parameters(&ParameterUpdate {
        nutrients: Some(8.0),
        ..ParameterUpdate::default()
    })
    .expect("valid update");
    let after = sim.snapshot();
    assert_eq!(after.parameters().nutrients, 8.0);
    assert_ne!(after.environment.nutrients.data(), before.data());
    assert_eq!(after.environment.nutrients.kind(), FieldKind::Nutrient);
}

#[test]
fn balanced_population_survives_neutral_conditions() {
    let seeds = [3, 17, 29, 41, 58];
    let survivors = seeds
        .iter()
        .filter(|&&seed| {
            let mut sim = started(config(seed, 50));
            for _ in 0..500 {
                sim.step();
            }
            sim.population() > 0
        })
        .count();
    assert!(survivors >= 4, "only {survivors} of {} runs survived", seeds.len());
}

#[test]
fn long_runs_keep_history_bounded() {
    let mut sim = started(config(4, 20));
    sim.set_speed(10.0).expect("finite speed");
    for _ in 0..110 {
        sim.tick();
    }
    let snapshot = sim.snapshot();
    assert_eq!(snapshot.generation(), 1100);
    let stats = snapshot.statistics();
    assert_eq!(stats.population_history().len(), 1000);
    assert!(stats.trait_history().len() <= 1000);
    assert_eq!(stats.trait_series(Trait::Lifespan).count(), stats.trait_history().len());
}

#[test]
fn snapshots_are_independent_of_later_steps() {
    let mut sim = started(config(5, 30));
    let early = sim.step();
    let copy = early.clone();
    for _ in 0..25 {
        sim.step();
    }
    assert_eq!(early, copy);
    assert_eq!(early.generation(), 1);
    assert_ne!(sim.snapshot(), early);
}

#[test]
fn invalid_configuration_is_reported() {
    let mut bad = config(6, 10);
    bad.parameters.width = 0.0;
    assert!(matches!(
        Simulation::new(bad),
        Err(SimulationError::Config(_))
    ));
}

#[test]
fn snapshot_serializes_to_json() {
    let mut sim = started(config(7, 5));
    sim.step();
    let snapshot = sim.snapshot();
    let json = serde_json::to_string(&snapshot).expect("serialize");
    let back: petri_core::SimulationSnapshot = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(back.population(), snapshot.population());
    assert_eq!(back.generation(), 1);
}

#[derive(Default)]
struct Counter {
    rects: usize,
    circles: usize,
    lines: usize,
}

impl Surface for Counter {
    fn fill_background(&mut self, _: Rgba) {}
    fn fill_rect(&mut self, _: [f64; 2], _: [f64; 2], _: Rgba) {
        self.rects += 1;
    }
    fn fill_circle(&mut self, _: [f64; 2], _: f64, _: Rgba) {
        self.circles += 1;
    }
    fn line(&mut self, _: [f64; 2], _: [f64; 2], _: Rgba) {
        self.lines += 1;
    }
}

#[test]
fn draw_visits_every_living_agent() {
    let mut sim = started(config(8, 40));
    for _ in 0..10 {
        sim.step();
    }
    let snapshot = sim.snapshot();
    let mut counter = Counter::default();
    render::draw(
        &mut counter,
        &snapshot,
        &RenderOptions {
            show_nutrients: true,
            show_toxicity: false,
        },
    );
    assert_eq!(counter.circles, snapshot.population());
    assert!(counter.lines <= counter.circles);
    assert_eq!(counter.rects, snapshot.environment.nutrients.data().len());
}
