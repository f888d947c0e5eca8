use flappy_neat::assets::Assets;
use flappy_neat::pipe::Pipe;
use flappy_neat::sim::{Decision, PIPE_SPAWN_X, Simulation};
use std::rc::Rc;

fn never(_: &[f64]) -> Vec<f64> {
    vec![0.0]
}

/// Flaps whenever the bird sinks below its start height.
fn hover(o: &[f64]) -> Vec<f64> {
    vec![if o[0] > 350.0 { 1.0 } else { 0.0 }]
}

fn brain(f: fn(&[f64]) -> Vec<f64>) -> Box<dyn Decision> {
    Box::new(f)
}

fn fitness_of(sim: &Simulation, key: u64) -> f64 {
    sim.results()
        .into_iter()
        .find(|&(k, _)| k == key)
        .map(|(_, f)| f)
        .expect("genome missing from results")
}

#[test]
fn colliding_bird_is_penalised_and_removed_while_the_other_keeps_scoring() {
    let assets = Rc::new(Assets::builtin());
    let mut sim = Simulation::new(Rc::clone(&assets), vec![(1, brain(hover)), (2, brain(never))], None, 42);
    for _ in 0..9 {
        sim.tick();
    }
    assert_eq!(sim.alive(), 2);

    // gap spans 250..400: the hovering bird is inside it, the falling one is below
    let mut wall = Pipe::with_gap(220.0, 250.0, &assets);
    wall.passed = true;
    sim.pipes_mut().push(wall);

    let report = sim.tick();
    assert_eq!(report.collided, vec![2]);
    assert!(report.out_of_bounds.is_empty());
    assert_eq!(sim.alive(), 1);
    assert_eq!(sim.agents()[0].key, 1);
    assert!(fitness_of(&sim, 2).abs() < 1e-9, "ten ticks of survival minus the penalty");
    assert!((fitness_of(&sim, 1) - 1.0).abs() < 1e-9);

    sim.pipes_mut().retain(|p| p.x > 300.0);
    for _ in 0..5 {
        sim.tick();
    }
    assert_eq!(sim.alive(), 1);
    assert!((fitness_of(&sim, 1) - 1.5).abs() < 1e-9);
    assert!(fitness_of(&sim, 2).abs() < 1e-9);
}

#[test]
fn passing_a_pipe_pays_every_survivor_once_and_spawns_the_next() {
    let assets = Rc::new(Assets::builtin());
    let mut sim = Simulation::new(Rc::clone(&assets), vec![(1, brain(hover)), (2, brain(hover))], None, 9);
    sim.pipes_mut().clear();
    sim.pipes_mut().push(Pipe::with_gap(229.0, 300.0, &assets));

    let report = sim.tick();
    assert!(report.passed);
    assert!(report.collided.is_empty());
    assert_eq!(sim.score(), 1);
    assert_eq!(sim.pipes().len(), 2);
    assert!(sim.pipes()[0].passed);
    assert_eq!(sim.pipes()[1].x, PIPE_SPAWN_X);
    for agent in sim.agents() {
        assert!((agent.fitness - 5.1).abs() < 1e-9);
    }

    let report = sim.tick();
    assert!(!report.passed);
    assert_eq!(sim.score(), 1);
    for agent in sim.agents() {
        assert!((agent.fitness - 5.2).abs() < 1e-9);
    }
}

#[test]
fn base_segments_stay_one_width_apart() {
    let mut sim = Simulation::new(Rc::new(Assets::builtin()), vec![(1, brain(hover))], Some(400), 5);
    let width = sim.base().width();
    while !sim.is_terminated() {
        sim.tick();
        let base = sim.base();
        assert_eq!((base.x1 - base.x2).abs(), width);
    }
}

#[test]
fn every_genome_is_reported_exactly_once() {
    let brains = (1..=6).map(|k| (k, brain(if k % 2 == 0 { never } else { hover }))).collect();
    let mut sim = Simulation::new(Rc::new(Assets::builtin()), brains, Some(300), 11);
    sim.run_to_end();
    let mut keys: Vec<u64> = sim.results().into_iter().map(|(k, _)| k).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec![1, 2, 3, 4, 5, 6]);
}

#[test]
fn neighbours_colliding_on_the_same_tick_are_both_removed() {
    let assets = Rc::new(Assets::builtin());
    let brains = vec![(1, brain(never)), (2, brain(never)), (3, brain(hover))];
    let mut sim = Simulation::new(Rc::clone(&assets), brains, None, 42);
    for _ in 0..9 {
        sim.tick();
    }
    let mut wall = Pipe::with_gap(220.0, 250.0, &assets);
    wall.passed = true;
    sim.pipes_mut().push(wall);

    let report = sim.tick();
    assert_eq!(report.collided, vec![1, 2]);
    assert_eq!(sim.alive(), 1);
    assert_eq!(sim.agents()[0].key, 3);
    let results = sim.results();
    assert_eq!(results.iter().map(|&(k, _)| k).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert!(fitness_of(&sim, 1).abs() < 1e-9);
    assert!(fitness_of(&sim, 2).abs() < 1e-9);

    sim.pipes_mut().retain(|p| p.x > 300.0);
    for _ in 0..5 {
        sim.tick();
    }
    assert_eq!(sim.alive(), 1);
    assert!((fitness_of(&sim, 3) - 1.5).abs() < 1e-9);
}
