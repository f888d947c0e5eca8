//! One generation's game: a flock of birds flying through the same pipes.
//!
//! Every bird is driven by its own [`Decision`]. Birds that crash are taken
//! out of play at the end of the tick and their fitness is kept for the
//! learning driver.

use crate::assets::Assets;
use crate::base::Base;
use crate::bird::Bird;
use crate::neat::{FeedForwardNetwork, GenomeKey};
use crate::pipe::Pipe;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::rc::Rc;
use tracing::trace;

pub const WINDOW_WIDTH: u32 = 500;
pub const WINDOW_HEIGHT: u32 = 800;
pub const FLOOR_Y: f64 = 730.0;
pub const PIPE_SPAWN_X: f64 = 600.0;
pub const BIRD_START: (f64, f64) = (230.0, 350.0);

pub const SURVIVAL_REWARD: f64 = 0.1;
pub const PASS_REWARD: f64 = 5.0;
pub const COLLISION_PENALTY: f64 = 1.0;
pub const JUMP_THRESHOLD: f64 = 0.5;

/// Maps an observation `(y, |y - gap top|, |y - gap bottom|)` to outputs.
/// Only the first output is read.
pub trait Decision {
    fn decide(&self, observation: &[f64]) -> Vec<f64>;
}

impl<F> Decision for F
where
    F: Fn(&[f64]) -> Vec<f64>,
{
    fn decide(&self, observation: &[f64]) -> Vec<f64> {
        self(observation)
    }
}

impl Decision for FeedForwardNetwork {
    fn decide(&self, observation: &[f64]) -> Vec<f64> {
        self.activate(observation)
    }
}

pub struct Agent {
    pub key: GenomeKey,
    pub bird: Bird,
    pub fitness: f64,
    brain: Box<dyn Decision>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SimState {
    Running,
    Terminated,
}

/// What happened during one [`Simulation::tick`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TickReport {
    pub collided: Vec<GenomeKey>,
    pub out_of_bounds: Vec<GenomeKey>,
    pub passed: bool,
}

pub struct Simulation {
    assets: Rc<Assets>,
    agents: Vec<Agent>,
    eliminated: Vec<(GenomeKey, f64)>,
    pipes: Vec<Pipe>,
    base: Base,
    score: u32,
    ticks: u64,
    max_ticks: Option<u64>,
    state: SimState,
    rng: SmallRng,
}

impl Simulation {
    pub fn new(
        assets: Rc<Assets>,
        brains: Vec<(GenomeKey, Box<dyn Decision>)>,
        max_ticks: Option<u64>,
        seed: u64,
    ) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let agents = brains
            .into_iter()
            .map(|(key, brain)| Agent {
                key,
                bird: Bird::new(BIRD_START.0, BIRD_START.1),
                fitness: 0.0,
                brain,
            })
            .collect();
        let pipes = vec![Pipe::spawn(PIPE_SPAWN_X, &assets, &mut rng)];
        let base = Base::new(FLOOR_Y, assets.base.width);
        Self {
            assets,
            agents,
            eliminated: Vec::new(),
            pipes,
            base,
            score: 0,
            ticks: 0,
            max_ticks,
            state: SimState::Running,
            rng,
        }
    }

    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();
        if self.state == SimState::Terminated {
            return report;
        }
        if self.agents.is_empty() {
            self.state = SimState::Terminated;
            return report;
        }

        let pipe_w = self.assets.pipe_width() as f64;
        let pipe_ind = match (self.pipes.len(), self.agents.first()) {
            (n, Some(a)) if n > 1 && a.bird.x > self.pipes[0].x + pipe_w => 1,
            _ => 0,
        };

        // move and decide
        let (gap_top, gap_bottom) = self
            .pipes
            .get(pipe_ind)
            .map_or((0.0, FLOOR_Y), |p| (p.height, p.bottom));
        for agent in &mut self.agents {
            agent.bird.advance();
            agent.fitness += SURVIVAL_REWARD;
            let y = agent.bird.y;
            let output = agent.brain.decide(&[y, (y - gap_top).abs(), (y - gap_bottom).abs()]);
            if output.first().is_some_and(|&o| o > JUMP_THRESHOLD) {
                agent.bird.jump();
            }
        }

        // pipes
        let mut gone = vec![false; self.agents.len()];
        let mut remove = Vec::new();
        for (i, pipe) in self.pipes.iter_mut().enumerate() {
            for (j, agent) in self.agents.iter_mut().enumerate() {
                if gone[j] {
                    continue;
                }
                if pipe.collides_with(&agent.bird, &self.assets) {
                    agent.fitness -= COLLISION_PENALTY;
                    gone[j] = true;
                    report.collided.push(agent.key);
                }
                if pipe.mark_passed(&agent.bird) {
                    report.passed = true;
                }
            }
            if pipe.is_off_screen(&self.assets) {
                remove.push(i);
            }
            pipe.advance();
        }

        if report.passed {
            self.score += 1;
            for (agent, _) in self.agents.iter_mut().zip(&gone).filter(|(_, g)| !**g) {
                agent.fitness += PASS_REWARD;
            }
            let pipe = Pipe::spawn(PIPE_SPAWN_X, &self.assets, &mut self.rng);
            self.pipes.push(pipe);
        }
        for i in remove.into_iter().rev() {
            self.pipes.remove(i);
        }

        // floor and ceiling
        let bird_h = self.assets.bird_height() as f64;
        for (j, agent) in self.agents.iter().enumerate() {
            if !gone[j] && (agent.bird.y + bird_h >= FLOOR_Y || agent.bird.y <= 0.0) {
                gone[j] = true;
                report.out_of_bounds.push(agent.key);
            }
        }

        let mut flags = gone.into_iter();
        let eliminated = &mut self.eliminated;
        self.agents.retain(|agent| {
            let out = flags.next().unwrap_or(false);
            if out {
                eliminated.push((agent.key, agent.fitness));
            }
            !out
        });

        // the frame shown this tick is the mask tested on the next one
        for agent in &mut self.agents {
            agent.bird.animate();
        }
        self.base.advance();
        self.ticks += 1;
        trace!(
            tick = self.ticks,
            alive = self.agents.len(),
            score = self.score,
            pipes = self.pipes.len(),
            "tick"
        );

        let out_of_time = self.max_ticks.is_some_and(|m| self.ticks >= m);
        if self.agents.is_empty() || out_of_time {
            self.state = SimState::Terminated;
        }
        report
    }

    /// Ticks until the generation is over.
    pub fn run_to_end(&mut self) {
        while self.state == SimState::Running {
            self.tick();
        }
    }

    /// Fitness of every bird, eliminated ones first in elimination order.
    pub fn results(&self) -> Vec<(GenomeKey, f64)> {
        self.eliminated
            .iter()
            .copied()
            .chain(self.agents.iter().map(|a| (a.key, a.fitness)))
            .collect()
    }

    pub fn state(&self) -> SimState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == SimState::Terminated
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn alive(&self) -> usize {
        self.agents.len()
    }

    pub fn pipes(&self) -> &[Pipe] {
        &self.pipes
    }

    pub fn pipes_mut(&mut self) -> &mut Vec<Pipe> {
        &mut self.pipes
    }

    pub fn base(&self) -> &Base {
        &self.base
    }

    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn never(_: &[f64]) -> Vec<f64> {
        vec![0.0]
    }

    fn hover(o: &[f64]) -> Vec<f64> {
        vec![if o[0] > 350.0 { 1.0 } else { 0.0 }]
    }

    fn brain(f: impl Decision + 'static) -> Box<dyn Decision> {
        Box::new(f)
    }

    fn sim(brains: Vec<(GenomeKey, Box<dyn Decision>)>, max_ticks: Option<u64>) -> Simulation {
        Simulation::new(Rc::new(Assets::builtin()), brains, max_ticks, 7)
    }

    #[test]
    fn survivors_gain_fitness_every_tick() {
        let mut s = sim(vec![(1, brain(never))], None);
        s.tick();
        s.tick();
        assert_eq!(s.alive(), 1);
        assert!((s.agents()[0].fitness - 0.2).abs() < 1e-9);
        assert_eq!(s.ticks(), 2);
    }

    #[test]
    fn falling_bird_hits_the_floor_without_penalty() {
        let mut s = sim(vec![(1, brain(never))], None);
        s.pipes_mut().clear();
        let mut ticks = 0;
        let report = loop {
            let r = s.tick();
            ticks += 1;
            if !r.out_of_bounds.is_empty() {
                break r;
            }
        };
        assert_eq!(report.out_of_bounds, vec![1]);
        assert!(report.collided.is_empty());
        assert!(s.is_terminated());
        let results = s.results();
        assert_eq!(results.len(), 1);
        assert!((results[0].1 - 0.1 * ticks as f64).abs() < 1e-9);
    }

    #[test]
    fn neighbours_leaving_the_screen_together_are_both_recorded() {
        let mut s = sim(vec![(1, brain(never)), (2, brain(never)), (3, brain(hover))], None);
        s.pipes_mut().clear();
        let report = loop {
            let r = s.tick();
            if !r.out_of_bounds.is_empty() {
                break r;
            }
        };
        assert_eq!(report.out_of_bounds, vec![1, 2]);
        assert_eq!(s.alive(), 1);
        assert_eq!(s.agents()[0].key, 3);
        let results = s.results();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].1, results[1].1);
        let ticks = s.ticks();
        s.tick();
        assert!((s.agents()[0].fitness - 0.1 * (ticks + 1) as f64).abs() < 1e-9);
    }

    #[test]
    fn empty_flock_terminates_immediately() {
        let mut s = sim(Vec::new(), None);
        s.tick();
        assert!(s.is_terminated());
        assert!(s.results().is_empty());
    }

    #[test]
    fn max_ticks_ends_the_generation_with_survivors() {
        let mut s = sim(vec![(1, brain(hover)), (2, brain(hover))], Some(5));
        s.run_to_end();
        assert_eq!(s.ticks(), 5);
        assert_eq!(s.alive(), 2);
        assert_eq!(s.results().len(), 2);
    }

    #[test]
    fn observed_pipe_switches_once_the_first_is_behind() {
        let assets = Rc::new(Assets::builtin());
        let seen = Rc::new(std::cell::Cell::new(0.0));
        let probe = {
            let seen = Rc::clone(&seen);
            move |o: &[f64]| {
                seen.set(o[1]);
                hover(o)
            }
        };
        let mut s = Simulation::new(Rc::clone(&assets), vec![(1, brain(probe))], None, 3);
        s.pipes_mut().clear();
        let width = assets.pipe_width() as f64;
        let behind = Pipe::with_gap(BIRD_START.0 - width - 10.0, 100.0, &assets);
        let ahead = Pipe::with_gap(450.0, 300.0, &assets);
        s.pipes_mut().extend([behind, ahead]);
        s.tick();
        let y = s.agents()[0].bird.y;
        assert!((seen.get() - (y - 300.0).abs()).abs() < 1e-9);
    }
}
