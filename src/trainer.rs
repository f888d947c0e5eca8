use crate::assets::Assets;
use crate::config::Config;
use crate::error::NeatError;
use crate::neat::{FeedForwardNetwork, Genome, GenomeKey, Population};
use crate::sim::{Decision, Simulation};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::info;

// ============================
// Generational trainer (one simulation per generation)
// ============================

#[derive(Clone, Debug)]
pub enum Progress {
    Running,
    Finished { winner: Genome, solved: bool },
}

/// Steps the current generation's simulation; when every bird is down the
/// fitness goes back to the population and the next generation starts.
pub struct Trainer {
    population: Population,
    assets: Rc<Assets>,
    sim: Simulation,
    generations: u32,
    rng: SmallRng,
    progress: Progress,
}

impl Trainer {
    pub fn new(config: Config, assets: Rc<Assets>, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let generations = config.simulation.generations;
        let population = Population::new(config, rng.r#gen());
        let sim = build_simulation(population.genomes(), population.config(), &assets, rng.r#gen());
        Self { population, assets, sim, generations, rng, progress: Progress::Running }
    }

    pub fn tick(&mut self) -> Result<&Progress, NeatError> {
        if matches!(self.progress, Progress::Finished { .. }) {
            return Ok(&self.progress);
        }
        self.sim.tick();
        if !self.sim.is_terminated() {
            return Ok(&self.progress);
        }

        self.population.assign_fitness(&self.sim.results())?;
        let report = self.population.finish_generation()?;
        let done = report.generation + 1 >= self.generations;
        if report.solved || done {
            let winner = self.population.best_genome().cloned().unwrap_or(report.best);
            info!(generation = report.generation, genome = winner.key, fitness = winner.fitness, solved = report.solved, "training finished");
            self.progress = Progress::Finished { winner, solved: report.solved };
        } else {
            self.sim = build_simulation(
                self.population.genomes(),
                self.population.config(),
                &self.assets,
                self.rng.r#gen(),
            );
        }
        Ok(&self.progress)
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.progress, Progress::Finished { .. })
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn population(&self) -> &Population {
        &self.population
    }
}

fn build_simulation(
    genomes: &BTreeMap<GenomeKey, Genome>,
    config: &Config,
    assets: &Rc<Assets>,
    seed: u64,
) -> Simulation {
    let brains: Vec<(GenomeKey, Box<dyn Decision>)> = genomes
        .values()
        .map(|g| {
            let net: Box<dyn Decision> = Box::new(FeedForwardNetwork::create(g, &config.genome));
            (g.key, net)
        })
        .collect();
    Simulation::new(Rc::clone(assets), brains, config.simulation.max_ticks, seed)
}

/// Runs every generation to completion without a window.
pub fn train_headless(config: Config, assets: Rc<Assets>, seed: u64) -> Result<Genome, NeatError> {
    let mut rng = SmallRng::seed_from_u64(seed);
    let generations = config.simulation.generations;
    let mut population = Population::new(config, rng.r#gen());
    population.run(
        |genomes, config| {
            let mut sim = build_simulation(genomes, config, &assets, rng.r#gen());
            sim.run_to_end();
            Ok(sim.results())
        },
        generations,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_config() -> Config {
        let mut config = Config::default();
        config.neat.pop_size = 10;
        config.simulation.generations = 2;
        config.simulation.max_ticks = Some(200);
        config
    }

    #[test]
    fn trainer_walks_through_every_generation() {
        let mut trainer = Trainer::new(quick_config(), Rc::new(Assets::builtin()), 1);
        let mut ticks = 0;
        while !trainer.is_finished() {
            trainer.tick().unwrap();
            ticks += 1;
            assert!(ticks <= 2 * 200 + 2, "trainer did not finish");
        }
        let Progress::Finished { winner, solved } = trainer.progress() else {
            unreachable!()
        };
        assert!(!solved);
        assert!(winner.fitness.is_some());
        assert_eq!(trainer.population().stats().generations.len(), 2);
    }

    #[test]
    fn low_threshold_finishes_after_one_generation() {
        let mut config = quick_config();
        config.neat.fitness_threshold = 0.05;
        config.simulation.generations = 10;
        let mut trainer = Trainer::new(config, Rc::new(Assets::builtin()), 2);
        while !trainer.is_finished() {
            trainer.tick().unwrap();
        }
        assert!(matches!(trainer.progress(), Progress::Finished { solved: true, .. }));
        assert_eq!(trainer.population().generation(), 0);
    }
}
