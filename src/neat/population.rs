use super::genome::{Genome, GenomeKey};
use super::reproduction::Reproduction;
use super::species::SpeciesSet;
use super::stats::Statistics;
use crate::config::Config;
use crate::error::NeatError;
use ahash::AHashSet;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{info, warn};

/// Outcome of one finished generation.
#[derive(Clone, Debug)]
pub struct GenerationReport {
    pub generation: u32,
    pub best: Genome,
    /// The fitness criterion reached `fitness_threshold`.
    pub solved: bool,
}

/// The evolving set of genomes plus everything needed to breed the next one.
///
/// Used stepwise from the event loop (`genomes` / `assign_fitness` /
/// `finish_generation`) or in one go with [`Population::run`].
pub struct Population {
    config: Config,
    genomes: BTreeMap<GenomeKey, Genome>,
    species: SpeciesSet,
    reproduction: Reproduction,
    generation: u32,
    best_genome: Option<Genome>,
    stats: Statistics,
    rng: SmallRng,
    started: Instant,
}

impl Population {
    pub fn new(config: Config, seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut reproduction = Reproduction::new(&config);
        let genomes = reproduction.create_new(&config, config.neat.pop_size, &mut rng);
        let mut species = SpeciesSet::new();
        species.speciate(&config, &genomes, 0);
        info!(pop_size = genomes.len(), species = species.len(), "initial population created");
        Self {
            config,
            genomes,
            species,
            reproduction,
            generation: 0,
            best_genome: None,
            stats: Statistics::default(),
            rng,
            started: Instant::now(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn genomes(&self) -> &BTreeMap<GenomeKey, Genome> {
        &self.genomes
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn species(&self) -> &SpeciesSet {
        &self.species
    }

    /// Best genome seen in any finished generation.
    pub fn best_genome(&self) -> Option<&Genome> {
        self.best_genome.as_ref()
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Writes simulation results back. Every genome of the generation must
    /// appear exactly once; on error no fitness is changed.
    pub fn assign_fitness(&mut self, results: &[(GenomeKey, f64)]) -> Result<(), NeatError> {
        if results.len() != self.genomes.len() {
            return Err(NeatError::PopulationMismatch {
                expected: self.genomes.len(),
                actual: results.len(),
            });
        }
        let mut seen = AHashSet::with_capacity(results.len());
        for &(key, _) in results {
            if !self.genomes.contains_key(&key) {
                return Err(NeatError::UnknownGenome(key));
            }
            if !seen.insert(key) {
                return Err(NeatError::DuplicateResult(key));
            }
        }
        for &(key, fitness) in results {
            if let Some(genome) = self.genomes.get_mut(&key) {
                genome.fitness = Some(fitness);
            }
        }
        Ok(())
    }

    /// Records statistics for the evaluated generation, then breeds and
    /// speciates the next one.
    pub fn finish_generation(&mut self) -> Result<GenerationReport, NeatError> {
        let mut best: Option<&Genome> = None;
        for g in self.genomes.values() {
            let fitness = g.fitness.ok_or(NeatError::MissingFitness(g.key))?;
            if best.and_then(|b| b.fitness).is_none_or(|bf| fitness > bf) {
                best = Some(g);
            }
        }
        let best = best.cloned().ok_or(NeatError::CompleteExtinction)?;

        let s = self.stats.record(self.generation, &self.genomes, &best, self.species.len());
        info!(
            generation = s.generation,
            pop_size = self.genomes.len(),
            species = s.species,
            mean = s.mean,
            stdev = s.stdev,
            best = s.best,
            best_nodes = s.best_size.0,
            best_conns = s.best_size.1,
            elapsed_ms = self.started.elapsed().as_millis() as u64,
            "generation finished"
        );
        self.started = Instant::now();

        let is_new_best = self
            .best_genome
            .as_ref()
            .and_then(|b| b.fitness)
            .is_none_or(|bf| best.fitness.unwrap_or(f64::MIN) > bf);
        if is_new_best {
            self.best_genome = Some(best.clone());
        }

        let fitnesses: Vec<f64> = self.genomes.values().filter_map(|g| g.fitness).collect();
        let solved = !self.config.neat.no_fitness_termination
            && self.config.neat.fitness_criterion.apply(&fitnesses) >= self.config.neat.fitness_threshold;
        let report = GenerationReport { generation: self.generation, best, solved };
        if solved {
            info!(generation = self.generation, genome = report.best.key, "fitness threshold reached");
            return Ok(report);
        }

        let mut next = self.reproduction.reproduce(
            &self.config,
            &mut self.species,
            &self.genomes,
            self.generation,
            &mut self.rng,
        );
        if next.is_empty() {
            if !self.config.neat.reset_on_extinction {
                warn!(generation = self.generation, "complete extinction");
                return Err(NeatError::CompleteExtinction);
            }
            warn!(generation = self.generation, "complete extinction, starting a fresh population");
            self.species = SpeciesSet::new();
            next = self.reproduction.create_new(&self.config, self.config.neat.pop_size, &mut self.rng);
        }
        self.genomes = next;
        self.generation += 1;
        self.species.speciate(&self.config, &self.genomes, self.generation);
        Ok(report)
    }

    /// Evaluates and evolves up to `generations` times, stopping early once
    /// the fitness threshold is reached. Returns the best genome seen.
    pub fn run<F>(&mut self, mut evaluate: F, generations: u32) -> Result<Genome, NeatError>
    where
        F: FnMut(&BTreeMap<GenomeKey, Genome>, &Config) -> Result<Vec<(GenomeKey, f64)>, NeatError>,
    {
        for _ in 0..generations {
            let results = evaluate(&self.genomes, &self.config)?;
            self.assign_fitness(&results)?;
            if self.finish_generation()?.solved {
                break;
            }
        }
        self.best_genome.clone().ok_or(NeatError::CompleteExtinction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::neat::network::FeedForwardNetwork;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.neat.pop_size = 20;
        config
    }

    /// Rewards networks whose output tracks the first input.
    fn tracking_fitness(genomes: &BTreeMap<GenomeKey, Genome>, config: &Config) -> Result<Vec<(GenomeKey, f64)>, NeatError> {
        Ok(genomes
            .values()
            .map(|g| {
                let net = FeedForwardNetwork::create(g, &config.genome);
                let err: f64 = [-1.0, 0.0, 1.0]
                    .iter()
                    .map(|&x| (net.activate(&[x, 0.0, 0.0])[0] - x).abs())
                    .sum();
                (g.key, 10.0 - err)
            })
            .collect())
    }

    #[test]
    fn new_population_is_speciated() {
        let pop = Population::new(small_config(), 1);
        assert_eq!(pop.genomes().len(), 20);
        let members: usize = pop.species().species.values().map(|s| s.members.len()).sum();
        assert_eq!(members, 20);
        assert_eq!(pop.generation(), 0);
    }

    #[test]
    fn mismatched_results_are_rejected() {
        let mut pop = Population::new(small_config(), 2);
        let err = pop.assign_fitness(&[(1, 1.0)]).unwrap_err();
        assert!(matches!(err, NeatError::PopulationMismatch { expected: 20, actual: 1 }));

        let mut results: Vec<_> = pop.genomes().keys().map(|&k| (k, 1.0)).collect();
        results[0].0 = 9_999;
        assert!(matches!(pop.assign_fitness(&results), Err(NeatError::UnknownGenome(9_999))));
    }

    #[test]
    fn a_key_reported_twice_is_rejected() {
        let mut pop = Population::new(small_config(), 2);
        pop.run(|g, _| Ok(g.keys().map(|&k| (k, k as f64)).collect()), 1).unwrap();
        let keys: Vec<GenomeKey> = pop.genomes().keys().copied().collect();
        // the first elite still carries last generation's fitness
        let carried = pop.genomes()[&keys[0]].fitness;
        let mut results: Vec<_> = keys.iter().map(|&k| (k, 0.5)).collect();
        results[0].0 = keys[1];
        let err = pop.assign_fitness(&results).unwrap_err();
        assert!(matches!(err, NeatError::DuplicateResult(k) if k == keys[1]));
        assert_eq!(pop.genomes()[&keys[0]].fitness, carried);
        assert!(pop.genomes()[&keys[1]].fitness != Some(0.5));
    }

    #[test]
    fn finishing_without_fitness_fails() {
        let mut pop = Population::new(small_config(), 3);
        assert!(matches!(pop.finish_generation(), Err(NeatError::MissingFitness(_))));
    }

    #[test]
    fn run_advances_generations_and_keeps_best() {
        let mut pop = Population::new(small_config(), 4);
        let best = pop.run(tracking_fitness, 5).unwrap();
        assert_eq!(pop.generation(), 5);
        assert_eq!(pop.stats().generations.len(), 5);
        let history = pop.stats().best_fitness_history();
        let top = history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(best.fitness, Some(top));
    }

    #[test]
    fn run_stops_once_threshold_is_met() {
        let mut config = small_config();
        config.neat.fitness_threshold = 0.5;
        let mut pop = Population::new(config, 5);
        let best = pop.run(|g, _| Ok(g.keys().map(|&k| (k, 1.0)).collect()), 10).unwrap();
        assert_eq!(pop.stats().generations.len(), 1);
        assert_eq!(best.fitness, Some(1.0));
    }

    #[test]
    fn extinction_is_an_error_unless_reset_is_enabled() {
        let mut config = small_config();
        config.stagnation.max_stagnation = 1;
        config.stagnation.species_elitism = 0;
        let flat = |g: &BTreeMap<GenomeKey, Genome>, _: &Config| Ok(g.keys().map(|&k| (k, 1.0)).collect());

        let mut pop = Population::new(config.clone(), 6);
        assert!(matches!(pop.run(flat, 10), Err(NeatError::CompleteExtinction)));

        config.neat.reset_on_extinction = true;
        let mut pop = Population::new(config, 6);
        pop.run(flat, 10).unwrap();
        assert_eq!(pop.generation(), 10);
        assert!(!pop.genomes().is_empty());
    }
}
