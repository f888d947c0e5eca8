use super::genome::{Genome, GenomeKey, NodeIndexer};
use super::species::SpeciesSet;
use crate::config::Config;
use rand::Rng;
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use tracing::info;

/// Creates offspring generations and owns the genome/node key counters.
#[derive(Clone, Debug)]
pub struct Reproduction {
    next_genome: GenomeKey,
    pub node_indexer: NodeIndexer,
    /// Parents of every genome created by crossover.
    pub ancestors: BTreeMap<GenomeKey, (GenomeKey, GenomeKey)>,
}

impl Reproduction {
    pub fn new(config: &Config) -> Self {
        Self {
            next_genome: 1,
            node_indexer: NodeIndexer::new(&config.genome),
            ancestors: BTreeMap::new(),
        }
    }

    pub fn create_new<R: Rng>(&mut self, config: &Config, count: usize, rng: &mut R) -> BTreeMap<GenomeKey, Genome> {
        let mut genomes = BTreeMap::new();
        for _ in 0..count {
            let key = self.take_key();
            let g = Genome::new_initial(key, &config.genome, &mut self.node_indexer, rng);
            genomes.insert(key, g);
        }
        genomes
    }

    fn take_key(&mut self) -> GenomeKey {
        let key = self.next_genome;
        self.next_genome += 1;
        key
    }

    /// Builds the next generation. Stagnant species are removed from
    /// `species`; an empty result means every species went extinct.
    pub fn reproduce<R: Rng>(
        &mut self,
        config: &Config,
        species: &mut SpeciesSet,
        genomes: &BTreeMap<GenomeKey, Genome>,
        generation: u32,
        rng: &mut R,
    ) -> BTreeMap<GenomeKey, Genome> {
        let rc = &config.reproduction;
        let mut all_fitnesses = Vec::new();
        let mut remaining = Vec::new();
        for (sid, stagnant) in species.update_stagnation(config, genomes, generation) {
            if stagnant {
                if let Some(s) = species.species.get(&sid) {
                    info!(species = sid, members = s.members.len(), "species removed for stagnation");
                }
                continue;
            }
            if let Some(s) = species.species.get(&sid) {
                all_fitnesses.extend(s.member_fitnesses(genomes));
            }
            remaining.push(sid);
        }
        if remaining.is_empty() {
            species.species.clear();
            return BTreeMap::new();
        }

        let min_fitness = all_fitnesses.iter().copied().fold(f64::INFINITY, f64::min);
        let max_fitness = all_fitnesses.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let fitness_range = (max_fitness - min_fitness).max(1.0);

        let mut adjusted = Vec::with_capacity(remaining.len());
        let mut previous_sizes = Vec::with_capacity(remaining.len());
        for sid in &remaining {
            let Some(s) = species.species.get_mut(sid) else { continue };
            let fits = s.member_fitnesses(genomes);
            let mean = if fits.is_empty() { min_fitness } else { fits.iter().sum::<f64>() / fits.len() as f64 };
            let af = (mean - min_fitness) / fitness_range;
            s.adjusted_fitness = Some(af);
            adjusted.push(af);
            previous_sizes.push(s.members.len());
        }

        let min_species_size = rc.min_species_size.max(rc.elitism);
        let spawn_amounts = compute_spawn(&adjusted, &previous_sizes, config.neat.pop_size, min_species_size);

        let mut next = BTreeMap::new();
        let survivors: Vec<_> = remaining.iter().copied().zip(spawn_amounts).collect();
        species.species.retain(|sid, _| remaining.contains(sid));
        for (sid, spawn) in survivors {
            let Some(s) = species.species.get_mut(&sid) else { continue };
            let mut spawn = spawn.max(rc.elitism);

            let mut old_members: Vec<&Genome> = s.members.iter().filter_map(|k| genomes.get(k)).collect();
            s.members.clear();
            old_members.sort_by(|a, b| {
                b.fitness.unwrap_or(f64::MIN).total_cmp(&a.fitness.unwrap_or(f64::MIN))
            });

            for elite in old_members.iter().take(rc.elitism) {
                next.insert(elite.key, (*elite).clone());
                spawn = spawn.saturating_sub(1);
            }
            if spawn == 0 || old_members.is_empty() {
                continue;
            }

            let cutoff = ((rc.survival_threshold * old_members.len() as f64).ceil() as usize).max(2);
            old_members.truncate(cutoff);

            for _ in 0..spawn {
                let (Some(p1), Some(p2)) = (old_members.choose(rng), old_members.choose(rng)) else {
                    break;
                };
                let key = self.take_key();
                let mut child = Genome::crossover(key, p1, p2, rng);
                child.mutate(&config.genome, &mut self.node_indexer, rng);
                self.ancestors.insert(key, (p1.key, p2.key));
                next.insert(key, child);
            }
        }
        next
    }
}

/// Offspring per species: move halfway from the previous size toward the
/// fitness-proportional share, then normalise to the population size.
pub fn compute_spawn(adjusted: &[f64], previous_sizes: &[usize], pop_size: usize, min_species_size: usize) -> Vec<usize> {
    let af_sum: f64 = adjusted.iter().sum();
    let raw: Vec<f64> = adjusted
        .iter()
        .zip(previous_sizes)
        .map(|(&af, &ps)| {
            let target = if af_sum > 0.0 {
                (af / af_sum * pop_size as f64).max(min_species_size as f64)
            } else {
                min_species_size as f64
            };
            let d = (target - ps as f64) * 0.5;
            let c = d.round();
            let ps = ps as f64;
            if c.abs() > 0.0 {
                ps + c
            } else if d > 0.0 {
                ps + 1.0
            } else if d < 0.0 {
                ps - 1.0
            } else {
                ps
            }
        })
        .collect();

    let total: f64 = raw.iter().sum();
    let norm = if total > 0.0 { pop_size as f64 / total } else { 1.0 };
    raw.iter()
        .map(|n| ((n * norm).round().max(0.0) as usize).max(min_species_size))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    #[test]
    fn spawn_favours_fitter_species() {
        let spawn = compute_spawn(&[0.0, 1.0], &[25, 25], 50, 2);
        assert!(spawn[1] > spawn[0]);
        assert!(spawn.iter().all(|&n| n >= 2));
        let total: usize = spawn.iter().sum();
        assert!((48..=52).contains(&total), "total {total}");
    }

    #[test]
    fn zero_adjusted_fitness_falls_back_to_minimum_share() {
        let spawn = compute_spawn(&[0.0, 0.0], &[2, 2], 10, 2);
        assert_eq!(spawn, vec![5, 5]);
    }

    #[test]
    fn reproduce_keeps_population_close_to_target_and_preserves_elites() {
        let config = Config::default();
        let mut rng = SmallRng::seed_from_u64(11);
        let mut repro = Reproduction::new(&config);
        let mut genomes = repro.create_new(&config, config.neat.pop_size, &mut rng);
        for (i, g) in genomes.values_mut().enumerate() {
            g.fitness = Some(i as f64);
        }
        let best_key = *genomes.keys().last().unwrap();

        let mut species = SpeciesSet::new();
        species.speciate(&config, &genomes, 0);
        let next = repro.reproduce(&config, &mut species, &genomes, 0, &mut rng);

        let n = next.len();
        assert!(n >= config.neat.pop_size - 5 && n <= config.neat.pop_size + 5, "got {n}");
        assert!(next.contains_key(&best_key), "best genome must survive as an elite");
        for (k, g) in &next {
            assert_eq!(*k, g.key);
            if !genomes.contains_key(k) {
                assert!(repro.ancestors.contains_key(k));
            }
        }
    }

    #[test]
    fn all_stagnant_species_means_extinction() {
        let mut config = Config::default();
        config.stagnation.max_stagnation = 1;
        config.stagnation.species_elitism = 0;
        let mut rng = SmallRng::seed_from_u64(12);
        let mut repro = Reproduction::new(&config);
        let mut genomes = repro.create_new(&config, 6, &mut rng);
        for g in genomes.values_mut() {
            g.fitness = Some(1.0);
        }
        let mut species = SpeciesSet::new();
        species.speciate(&config, &genomes, 0);
        species.update_stagnation(&config, &genomes, 0);
        let next = repro.reproduce(&config, &mut species, &genomes, 4, &mut rng);
        assert!(next.is_empty());
        assert!(species.is_empty());
    }
}
