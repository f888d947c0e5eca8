use super::genome::{Genome, GenomeKey};
use crate::config::Config;
use ahash::AHashMap;
use std::collections::BTreeMap;

pub type SpeciesKey = u32;

#[derive(Clone, Debug)]
pub struct Species {
    pub key: SpeciesKey,
    pub created: u32,
    pub last_improved: u32,
    pub representative: Genome,
    pub members: Vec<GenomeKey>,
    pub fitness: Option<f64>,
    pub adjusted_fitness: Option<f64>,
    pub fitness_history: Vec<f64>,
}

impl Species {
    fn new(key: SpeciesKey, generation: u32, representative: Genome) -> Self {
        Self {
            key,
            created: generation,
            last_improved: generation,
            representative,
            members: Vec::new(),
            fitness: None,
            adjusted_fitness: None,
            fitness_history: Vec::new(),
        }
    }

    pub fn member_fitnesses(&self, genomes: &BTreeMap<GenomeKey, Genome>) -> Vec<f64> {
        self.members
            .iter()
            .filter_map(|k| genomes.get(k).and_then(|g| g.fitness))
            .collect()
    }
}

#[derive(Clone, Debug, Default)]
pub struct SpeciesSet {
    pub species: BTreeMap<SpeciesKey, Species>,
    genome_to_species: AHashMap<GenomeKey, SpeciesKey>,
    next_key: SpeciesKey,
}

impl SpeciesSet {
    pub fn new() -> Self {
        Self { next_key: 1, ..Self::default() }
    }

    pub fn species_of(&self, genome: GenomeKey) -> Option<SpeciesKey> {
        self.genome_to_species.get(&genome).copied()
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Sorts `population` into species.
    ///
    /// Each existing species first claims the unassigned genome closest to
    /// its old representative as the new representative; the rest join the
    /// closest species within the compatibility threshold or found a new one.
    pub fn speciate(&mut self, config: &Config, population: &BTreeMap<GenomeKey, Genome>, generation: u32) {
        let gc = &config.genome;
        let threshold = config.species_set.compatibility_threshold;
        let mut distances: AHashMap<(GenomeKey, GenomeKey), f64> = AHashMap::new();
        let mut distance = |a: &Genome, b: &Genome| -> f64 {
            let key = if a.key <= b.key { (a.key, b.key) } else { (b.key, a.key) };
            *distances.entry(key).or_insert_with(|| a.distance(b, gc))
        };

        let mut unspeciated: Vec<GenomeKey> = population.keys().copied().collect();
        let mut representatives: BTreeMap<SpeciesKey, GenomeKey> = BTreeMap::new();
        let mut members: BTreeMap<SpeciesKey, Vec<GenomeKey>> = BTreeMap::new();

        for (&sid, species) in &self.species {
            let closest = unspeciated
                .iter()
                .enumerate()
                .map(|(i, gid)| (i, distance(&species.representative, &population[gid])))
                .min_by(|a, b| a.1.total_cmp(&b.1));
            let Some((idx, _)) = closest else { break };
            let gid = unspeciated.remove(idx);
            representatives.insert(sid, gid);
            members.insert(sid, vec![gid]);
        }

        for gid in unspeciated {
            let genome = &population[&gid];
            let best = representatives
                .iter()
                .map(|(&sid, rid)| (sid, distance(&population[rid], genome)))
                .filter(|&(_, d)| d < threshold)
                .min_by(|a, b| a.1.total_cmp(&b.1));
            match best {
                Some((sid, _)) => members.entry(sid).or_default().push(gid),
                None => {
                    let sid = self.next_key;
                    self.next_key += 1;
                    representatives.insert(sid, gid);
                    members.insert(sid, vec![gid]);
                }
            }
        }

        self.genome_to_species.clear();
        self.species.retain(|sid, _| representatives.contains_key(sid));
        for (sid, rid) in representatives {
            let rep = population[&rid].clone();
            let species = self
                .species
                .entry(sid)
                .or_insert_with(|| Species::new(sid, generation, rep.clone()));
            species.representative = rep;
            species.members = members.remove(&sid).unwrap_or_default();
            for &gid in &species.members {
                self.genome_to_species.insert(gid, sid);
            }
        }
    }

    /// Updates species fitness and returns `(species, stagnant)` pairs,
    /// ordered from least to most fit.
    pub fn update_stagnation(
        &mut self,
        config: &Config,
        genomes: &BTreeMap<GenomeKey, Genome>,
        generation: u32,
    ) -> Vec<(SpeciesKey, bool)> {
        let sc = &config.stagnation;
        let mut ranked: Vec<(SpeciesKey, f64, u32)> = Vec::with_capacity(self.species.len());
        for (&sid, s) in self.species.iter_mut() {
            let previous_best = s.fitness_history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let fitness = sc.species_fitness_func.apply(&s.member_fitnesses(genomes));
            s.fitness = Some(fitness);
            s.fitness_history.push(fitness);
            s.adjusted_fitness = None;
            if fitness > previous_best {
                s.last_improved = generation;
            }
            ranked.push((sid, fitness, s.last_improved));
        }
        ranked.sort_by(|a, b| a.1.total_cmp(&b.1));

        let total = ranked.len();
        let mut non_stagnant = total;
        let mut result = Vec::with_capacity(total);
        for (idx, (sid, _, last_improved)) in ranked.into_iter().enumerate() {
            let stagnant_time = generation.saturating_sub(last_improved);
            let mut stagnant = non_stagnant > sc.species_elitism && stagnant_time >= sc.max_stagnation;
            if total - idx <= sc.species_elitism {
                stagnant = false;
            }
            if stagnant {
                non_stagnant -= 1;
            }
            result.push((sid, stagnant));
        }
        result
    }
}
