use super::genome::{Genome, GenomeKey};
use std::collections::BTreeMap;

#[derive(Clone, Debug, PartialEq)]
pub struct GenerationStats {
    pub generation: u32,
    pub mean: f64,
    pub stdev: f64,
    pub best: f64,
    pub species: usize,
    /// `(nodes, enabled connections)` of the generation's best genome.
    pub best_size: (usize, usize),
}

/// Per-generation fitness summaries plus the best genome of each generation.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    pub generations: Vec<GenerationStats>,
    pub most_fit: Vec<Genome>,
}

impl Statistics {
    pub fn record(&mut self, generation: u32, genomes: &BTreeMap<GenomeKey, Genome>, best: &Genome, species: usize) -> &GenerationStats {
        let fitnesses: Vec<f64> = genomes.values().filter_map(|g| g.fitness).collect();
        let (mean, stdev) = mean_stdev(&fitnesses);
        self.most_fit.push(best.clone());
        self.generations.push(GenerationStats {
            generation,
            mean,
            stdev,
            best: best.fitness.unwrap_or(0.0),
            species,
            best_size: best.size(),
        });
        &self.generations[self.generations.len() - 1]
    }

    pub fn best_fitness_history(&self) -> Vec<f64> {
        self.generations.iter().map(|s| s.best).collect()
    }

    pub fn best_genome(&self) -> Option<&Genome> {
        self.most_fit
            .iter()
            .max_by(|a, b| a.fitness.unwrap_or(f64::MIN).total_cmp(&b.fitness.unwrap_or(f64::MIN)))
    }
}

fn mean_stdev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}
