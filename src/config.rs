//! Training configuration, read once at startup from `neat_config.json`.
//!
//! Every field has a default, so a partial file only overrides what it names.
//! [`Config::load`] validates ranges before anything is built from it.

use crate::error::ConfigError;
use crate::neat::activation::Activation;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub neat: NeatSection,
    pub genome: GenomeConfig,
    pub species_set: SpeciesSetConfig,
    pub stagnation: StagnationConfig,
    pub reproduction: ReproductionConfig,
    pub simulation: SimulationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessCriterion {
    Max,
    Min,
    Mean,
}

impl FitnessCriterion {
    pub fn apply(self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        match self {
            FitnessCriterion::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            FitnessCriterion::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            FitnessCriterion::Mean => values.iter().sum::<f64>() / values.len() as f64,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeatSection {
    pub pop_size: usize,
    pub fitness_criterion: FitnessCriterion,
    pub fitness_threshold: f64,
    pub reset_on_extinction: bool,
    pub no_fitness_termination: bool,
}

impl Default for NeatSection {
    fn default() -> Self {
        Self {
            pop_size: 50,
            fitness_criterion: FitnessCriterion::Max,
            fitness_threshold: 100.0,
            reset_on_extinction: false,
            no_fitness_termination: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InitialConnection {
    Full,
    Unconnected,
}

/// Init/mutation parameters shared by every float gene attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloatAttr {
    pub init_mean: f64,
    pub init_stdev: f64,
    pub min_value: f64,
    pub max_value: f64,
    pub mutate_power: f64,
    pub mutate_rate: f64,
    pub replace_rate: f64,
}

impl Default for FloatAttr {
    fn default() -> Self {
        Self {
            init_mean: 0.0,
            init_stdev: 1.0,
            min_value: -30.0,
            max_value: 30.0,
            mutate_power: 0.5,
            mutate_rate: 0.7,
            replace_rate: 0.1,
        }
    }
}

impl FloatAttr {
    fn fixed(value: f64) -> Self {
        Self {
            init_mean: value,
            init_stdev: 0.0,
            mutate_power: 0.0,
            mutate_rate: 0.0,
            replace_rate: 0.0,
            ..Self::default()
        }
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min_value > self.max_value {
            return Err(ConfigError::Invalid(format!("{name}: min_value exceeds max_value")));
        }
        if self.init_stdev < 0.0 || self.mutate_power < 0.0 {
            return Err(ConfigError::Invalid(format!("{name}: stdev and mutate_power must be >= 0")));
        }
        check_probability(&format!("{name}.mutate_rate"), self.mutate_rate)?;
        check_probability(&format!("{name}.replace_rate"), self.replace_rate)?;
        if self.mutate_rate + self.replace_rate > 1.0 {
            return Err(ConfigError::Invalid(format!(
                "{name}: mutate_rate + replace_rate must not exceed 1"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenomeConfig {
    pub num_inputs: usize,
    pub num_outputs: usize,
    pub num_hidden: usize,
    pub initial_connection: InitialConnection,
    pub feed_forward: bool,

    pub activation_default: Activation,
    pub activation_options: Vec<Activation>,
    pub activation_mutate_rate: f64,

    pub bias: FloatAttr,
    pub response: FloatAttr,
    pub weight: FloatAttr,

    pub enabled_default: bool,
    pub enabled_mutate_rate: f64,

    pub conn_add_prob: f64,
    pub conn_delete_prob: f64,
    pub node_add_prob: f64,
    pub node_delete_prob: f64,

    pub compatibility_disjoint_coefficient: f64,
    pub compatibility_weight_coefficient: f64,
}

impl Default for GenomeConfig {
    fn default() -> Self {
        Self {
            num_inputs: 3,
            num_outputs: 1,
            num_hidden: 0,
            initial_connection: InitialConnection::Full,
            feed_forward: true,
            activation_default: Activation::Tanh,
            activation_options: vec![Activation::Tanh],
            activation_mutate_rate: 0.0,
            bias: FloatAttr::default(),
            response: FloatAttr::fixed(1.0),
            weight: FloatAttr::default(),
            enabled_default: true,
            enabled_mutate_rate: 0.01,
            conn_add_prob: 0.5,
            conn_delete_prob: 0.5,
            node_add_prob: 0.2,
            node_delete_prob: 0.2,
            compatibility_disjoint_coefficient: 1.0,
            compatibility_weight_coefficient: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeciesSetConfig {
    pub compatibility_threshold: f64,
}

impl Default for SpeciesSetConfig {
    fn default() -> Self {
        Self { compatibility_threshold: 3.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StagnationConfig {
    pub species_fitness_func: FitnessCriterion,
    pub max_stagnation: u32,
    pub species_elitism: usize,
}

impl Default for StagnationConfig {
    fn default() -> Self {
        Self {
            species_fitness_func: FitnessCriterion::Max,
            max_stagnation: 20,
            species_elitism: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReproductionConfig {
    pub elitism: usize,
    pub survival_threshold: f64,
    pub min_species_size: usize,
}

impl Default for ReproductionConfig {
    fn default() -> Self {
        Self {
            elitism: 2,
            survival_threshold: 0.2,
            min_species_size: 2,
        }
    }
}

/// Knobs for the game loop itself; the learning driver never reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Stop a generation after this many ticks even if birds survive.
    pub max_ticks: Option<u64>,
    pub tick_rate_hz: u32,
    pub generations: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_ticks: Some(20_000),
            tick_rate_hz: 40,
            generations: 60,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.neat.pop_size == 0 {
            return Err(ConfigError::Invalid("neat.pop_size must be at least 1".into()));
        }
        let g = &self.genome;
        if g.num_inputs != 3 {
            return Err(ConfigError::Invalid(format!(
                "genome.num_inputs must be 3 (height, top gap, bottom gap), got {}",
                g.num_inputs
            )));
        }
        if g.num_outputs == 0 {
            return Err(ConfigError::Invalid("genome.num_outputs must be at least 1".into()));
        }
        if g.activation_options.is_empty() {
            return Err(ConfigError::Invalid("genome.activation_options must not be empty".into()));
        }
        g.bias.validate("genome.bias")?;
        g.response.validate("genome.response")?;
        g.weight.validate("genome.weight")?;
        for (name, p) in [
            ("genome.activation_mutate_rate", g.activation_mutate_rate),
            ("genome.enabled_mutate_rate", g.enabled_mutate_rate),
            ("genome.conn_add_prob", g.conn_add_prob),
            ("genome.conn_delete_prob", g.conn_delete_prob),
            ("genome.node_add_prob", g.node_add_prob),
            ("genome.node_delete_prob", g.node_delete_prob),
        ] {
            check_probability(name, p)?;
        }
        if self.species_set.compatibility_threshold <= 0.0 {
            return Err(ConfigError::Invalid(
                "species_set.compatibility_threshold must be positive".into(),
            ));
        }
        let r = &self.reproduction;
        if !(r.survival_threshold > 0.0 && r.survival_threshold <= 1.0) {
            return Err(ConfigError::Invalid(
                "reproduction.survival_threshold must be in (0, 1]".into(),
            ));
        }
        if r.min_species_size == 0 {
            return Err(ConfigError::Invalid(
                "reproduction.min_species_size must be at least 1".into(),
            ));
        }
        if self.simulation.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("simulation.tick_rate_hz must be positive".into()));
        }
        if self.simulation.generations == 0 {
            return Err(ConfigError::Invalid("simulation.generations must be at least 1".into()));
        }
        if self.simulation.max_ticks == Some(0) {
            return Err(ConfigError::Invalid("simulation.max_ticks must be positive".into()));
        }
        Ok(())
    }
}

fn check_probability(name: &str, p: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {p}")))
    }
}
