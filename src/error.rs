use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading or validating `neat_config.json`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures while building sprites from image files or sprite sheets.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset directory {0} does not exist")]
    MissingDir(PathBuf),
    #[error("failed to read sprite sheet {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("sprite sheet `{name}` line {line}: {reason}")]
    Malformed {
        name: String,
        line: usize,
        reason: String,
    },
    #[error("sprite `{0}` has no pixels")]
    Empty(String),
}

/// Failures raised by the learning driver.
#[derive(Debug, Error)]
pub enum NeatError {
    #[error("all species went extinct and reset_on_extinction is disabled")]
    CompleteExtinction,
    #[error("simulation returned {actual} fitness results for {expected} genomes")]
    PopulationMismatch { expected: usize, actual: usize },
    #[error("no genome with key {0} in the current generation")]
    UnknownGenome(u64),
    #[error("genome {0} was reported more than once")]
    DuplicateResult(u64),
    #[error("genome {0} was never assigned a fitness")]
    MissingFitness(u64),
}
