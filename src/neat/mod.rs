//! NeuroEvolution of Augmenting Topologies: genomes, their feed-forward
//! phenotypes, speciation and the generational driver.

pub mod activation;
pub mod genome;
pub mod graph;
pub mod network;
pub mod population;
pub mod reproduction;
pub mod species;
pub mod stats;

pub use activation::Activation;
pub use genome::{Genome, GenomeKey};
pub use network::FeedForwardNetwork;
pub use population::{GenerationReport, Population};
pub use stats::Statistics;
