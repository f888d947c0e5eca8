//! Flappy Bird played by a population of neural networks evolved with NEAT.

pub mod assets;
pub mod base;
pub mod bird;
pub mod config;
pub mod error;
pub mod neat;
pub mod pipe;
pub mod render;
pub mod sim;
pub mod sprite;
pub mod trainer;
