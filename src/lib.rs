//! polyevolve: approximates a reference image with a stack of translucent polygons,
//! evolved by mutation, unequal-length crossover and render-and-diff fitness.

pub mod crossover;
pub mod dna;
pub mod engine;
pub mod error;
pub mod fitness;
pub mod geom;
pub mod mutate;
pub mod mutation_config;
pub mod observers;
pub mod render;
pub mod settings;
