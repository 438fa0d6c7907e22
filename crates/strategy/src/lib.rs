pub mod config;
pub mod crossover;
pub mod indicators;

pub use config::WatchlistConfig;
pub use crossover::{CrossoverReading, EmaCrossover};
