pub mod accumulator;
pub mod classifier;
