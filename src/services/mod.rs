pub mod aggregator;
pub mod loader;
pub mod parser;
