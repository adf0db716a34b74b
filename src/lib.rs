pub mod config;
pub mod dsl;
pub mod graph;
pub mod material;
