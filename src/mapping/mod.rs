pub mod generator;
pub mod loader;
pub mod trace_link;
