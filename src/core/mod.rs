pub mod aggregate;
pub mod definition;
pub mod evaluate;
pub mod graph;
pub mod matrix;
pub mod model;
pub mod propagate;
pub mod types;
