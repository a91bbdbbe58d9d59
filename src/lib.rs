//! Architecture-to-code trace link recovery as a declarative computation DAG.
//!
//! Heuristic leaves score (architecture endpoint, code endpoint) pairs,
//! aggregation nodes combine and gate their results, and the engine evaluates
//! a root node over one model pair with a cache scoped to that call.
pub mod core;
pub mod heuristics;
pub mod logging;
pub mod mapping;

pub use crate::core::definition::{NodeDefinition, Operation, PipelineDefinition};
pub use crate::core::evaluate::{EngineConfig, Evaluation, evaluate};
pub use crate::core::graph::{ComputationGraph, GraphBuilder, GraphError, NodeKind};
pub use crate::core::matrix::{Confidence, ConfidenceMatrix};
pub use crate::core::model::{Endpoint, EndpointModel, ModelError, ModelPair};
pub use crate::core::propagate::StructuralRule;
pub use crate::core::types::{Axis, EndpointId, EndpointKind, NodeId, PreprocessingMethod, Side};
pub use crate::heuristics::PairwiseHeuristic;
pub use crate::mapping::generator::{
    PipelineConfig, TraceLinkGenerator, default_pipeline, generate_trace_links, generate_trace_links_with,
};
pub use crate::mapping::loader::LoadError;
pub use crate::mapping::trace_link::{TraceLink, TraceLinkSet};
