// interface operations vs. declared methods
use crate::core::model::{Endpoint, ModelPair};
use crate::core::types::{EndpointKind, PreprocessingMethod};
use crate::heuristics::PairwiseHeuristic;
use crate::heuristics::names;

/// Scores interfaces by the share of their operations a unit declares.
///
/// Interfaces without signatures fall back to looking for their name among
/// the unit's method names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MethodResemblance;

// `placeOrder(Order o): void` -> `placeorder`
fn operation_name(signature: &str) -> String {
    let head = signature.split(['(', ':']).next().unwrap_or(signature);
    names::preprocess(head.trim())
}

impl PairwiseHeuristic for MethodResemblance {
    fn name(&self) -> String {
        "MethodResemblance".to_string()
    }

    fn confidence(&self, arch: &Endpoint, code: &Endpoint, _models: ModelPair<'_>) -> Option<f64> {
        if arch.kind != EndpointKind::Interface || code.methods.is_empty() {
            return None;
        }
        if arch.signatures.is_empty() {
            let ratio = names::contained_ratio(&arch.name, &code.methods, PreprocessingMethod::None);
            return (ratio > 0.0).then_some(ratio);
        }
        let declared: Vec<String> = code.methods.iter().map(|m| names::preprocess(m)).collect();
        let operations: Vec<String> = arch
            .signatures
            .iter()
            .map(|s| operation_name(s))
            .filter(|s| !s.is_empty())
            .collect();
        if operations.is_empty() {
            return None;
        }
        let found = operations.iter().filter(|op| declared.contains(op)).count();
        (found > 0).then(|| found as f64 / operations.len() as f64)
    }
}
