// the interpreter: one evaluation session per (graph, root, model pair) call
use std::collections::BTreeMap;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, trace, warn};

use crate::core::aggregate;
use crate::core::graph::{ComputationGraph, GraphError, NodeKind};
use crate::core::matrix::ConfidenceMatrix;
use crate::core::model::ModelPair;
use crate::core::types::{EndpointId, NodeId};
use crate::heuristics::PairwiseHeuristic;
use crate::mapping::trace_link::TraceLinkSet;

static EMPTY: ConfidenceMatrix = ConfidenceMatrix::new();

/// Engine settings. Nodes of the same DAG level never depend on each other,
/// so with `parallel` set they are evaluated concurrently on the rayon pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

/// Results of one evaluation call.
///
/// The cache lives here and nowhere else: it is created by [`evaluate`], filled
/// exactly once per reachable node and dropped with the session. The graph
/// itself is never written to, so one graph can back any number of concurrent
/// sessions over different model pairs.
#[derive(Debug)]
pub struct Evaluation<'g> {
    graph: &'g ComputationGraph,
    root: NodeId,
    results: Vec<Option<Arc<ConfidenceMatrix>>>,
}

/// Evaluates `root` bottom-up over `models`.
///
/// Fails only when `root` is not a node of `graph`; the DAG itself was
/// validated when it was built.
pub fn evaluate<'g>(
    graph: &'g ComputationGraph,
    root: NodeId,
    models: ModelPair<'_>,
    config: &EngineConfig,
) -> Result<Evaluation<'g>, GraphError> {
    let span = debug_span!("evaluate", root = %graph.display_name(root));
    let _guard = span.enter();

    let reachable = graph.reachable_from(root)?;
    let depth = graph.levels();
    let mut by_level: BTreeMap<usize, Vec<NodeId>> = BTreeMap::new();
    for id in &reachable {
        by_level.entry(depth[id.index()]).or_default().push(*id);
    }

    let mut results: Vec<Option<Arc<ConfidenceMatrix>>> = vec![None; graph.len()];
    for (level, ids) in &by_level {
        let computed: Vec<(NodeId, ConfidenceMatrix)> = if config.parallel && ids.len() > 1 {
            ids.par_iter()
                .map(|&id| Ok((id, evaluate_node(graph, id, &results, models)?)))
                .collect::<Result<_, GraphError>>()?
        } else {
            ids.iter()
                .map(|&id| Ok((id, evaluate_node(graph, id, &results, models)?)))
                .collect::<Result<_, GraphError>>()?
        };
        for (id, matrix) in computed {
            trace!(depth = *level, node = %graph.display_name(id), entries = matrix.len(), "node evaluated");
            results[id.index()] = Some(Arc::new(matrix));
        }
    }

    let evaluation = Evaluation { graph, root, results };
    debug!(
        nodes = reachable.len(),
        levels = by_level.len(),
        links = evaluation.root_result().len(),
        "evaluation finished"
    );
    Ok(evaluation)
}

fn input<'r>(results: &'r [Option<Arc<ConfidenceMatrix>>], id: NodeId) -> &'r ConfidenceMatrix {
    // children sit on lower levels, so they are always present here
    results
        .get(id.index())
        .and_then(|r| r.as_deref())
        .unwrap_or(&EMPTY)
}

fn evaluate_node(
    graph: &ComputationGraph,
    id: NodeId,
    results: &[Option<Arc<ConfidenceMatrix>>],
    models: ModelPair<'_>,
) -> Result<ConfidenceMatrix, GraphError> {
    let get = |child: NodeId| input(results, child);
    let matrix = match graph.node(id)? {
        NodeKind::Heuristic(h) => score_all(h.as_ref(), models),
        NodeKind::Structural { rule, child } => rule.apply(get(*child), models),
        NodeKind::Maximum { children } => aggregate::maximum(children.iter().map(|&c| get(c))),
        NodeKind::MatchBest { child, axis } => aggregate::match_best(get(*child), *axis),
        NodeKind::Filter { base, predicate } => aggregate::filter(get(*base), get(*predicate)),
        NodeKind::MatchSequentially { coarse, fine } => {
            aggregate::match_sequentially(get(*coarse), get(*fine), models.code)
        }
        NodeKind::Threshold { child, min } => aggregate::threshold(get(*child), *min),
    };
    Ok(matrix)
}

/// Runs a heuristic over the cross product of both models.
pub fn score_all(heuristic: &dyn PairwiseHeuristic, models: ModelPair<'_>) -> ConfidenceMatrix {
    let mut matrix = ConfidenceMatrix::new();
    for arch in models.architecture.endpoints() {
        for code in models.code.endpoints() {
            let Some(value) = heuristic.confidence(arch, code, models) else {
                continue;
            };
            if !value.is_finite() {
                warn!(
                    heuristic = %heuristic.name(),
                    arch = %arch.id,
                    code = %code.id,
                    "heuristic produced a non-finite confidence, pair dropped"
                );
                continue;
            }
            matrix.insert(arch.id.clone(), code.id.clone(), value);
        }
    }
    matrix
}

impl<'g> Evaluation<'g> {
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Result of a node, `None` when the node is not reachable from the root.
    pub fn result(&self, id: NodeId) -> Option<&ConfidenceMatrix> {
        self.results.get(id.index()).and_then(|r| r.as_deref())
    }

    /// Result of a labelled node.
    pub fn result_of(&self, label: &str) -> Option<&ConfidenceMatrix> {
        self.graph.find(label).and_then(|id| self.result(id))
    }

    pub fn root_result(&self) -> &ConfidenceMatrix {
        input(&self.results, self.root)
    }

    pub fn trace_links(&self) -> TraceLinkSet {
        TraceLinkSet::from_matrix(self.root_result())
    }

    /// How a pair's confidence came about, one line per node below the root:
    /// `Level 1: <root>, Confidence: 0.800`, then its children at level 2 and so on.
    /// Nodes shared by several parents are listed once, at their deepest level.
    pub fn explain(&self, arch: &EndpointId, code: &EndpointId) -> Vec<String> {
        let Ok(reachable) = self.graph.reachable_from(self.root) else {
            return Vec::new();
        };
        // parents sit above their children in the arena, so one descending
        // pass settles every node's deepest level
        let mut depth = vec![0usize; self.graph.len()];
        depth[self.root.index()] = 1;
        for &id in reachable.iter().rev() {
            if let Ok(kind) = self.graph.node(id) {
                let below = depth[id.index()] + 1;
                for child in kind.children() {
                    depth[child.index()] = depth[child.index()].max(below);
                }
            }
        }

        let mut visits: Vec<(usize, NodeId)> = reachable.into_iter().map(|id| (depth[id.index()], id)).collect();
        visits.sort_unstable();
        visits
            .into_iter()
            .map(|(level, id)| {
                let confidence = self
                    .result(id)
                    .and_then(|m| m.get(arch, code))
                    .map_or_else(|| "none".to_string(), |c| c.to_string());
                format!("Level {level}: {}, Confidence: {confidence}", self.graph.display_name(id))
            })
            .collect()
    }
}
