// the statically assembled computation DAG: an arena of node definitions
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::core::matrix::Confidence;
use crate::core::propagate::StructuralRule;
use crate::core::types::{Axis, NodeId};
use crate::heuristics::PairwiseHeuristic;

#[derive(Debug, Error, PartialEq)]
pub enum GraphError {
    #[error("node {0} does not exist in this graph")]
    UnknownNode(NodeId),
    #[error("{kind} needs at least {min} children, got {found}")]
    TooFewChildren {
        kind: &'static str,
        min: usize,
        found: usize,
    },
    #[error("threshold {0} is outside (0, 1]")]
    InvalidThreshold(f64),
    #[error("label {0:?} is already used")]
    DuplicateLabel(String),
    #[error("no node is labelled {0:?}")]
    UnknownLabel(String),
    #[error("node {label:?} is missing field {field:?}")]
    MissingField { label: String, field: &'static str },
    #[error("node {label:?} sets both {first:?} and {second:?}")]
    ConflictingFields {
        label: String,
        first: &'static str,
        second: &'static str,
    },
    #[error("node {0:?} is part of a cycle")]
    Cycle(String),
}

/// What a node computes. Children are always nodes added earlier, so the
/// arena order is a topological order of the DAG.
#[derive(Clone)]
pub enum NodeKind {
    Heuristic(Arc<dyn PairwiseHeuristic>),
    Structural { rule: StructuralRule, child: NodeId },
    Maximum { children: Vec<NodeId> },
    MatchBest { child: NodeId, axis: Axis },
    Filter { base: NodeId, predicate: NodeId },
    MatchSequentially { coarse: NodeId, fine: NodeId },
    Threshold { child: NodeId, min: Confidence },
}

impl NodeKind {
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            NodeKind::Heuristic(_) => Vec::new(),
            NodeKind::Structural { child, .. }
            | NodeKind::MatchBest { child, .. }
            | NodeKind::Threshold { child, .. } => vec![*child],
            NodeKind::Maximum { children } => children.clone(),
            NodeKind::Filter { base, predicate } => vec![*base, *predicate],
            NodeKind::MatchSequentially { coarse, fine } => vec![*coarse, *fine],
        }
    }

    /// Human readable name of the node's function.
    pub fn describe(&self) -> String {
        match self {
            NodeKind::Heuristic(h) => h.name(),
            NodeKind::Structural { rule, .. } => rule.to_string(),
            NodeKind::Maximum { .. } => "Maximum".to_string(),
            NodeKind::MatchBest { axis, .. } => format!("MatchBest-{axis:?}"),
            NodeKind::Filter { .. } => "Filter".to_string(),
            NodeKind::MatchSequentially { .. } => "MatchSequentially".to_string(),
            NodeKind::Threshold { min, .. } => format!("Threshold-{min}"),
        }
    }
}

impl fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::Heuristic(h) => f.debug_tuple("Heuristic").field(&h.name()).finish(),
            other => f
                .debug_struct("NodeKind")
                .field("function", &other.describe())
                .field("children", &other.children())
                .finish(),
        }
    }
}

/// Immutable DAG description. Holds no evaluation state, so one instance can
/// be shared by any number of concurrent evaluations over different models.
#[derive(Debug, Clone, Default)]
pub struct ComputationGraph {
    nodes: Vec<NodeKind>,
    labels: Vec<Option<String>>,
    by_label: HashMap<String, NodeId>,
}

impl ComputationGraph {
    pub fn builder() -> GraphBuilder {
        GraphBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Result<&NodeKind, GraphError> {
        self.nodes.get(id.index()).ok_or(GraphError::UnknownNode(id))
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.labels.get(id.index()).and_then(|l| l.as_deref())
    }

    pub fn find(&self, label: &str) -> Option<NodeId> {
        self.by_label.get(label).copied()
    }

    /// Label if one was registered, otherwise the node's function name.
    pub fn display_name(&self, id: NodeId) -> String {
        match (self.label(id), self.nodes.get(id.index())) {
            (Some(label), _) => label.to_string(),
            (None, Some(kind)) => kind.describe(),
            (None, None) => id.to_string(),
        }
    }

    /// Labelled nodes in insertion order.
    pub fn labels(&self) -> impl Iterator<Item = (NodeId, &str)> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.as_deref().map(|l| (NodeId(i as u32), l)))
    }

    /// Nodes the root depends on (root included), in ascending arena order,
    /// i.e. children before parents.
    pub fn reachable_from(&self, root: NodeId) -> Result<Vec<NodeId>, GraphError> {
        self.node(root)?;
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if std::mem::replace(&mut seen[id.index()], true) {
                continue;
            }
            stack.extend(self.nodes[id.index()].children());
        }
        Ok(seen
            .iter()
            .enumerate()
            .filter(|(_, s)| **s)
            .map(|(i, _)| NodeId(i as u32))
            .collect())
    }

    /// Depth of every node (heuristics are 0, a parent is one above its deepest child).
    pub(crate) fn levels(&self) -> Vec<usize> {
        let mut levels = vec![0usize; self.nodes.len()];
        for (i, kind) in self.nodes.iter().enumerate() {
            levels[i] = kind
                .children()
                .iter()
                .map(|c| levels[c.index()] + 1)
                .max()
                .unwrap_or(0);
        }
        levels
    }
}

/// Assembles a `ComputationGraph`. Every constructor validates that the
/// referenced children already exist, which rules out cycles.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: ComputationGraph,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self, id: NodeId) -> Result<NodeId, GraphError> {
        if id.index() < self.graph.nodes.len() {
            Ok(id)
        } else {
            Err(GraphError::UnknownNode(id))
        }
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.graph.nodes.len() as u32);
        self.graph.nodes.push(kind);
        self.graph.labels.push(None);
        id
    }

    pub fn heuristic(&mut self, heuristic: impl PairwiseHeuristic + 'static) -> NodeId {
        self.push(NodeKind::Heuristic(Arc::new(heuristic)))
    }

    pub fn shared_heuristic(&mut self, heuristic: Arc<dyn PairwiseHeuristic>) -> NodeId {
        self.push(NodeKind::Heuristic(heuristic))
    }

    pub fn structural(&mut self, rule: StructuralRule, child: NodeId) -> Result<NodeId, GraphError> {
        let child = self.check(child)?;
        Ok(self.push(NodeKind::Structural { rule, child }))
    }

    pub fn maximum(&mut self, children: impl IntoIterator<Item = NodeId>) -> Result<NodeId, GraphError> {
        let children: Vec<NodeId> = children.into_iter().collect();
        if children.len() < 2 {
            return Err(GraphError::TooFewChildren {
                kind: "Maximum",
                min: 2,
                found: children.len(),
            });
        }
        for &c in &children {
            self.check(c)?;
        }
        Ok(self.push(NodeKind::Maximum { children }))
    }

    pub fn match_best(&mut self, child: NodeId, axis: Axis) -> Result<NodeId, GraphError> {
        let child = self.check(child)?;
        Ok(self.push(NodeKind::MatchBest { child, axis }))
    }

    pub fn filter(&mut self, base: NodeId, predicate: NodeId) -> Result<NodeId, GraphError> {
        let base = self.check(base)?;
        let predicate = self.check(predicate)?;
        Ok(self.push(NodeKind::Filter { base, predicate }))
    }

    /// Filters `child` by the eligibility predicate `rule(child)`.
    pub fn filter_by(&mut self, child: NodeId, rule: StructuralRule) -> Result<NodeId, GraphError> {
        let predicate = self.structural(rule, child)?;
        self.filter(child, predicate)
    }

    pub fn match_sequentially(&mut self, coarse: NodeId, fine: NodeId) -> Result<NodeId, GraphError> {
        let coarse = self.check(coarse)?;
        let fine = self.check(fine)?;
        Ok(self.push(NodeKind::MatchSequentially { coarse, fine }))
    }

    pub fn threshold(&mut self, child: NodeId, min: f64) -> Result<NodeId, GraphError> {
        let child = self.check(child)?;
        let min = Confidence::new(min)
            .filter(|c| c.value() == min)
            .ok_or(GraphError::InvalidThreshold(min))?;
        Ok(self.push(NodeKind::Threshold { child, min }))
    }

    /// Registers a diagnostic label for a node.
    pub fn label(&mut self, id: NodeId, label: impl Into<String>) -> Result<NodeId, GraphError> {
        let id = self.check(id)?;
        let label = label.into();
        if self.graph.by_label.contains_key(&label) {
            return Err(GraphError::DuplicateLabel(label));
        }
        self.graph.by_label.insert(label.clone(), id);
        self.graph.labels[id.index()] = Some(label);
        Ok(id)
    }

    pub fn build(self) -> ComputationGraph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::PreprocessingMethod;
    use crate::heuristics::{NameConfig, NameResemblance, PackageResemblance};

    #[test]
    fn builder_rejects_unknown_children_and_bad_arity() {
        let mut b = GraphBuilder::new();
        let name = b.heuristic(NameResemblance::new(NameConfig::Component, PreprocessingMethod::None));

        let err = b.match_best(NodeId(7), Axis::Code).unwrap_err();
        assert_eq!(err, GraphError::UnknownNode(NodeId(7)));

        let err = b.maximum([name]).unwrap_err();
        assert!(matches!(err, GraphError::TooFewChildren { found: 1, .. }));

        let err = b.threshold(name, 0.0).unwrap_err();
        assert_eq!(err, GraphError::InvalidThreshold(0.0));
        assert!(b.threshold(name, 1.5).is_err());
    }

    #[test]
    fn labels_are_unique_and_resolvable() {
        let mut b = GraphBuilder::new();
        let name = b.heuristic(NameResemblance::new(NameConfig::Component, PreprocessingMethod::None));
        let pkg = b.heuristic(PackageResemblance::new(PreprocessingMethod::Stemming));
        let max = b.maximum([name, pkg]).unwrap();

        b.label(name, "compName").unwrap();
        b.label(max, "combined").unwrap();
        assert_eq!(
            b.label(pkg, "compName").unwrap_err(),
            GraphError::DuplicateLabel("compName".into())
        );

        let g = b.build();
        assert_eq!(g.find("combined"), Some(max));
        assert_eq!(g.display_name(pkg), "PackageResemblance-stemming");
        let labels: Vec<&str> = g.labels().map(|(_, l)| l).collect();
        assert_eq!(labels, vec!["compName", "combined"]);
    }

    #[test]
    fn reachability_and_levels_follow_arena_order() {
        let mut b = GraphBuilder::new();
        let a = b.heuristic(NameResemblance::new(NameConfig::Component, PreprocessingMethod::None));
        let unrelated = b.heuristic(PackageResemblance::new(PreprocessingMethod::None));
        let best = b.match_best(a, Axis::Both).unwrap();
        let root = b.filter_by(best, StructuralRule::Required).unwrap();
        let g = b.build();

        let reach = g.reachable_from(root).unwrap();
        assert!(!reach.contains(&unrelated));
        assert_eq!(reach.first(), Some(&a));
        assert_eq!(reach.last(), Some(&root));

        let levels = g.levels();
        assert_eq!(levels[a.index()], 0);
        assert_eq!(levels[best.index()], 1);
        assert_eq!(levels[root.index()], 3);

        assert_eq!(g.display_name(best), "MatchBest-Both");
        assert_eq!(g.display_name(root), "Filter");
    }
}
