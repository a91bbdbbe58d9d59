// declarative pipelines: labelled node records compiled into a ComputationGraph
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::graph::{ComputationGraph, GraphBuilder, GraphError};
use crate::core::propagate::StructuralRule;
use crate::core::types::{Axis, NodeId, PreprocessingMethod};
use crate::heuristics::{MethodResemblance, NameConfig, NameResemblance, PackageResemblance, PathResemblance};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    NameResemblance,
    PackageResemblance,
    PathResemblance,
    MethodResemblance,
    Structural,
    Maximum,
    MatchBest,
    Filter,
    MatchSequentially,
    Threshold,
}

/// One node of a pipeline document. Only the fields its operation reads are
/// required; references name other nodes by label and may point forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub label: String,
    pub op: Operation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coarse: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fine: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<NameConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preprocessing: Option<PreprocessingMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<StructuralRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
}

impl NodeDefinition {
    pub fn new(label: impl Into<String>, op: Operation) -> Self {
        Self {
            label: label.into(),
            op,
            child: None,
            children: Vec::new(),
            base: None,
            predicate: None,
            coarse: None,
            fine: None,
            axis: None,
            config: None,
            preprocessing: None,
            rule: None,
            min: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    pub root: String,
    pub nodes: Vec<NodeDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done(NodeId),
}

struct Compiler<'d> {
    defs: HashMap<&'d str, &'d NodeDefinition>,
    visits: HashMap<&'d str, Visit>,
    builder: GraphBuilder,
}

fn required<'d, T>(def: &'d NodeDefinition, value: &'d Option<T>, field: &'static str) -> Result<&'d T, GraphError> {
    value.as_ref().ok_or_else(|| GraphError::MissingField {
        label: def.label.clone(),
        field,
    })
}

impl<'d> Compiler<'d> {
    fn reference(&mut self, label: &str) -> Result<NodeId, GraphError> {
        let def = *self
            .defs
            .get(label)
            .ok_or_else(|| GraphError::UnknownLabel(label.to_string()))?;
        self.node(def)
    }

    fn node(&mut self, def: &'d NodeDefinition) -> Result<NodeId, GraphError> {
        match self.visits.get(def.label.as_str()) {
            Some(Visit::Done(id)) => return Ok(*id),
            Some(Visit::InProgress) => return Err(GraphError::Cycle(def.label.clone())),
            None => {}
        }
        self.visits.insert(&def.label, Visit::InProgress);

        let method = def.preprocessing.unwrap_or_default();
        let id = match def.op {
            Operation::NameResemblance => {
                let config = *required(def, &def.config, "config")?;
                self.builder.heuristic(NameResemblance::new(config, method))
            }
            Operation::PackageResemblance => self.builder.heuristic(PackageResemblance::new(method)),
            Operation::PathResemblance => self.builder.heuristic(PathResemblance),
            Operation::MethodResemblance => self.builder.heuristic(MethodResemblance),
            Operation::Structural => {
                let rule = *required(def, &def.rule, "rule")?;
                let child = self.reference(required(def, &def.child, "child")?)?;
                self.builder.structural(rule, child)?
            }
            Operation::Maximum => {
                let children = def
                    .children
                    .iter()
                    .map(|c| self.reference(c))
                    .collect::<Result<Vec<_>, _>>()?;
                self.builder.maximum(children)?
            }
            Operation::MatchBest => {
                let axis = *required(def, &def.axis, "axis")?;
                let child = self.reference(required(def, &def.child, "child")?)?;
                self.builder.match_best(child, axis)?
            }
            Operation::Filter => {
                let base = self.reference(required(def, &def.base, "base")?)?;
                // a filter names exactly one of: a predicate node, or a rule applied to its base
                match (&def.predicate, def.rule) {
                    (Some(_), Some(_)) => {
                        return Err(GraphError::ConflictingFields {
                            label: def.label.clone(),
                            first: "predicate",
                            second: "rule",
                        });
                    }
                    (Some(predicate), None) => {
                        let predicate = self.reference(predicate)?;
                        self.builder.filter(base, predicate)?
                    }
                    (None, Some(rule)) => self.builder.filter_by(base, rule)?,
                    (None, None) => {
                        return Err(GraphError::MissingField {
                            label: def.label.clone(),
                            field: "predicate",
                        });
                    }
                }
            }
            Operation::MatchSequentially => {
                let coarse = self.reference(required(def, &def.coarse, "coarse")?)?;
                let fine = self.reference(required(def, &def.fine, "fine")?)?;
                self.builder.match_sequentially(coarse, fine)?
            }
            Operation::Threshold => {
                let min = *required(def, &def.min, "min")?;
                let child = self.reference(required(def, &def.child, "child")?)?;
                self.builder.threshold(child, min)?
            }
        };

        self.builder.label(id, def.label.clone())?;
        self.visits.insert(&def.label, Visit::Done(id));
        Ok(id)
    }
}

impl PipelineDefinition {
    /// Builds the graph, children before parents whatever the document order.
    ///
    /// Fails on duplicate or dangling labels, missing fields and cycles.
    pub fn compile(&self) -> Result<(ComputationGraph, NodeId), GraphError> {
        let mut defs = HashMap::with_capacity(self.nodes.len());
        for def in &self.nodes {
            if defs.insert(def.label.as_str(), def).is_some() {
                return Err(GraphError::DuplicateLabel(def.label.clone()));
            }
        }
        let mut compiler = Compiler {
            defs,
            visits: HashMap::new(),
            builder: GraphBuilder::new(),
        };

        let root = compiler.reference(&self.root)?;
        for def in &self.nodes {
            compiler.node(def)?;
        }
        let graph = compiler.builder.build();
        debug!(nodes = graph.len(), root = %self.root, "pipeline compiled");
        Ok((graph, root))
    }
}
