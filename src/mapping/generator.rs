/*
Inputs:

    architecture model (components, interfaces)

    code model (compilation units + containment)

    a computation graph and its root (defaults to the pipeline below)

Outputs:

    TraceLinkSet: (architecture endpoint, code endpoint, confidence)

Responsibilities:

    Short-circuit empty models

    Evaluate the graph once per call, with a fresh cache

    Produce stable, reproducible results
*/
// trace link generation + the default pipeline
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core::evaluate::{EngineConfig, Evaluation, evaluate};
use crate::core::graph::{ComputationGraph, GraphError};
use crate::core::model::{EndpointModel, ModelPair};
use crate::core::propagate::StructuralRule;
use crate::core::types::{Axis, NodeId, PreprocessingMethod};
use crate::heuristics::{MethodResemblance, NameConfig, NameResemblance, PackageResemblance, PathResemblance};
use crate::mapping::trace_link::TraceLinkSet;

/// Parameters of the default pipeline, fixed when the graph is assembled.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Preprocessing used by the interface and component name heuristics.
    pub preprocessing: PreprocessingMethod,
    /// When set, a final threshold stage drops links below this confidence.
    pub min_confidence: Option<f64>,
    pub engine: EngineConfig,
}

pub fn generate_trace_links(
    graph: &ComputationGraph,
    root: NodeId,
    architecture: &EndpointModel,
    code: &EndpointModel,
) -> Result<TraceLinkSet, GraphError> {
    generate_trace_links_with(graph, root, architecture, code, &EngineConfig::default())
}

/// Evaluates `root` over the two models and materializes its result.
/// An empty model on either side yields an empty set, not an error.
pub fn generate_trace_links_with(
    graph: &ComputationGraph,
    root: NodeId,
    architecture: &EndpointModel,
    code: &EndpointModel,
    config: &EngineConfig,
) -> Result<TraceLinkSet, GraphError> {
    graph.node(root)?;
    let models = ModelPair::new(architecture, code);
    if models.is_empty() {
        debug!(
            architecture = architecture.len(),
            code = code.len(),
            "empty model, no trace links"
        );
        return Ok(TraceLinkSet::new());
    }
    let links = evaluate(graph, root, models, config)?.trace_links();
    info!(links = links.len(), root = %graph.display_name(root), "trace links generated");
    Ok(links)
}

/// Assembles the default architecture-to-code pipeline and returns its root.
///
/// Interfaces are matched by name and by declared methods. Components combine
/// package resemblance (narrowing the candidates of the name match), inherited
/// name links, units outside any package, the common-words fallback and path
/// resemblance. Component links are gated by `Required`, and the combination
/// by `ProvidedInterfaceCorrespondence`.
pub fn default_pipeline(config: &PipelineConfig) -> Result<(ComputationGraph, NodeId), GraphError> {
    let mut b = ComputationGraph::builder();
    let method = config.preprocessing;

    let interface_name = b.heuristic(NameResemblance::new(NameConfig::Interface, method));
    b.label(interface_name, "interfaceName")?;
    let interface_method = b.heuristic(MethodResemblance);
    b.label(interface_method, "interfaceMethod")?;
    let interface_max = b.maximum([interface_name, interface_method])?;
    let interface_best = b.match_best(interface_max, Axis::Both)?;
    b.label(interface_best, "interfaceBest")?;

    let package = b.heuristic(PackageResemblance::new(PreprocessingMethod::Stemming));
    b.label(package, "packageStemming")?;
    let package_best = b.match_best(package, Axis::Both)?;
    b.label(package_best, "packageBest")?;
    let package_filtered = b.filter_by(package_best, StructuralRule::SubpackageFilter)?;
    b.label(package_filtered, "subpackageRemoval")?;

    let comp_name = b.heuristic(NameResemblance::new(NameConfig::Component, method));
    b.label(comp_name, "compName")?;
    let comp_name_best = b.match_best(comp_name, Axis::Code)?;
    b.label(comp_name_best, "compNameBest")?;
    let inherited = b.structural(StructuralRule::InheritLinks, comp_name_best)?;
    let comp_name_inherited = b.maximum([inherited, comp_name_best])?;
    b.label(comp_name_inherited, "hintInheritance")?;

    let sequential = b.match_sequentially(package_filtered, comp_name_inherited)?;
    let without_package = b.heuristic(NameResemblance::new(
        NameConfig::ComponentWithoutPackage,
        PreprocessingMethod::None,
    ));
    let comp_combined = b.maximum([sequential, without_package])?;
    b.label(comp_combined, "packageAndName")?;

    let stripped = b.structural(StructuralRule::CommonWords, comp_combined)?;
    let common_words = b.maximum([stripped, comp_combined])?;
    b.label(common_words, "commonWords")?;
    let comp_filtered = b.filter_by(common_words, StructuralRule::Required)?;
    b.label(comp_filtered, "compLinks")?;

    let path = b.heuristic(PathResemblance);
    b.label(path, "path")?;
    let path_best = b.match_best(path, Axis::Both)?;
    b.label(path_best, "pathBest")?;
    let combination = b.maximum([path_best, comp_filtered, interface_best])?;
    b.label(combination, "combination")?;

    let mut root = b.filter_by(combination, StructuralRule::ProvidedInterfaceCorrespondence)?;
    b.label(root, "interfaceProvision")?;
    if let Some(min) = config.min_confidence {
        root = b.threshold(root, min)?;
        b.label(root, "threshold")?;
    }

    Ok((b.build(), root))
}

/// A graph assembled once and reused for any number of model pairs.
#[derive(Debug, Clone)]
pub struct TraceLinkGenerator {
    graph: ComputationGraph,
    root: NodeId,
    engine: EngineConfig,
}

impl TraceLinkGenerator {
    pub fn new(graph: ComputationGraph, root: NodeId, engine: EngineConfig) -> Result<Self, GraphError> {
        graph.node(root)?;
        Ok(Self { graph, root, engine })
    }

    pub fn with_default_pipeline(config: &PipelineConfig) -> Result<Self, GraphError> {
        let (graph, root) = default_pipeline(config)?;
        Self::new(graph, root, config.engine)
    }

    pub fn graph(&self) -> &ComputationGraph {
        &self.graph
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn generate(&self, architecture: &EndpointModel, code: &EndpointModel) -> Result<TraceLinkSet, GraphError> {
        generate_trace_links_with(&self.graph, self.root, architecture, code, &self.engine)
    }

    /// Full evaluation, for inspecting intermediate results and explanations.
    pub fn evaluate<'g>(&'g self, architecture: &EndpointModel, code: &EndpointModel) -> Result<Evaluation<'g>, GraphError> {
        evaluate(&self.graph, self.root, ModelPair::new(architecture, code), &self.engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Endpoint;
    use crate::core::types::Side;

    fn shop() -> (EndpointModel, EndpointModel) {
        let arch = EndpointModel::architecture(vec![
            Endpoint::component("c-order", "Order"),
            Endpoint::component("c-payment", "Payment"),
        ])
        .unwrap();
        let code = EndpointModel::code(vec![
            Endpoint::compilation_unit("order.OrderService", "OrderService", ["com", "shop", "order"]),
            Endpoint::compilation_unit("order.OrderRepository", "OrderRepository", ["com", "shop", "order"]),
            Endpoint::compilation_unit("payment.PaymentGateway", "PaymentGateway", ["com", "shop", "payment"]),
            Endpoint::compilation_unit("util.Strings", "Strings", ["com", "shop", "util"]),
        ])
        .unwrap();
        (arch, code)
    }

    #[test]
    fn default_pipeline_registers_every_stage_label() {
        let (graph, root) = default_pipeline(&PipelineConfig::default()).unwrap();
        let labels: Vec<&str> = graph.labels().map(|(_, l)| l).collect();
        assert_eq!(
            labels,
            vec![
                "interfaceName",
                "interfaceMethod",
                "interfaceBest",
                "packageStemming",
                "packageBest",
                "subpackageRemoval",
                "compName",
                "compNameBest",
                "hintInheritance",
                "packageAndName",
                "commonWords",
                "compLinks",
                "path",
                "pathBest",
                "combination",
                "interfaceProvision",
            ]
        );
        assert_eq!(graph.find("interfaceProvision"), Some(root));

        let (graph, root) = default_pipeline(&PipelineConfig {
            min_confidence: Some(0.7),
            ..PipelineConfig::default()
        })
        .unwrap();
        assert_eq!(graph.label(root), Some("threshold"));
        assert!(default_pipeline(&PipelineConfig { min_confidence: Some(0.0), ..Default::default() }).is_err());
    }

    #[test]
    fn default_pipeline_links_components_to_their_packages() {
        let (arch, code) = shop();
        let generator = TraceLinkGenerator::with_default_pipeline(&PipelineConfig::default()).unwrap();
        let links = generator.generate(&arch, &code).unwrap();

        assert!(links.contains(&"c-order".into(), &"order.OrderService".into()));
        assert!(links.contains(&"c-order".into(), &"order.OrderRepository".into()));
        assert!(links.contains(&"c-payment".into(), &"payment.PaymentGateway".into()));
        assert!(!links.contains(&"c-order".into(), &"util.Strings".into()));
        assert!(!links.contains(&"c-payment".into(), &"util.Strings".into()));

        let eval = generator.evaluate(&arch, &code).unwrap();
        let package = eval.result_of("packageBest").unwrap();
        assert!(package.has_links(Side::Architecture, &"c-order".into()));
    }

    #[test]
    fn empty_models_short_circuit_but_unknown_roots_fail() {
        let (arch, code) = shop();
        let (graph, root) = default_pipeline(&PipelineConfig::default()).unwrap();
        let no_arch = EndpointModel::empty(Side::Architecture);
        let no_code = EndpointModel::empty(Side::Code);

        assert!(generate_trace_links(&graph, root, &no_arch, &code).unwrap().is_empty());
        assert!(generate_trace_links(&graph, root, &arch, &no_code).unwrap().is_empty());
        assert_eq!(
            generate_trace_links(&graph, NodeId(10_000), &arch, &code).unwrap_err(),
            GraphError::UnknownNode(NodeId(10_000))
        );
    }
}
