// component / interface name resemblance
use serde::{Deserialize, Serialize};

use crate::core::model::{Endpoint, ModelPair};
use crate::core::types::{EndpointKind, PreprocessingMethod};
use crate::heuristics::PairwiseHeuristic;
use crate::heuristics::names;

/// Which architecture endpoints a name resemblance node scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameConfig {
    /// Interfaces that declare signatures.
    Interface,
    /// Components and interfaces without signatures.
    Component,
    /// Like `Component`, restricted to units outside any package.
    ComponentWithoutPackage,
}

impl NameConfig {
    fn as_str(self) -> &'static str {
        match self {
            NameConfig::Interface => "interface",
            NameConfig::Component => "component",
            NameConfig::ComponentWithoutPackage => "component_without_package",
        }
    }
}

/// Scores a pair when the architecture name appears, on word boundaries, in
/// the unit's name or in one of its declared type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameResemblance {
    config: NameConfig,
    method: PreprocessingMethod,
}

impl NameResemblance {
    pub fn new(config: NameConfig, method: PreprocessingMethod) -> Self {
        Self { config, method }
    }

    fn applies_to(&self, arch: &Endpoint) -> bool {
        match arch.kind {
            EndpointKind::Component => self.config != NameConfig::Interface,
            EndpointKind::Interface => {
                (self.config == NameConfig::Interface) != arch.signatures.is_empty()
            }
            EndpointKind::CompilationUnit => false,
        }
    }

    fn single(&self, arch: &Endpoint, code: &Endpoint, code_name: &str) -> Option<f64> {
        if names::is_name_contained(&arch.name, code_name, self.method) {
            if self.config == NameConfig::Interface && code.is_interface {
                return Some(1.0);
            }
            return names::word_ratio(&arch.name, code_name);
        }
        if self.config != NameConfig::Interface {
            return None;
        }
        // IOrderService may be realised by a plain OrderService
        if names::is_interface_contained(&arch.name, code_name, self.method) {
            let stripped = names::strip_interface_prefix(&arch.name)?;
            return names::word_ratio(stripped, code_name);
        }
        None
    }
}

impl PairwiseHeuristic for NameResemblance {
    fn name(&self) -> String {
        format!("NameResemblance-{}-{}", self.config.as_str(), self.method)
    }

    fn confidence(&self, arch: &Endpoint, code: &Endpoint, _models: ModelPair<'_>) -> Option<f64> {
        if !self.applies_to(arch) {
            return None;
        }
        if self.config == NameConfig::ComponentWithoutPackage && code.has_parent() {
            return None;
        }
        code.names_and_declared_types()
            .filter_map(|name| self.single(arch, code, name))
            .reduce(f64::max)
    }
}
