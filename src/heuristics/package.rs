// containment-based heuristics: package names and source paths
use crate::core::model::{Endpoint, ModelPair};
use crate::core::types::{EndpointKind, PreprocessingMethod};
use crate::heuristics::PairwiseHeuristic;
use crate::heuristics::names;

/// Compares a component's name with the unit's ancestor package names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageResemblance {
    method: PreprocessingMethod,
}

impl PackageResemblance {
    pub fn new(method: PreprocessingMethod) -> Self {
        Self { method }
    }
}

impl PairwiseHeuristic for PackageResemblance {
    fn name(&self) -> String {
        format!("PackageResemblance-{}", self.method)
    }

    fn confidence(&self, arch: &Endpoint, code: &Endpoint, _models: ModelPair<'_>) -> Option<f64> {
        if arch.kind != EndpointKind::Component || !code.has_parent() {
            return None;
        }
        let ratio = names::contained_ratio(&arch.name, &code.containment, self.method);
        (ratio > 0.0).then_some(ratio)
    }
}

/// Scores a component against a unit's directory path: the share of the
/// component name's tokens found as one run among the directories.
/// `order-service/src/...` gives 1.0 for `OrderService`, `order/src/...` 0.5.
///
/// Without a recorded path the containment chain stands in for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PathResemblance;

impl PathResemblance {
    fn directories(code: &Endpoint) -> Vec<String> {
        match &code.path {
            Some(path) => {
                let mut parts: Vec<String> = path
                    .split(['/', '\\'])
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect();
                // the last segment is the file itself
                parts.pop();
                parts
            }
            None => code.containment.clone(),
        }
    }
}

impl PairwiseHeuristic for PathResemblance {
    fn name(&self) -> String {
        "PathResemblance".to_string()
    }

    fn confidence(&self, arch: &Endpoint, code: &Endpoint, _models: ModelPair<'_>) -> Option<f64> {
        if arch.kind != EndpointKind::Component {
            return None;
        }
        let dirs = Self::directories(code);
        if dirs.is_empty() {
            return None;
        }
        let ratio = names::contained_ratio(&arch.name, &dirs, PreprocessingMethod::None);
        (ratio > 0.0).then_some(ratio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::EndpointModel;

    fn score(h: &dyn PairwiseHeuristic, arch: &Endpoint, code: &Endpoint) -> Option<f64> {
        let a = EndpointModel::architecture(vec![arch.clone()]).unwrap();
        let c = EndpointModel::code(vec![code.clone()]).unwrap();
        h.confidence(arch, code, ModelPair::new(&a, &c))
    }

    #[test]
    fn package_resemblance_uses_stemming_for_plurals() {
        let arch = Endpoint::component("c1", "Order");
        let unit = Endpoint::compilation_unit("u1", "Checkout", ["com", "shop", "orders"]);

        assert_eq!(score(&PackageResemblance::new(PreprocessingMethod::None), &arch, &unit), None);
        assert_eq!(
            score(&PackageResemblance::new(PreprocessingMethod::Stemming), &arch, &unit),
            Some(1.0)
        );

        let rootless = Endpoint::compilation_unit("u2", "Order", Vec::<String>::new());
        assert_eq!(score(&PackageResemblance::new(PreprocessingMethod::None), &arch, &rootless), None);
    }

    #[test]
    fn path_resemblance_scores_the_matched_share() {
        let arch = Endpoint::component("c1", "OrderService");
        let in_module = Endpoint::compilation_unit("u1", "Checkout", ["com", "shop"])
            .with_path("order-service/src/main/java/com/shop/Checkout.java");
        let half_path =
            Endpoint::compilation_unit("u2", "Checkout", ["com", "shop"]).with_path("order/src/Checkout.java");
        let half_chain = Endpoint::compilation_unit("u3", "Checkout", ["com", "shop", "order"]);
        let elsewhere =
            Endpoint::compilation_unit("u4", "Invoice", ["com", "shop"]).with_path("billing/src/Invoice.java");
        let iface = Endpoint::interface("i1", "OrderService");

        assert_eq!(score(&PathResemblance, &arch, &in_module), Some(1.0));
        assert_eq!(score(&PathResemblance, &arch, &half_path), Some(0.5));
        assert_eq!(score(&PathResemblance, &arch, &half_chain), Some(0.5));
        assert_eq!(score(&PathResemblance, &arch, &elsewhere), None);
        assert_eq!(score(&PathResemblance, &iface, &in_module), None);
    }
}
