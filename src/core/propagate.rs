// structural rules: matrices derived from a child result and the model relations
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::matrix::{Confidence, ConfidenceMatrix};
use crate::core::model::{Endpoint, EndpointModel, ModelPair};
use crate::core::types::{EndpointId, EndpointKind, PreprocessingMethod, Side};
use crate::heuristics::names;

/// Structural rules derive a matrix from one child's result instead of
/// comparing names.
///
/// `InheritLinks` and `CommonWords` produce new evidence. The others are
/// eligibility predicates meant to be the `predicate` of a `Filter`: their
/// output holds exactly the child's pairs that stay eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralRule {
    InheritLinks,
    Required,
    ProvidedInterfaceCorrespondence,
    SubpackageFilter,
    CommonWords,
}

impl fmt::Display for StructuralRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StructuralRule::InheritLinks => "InheritLinks",
            StructuralRule::Required => "Required",
            StructuralRule::ProvidedInterfaceCorrespondence => "ProvidedInterfaceCorrespondence",
            StructuralRule::SubpackageFilter => "SubpackageFilter",
            StructuralRule::CommonWords => "CommonWords",
        };
        f.write_str(s)
    }
}

impl StructuralRule {
    pub fn apply(self, child: &ConfidenceMatrix, models: ModelPair<'_>) -> ConfidenceMatrix {
        match self {
            StructuralRule::InheritLinks => inherit_links(child, models.code),
            StructuralRule::Required => required(child, models.architecture),
            StructuralRule::ProvidedInterfaceCorrespondence => provided_interface_correspondence(child, models),
            StructuralRule::SubpackageFilter => subpackage_filter(child, models),
            StructuralRule::CommonWords => common_words(child, models),
        }
    }
}

/// Package a pair is attributed to: the deepest package that contributes to
/// the name match, otherwise the unit's own package.
pub(crate) fn claimed_package(arch: &Endpoint, code: &Endpoint) -> Option<Vec<String>> {
    match names::matched_packages(&arch.name, &code.containment).last() {
        Some(&depth) => Some(code.containment[..depth].to_vec()),
        None if code.has_parent() => Some(code.containment.clone()),
        None => None,
    }
}

// a unit inherits the links of every type it (transitively) extends or implements
fn inherit_links(child: &ConfidenceMatrix, code: &EndpointModel) -> ConfidenceMatrix {
    let mut out = ConfidenceMatrix::new();
    for unit in code.endpoints() {
        for parent in code.supertypes_transitive(&unit.id) {
            for (arch, conf) in child.entries_of(Side::Code, &parent) {
                out.insert_max(arch.clone(), unit.id.clone(), conf);
            }
        }
    }
    out
}

// (a, c) stays eligible unless c is also linked to a component providing an
// interface that a requires: that unit is the provider's code, not a's
fn required(child: &ConfidenceMatrix, arch_model: &EndpointModel) -> ConfidenceMatrix {
    let mut providers: BTreeMap<&EndpointId, Vec<&EndpointId>> = BTreeMap::new();
    for component in arch_model.of_kind(EndpointKind::Component) {
        for iface in &component.provided {
            providers.entry(iface).or_default().push(&component.id);
        }
    }

    let mut out = ConfidenceMatrix::new();
    for (a, c, conf) in child.iter() {
        let requires: &[EndpointId] = arch_model.get(a).map(|e| e.required.as_slice()).unwrap_or(&[]);
        let claimed_by_provider = requires
            .iter()
            .filter_map(|iface| providers.get(iface))
            .flatten()
            .any(|&b| b != a && child.contains(b, c));
        if !claimed_by_provider {
            out.insert_confidence(a.clone(), c.clone(), conf);
        }
    }
    out
}

fn realises(code: &EndpointModel, package: &[String], interface_links: &BTreeSet<EndpointId>) -> bool {
    code.units_in_package(package).any(|unit| {
        interface_links.contains(&unit.id)
            || code
                .supertypes_transitive(&unit.id)
                .iter()
                .any(|s| interface_links.contains(s))
    })
}

// (a, c) becomes ineligible when a's provided interfaces are realised inside
// the packages of a's other links but not inside c's own package
fn provided_interface_correspondence(child: &ConfidenceMatrix, models: ModelPair<'_>) -> ConfidenceMatrix {
    let mut out = ConfidenceMatrix::new();
    for (a, c, conf) in child.iter() {
        let keep = match (models.architecture.get(a), models.code.get(c)) {
            (Some(arch), Some(unit)) if arch.kind == EndpointKind::Component && unit.has_parent() => {
                let interface_links: BTreeSet<EndpointId> = arch
                    .provided
                    .iter()
                    .flat_map(|iface| child.linked(Side::Architecture, iface))
                    .collect();
                if interface_links.is_empty() {
                    true
                } else if claimed_package(arch, unit)
                    .is_some_and(|pkg| realises(models.code, &pkg, &interface_links))
                {
                    true
                } else {
                    !child
                        .linked(Side::Architecture, a)
                        .iter()
                        .filter_map(|other| models.code.get(other))
                        .filter_map(|other| claimed_package(arch, other))
                        .any(|pkg| realises(models.code, &pkg, &interface_links))
                }
            }
            _ => true,
        };
        if keep {
            out.insert_confidence(a.clone(), c.clone(), conf);
        }
    }
    out
}

// (a, c) becomes ineligible when another architecture endpoint claims a
// strictly deeper package that still contains c
fn subpackage_filter(child: &ConfidenceMatrix, models: ModelPair<'_>) -> ConfidenceMatrix {
    let claim = |a: &EndpointId, c: &EndpointId| -> Option<Vec<String>> {
        claimed_package(models.architecture.get(a)?, models.code.get(c)?)
    };
    let claims: BTreeSet<(EndpointId, Vec<String>)> = child
        .iter()
        .filter_map(|(a, c, _)| claim(a, c).map(|pkg| (a.clone(), pkg)))
        .collect();

    let mut out = ConfidenceMatrix::new();
    for (a, c, conf) in child.iter() {
        let containment = models.code.ancestors(c);
        let own = claim(a, c).unwrap_or_default();
        let overridden = claims.iter().any(|(b, pkg)| {
            b != a && pkg.len() > own.len() && pkg.starts_with(&own) && containment.starts_with(pkg)
        });
        if !overridden {
            out.insert_confidence(a.clone(), c.clone(), conf);
        }
    }
    out
}

// components the child found nothing for get a second chance with the words
// they share with other component names stripped ("OrderService" -> "Order")
fn common_words(child: &ConfidenceMatrix, models: ModelPair<'_>) -> ConfidenceMatrix {
    let components: Vec<&Endpoint> = models.architecture.of_kind(EndpointKind::Component).collect();
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for component in &components {
        let distinct: BTreeSet<String> = names::tokens(&component.name).into_iter().collect();
        for word in distinct {
            *seen.entry(word).or_default() += 1;
        }
    }
    let common: BTreeSet<String> = seen.into_iter().filter(|(_, n)| *n > 1).map(|(w, _)| w).collect();

    let mut out = ConfidenceMatrix::new();
    for component in components {
        if child.has_links(Side::Architecture, &component.id) {
            continue;
        }
        let remaining = names::remove_words(&component.name, &common);
        if remaining.is_empty() || remaining.len() == names::word_count(&component.name) {
            continue;
        }
        let stripped = remaining.concat();
        for unit in models.code.endpoints() {
            let best = unit
                .names_and_declared_types()
                .filter(|name| names::is_contained(&stripped, &names::tokens(name), PreprocessingMethod::None))
                .filter_map(|name| match names::word_count(name) {
                    0 => None,
                    n => Some((remaining.len() as f64 / n as f64).min(1.0)),
                })
                .reduce(f64::max);
            if let Some(conf) = best.and_then(Confidence::new) {
                out.insert_max(component.id.clone(), unit.id.clone(), conf);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EndpointId {
        EndpointId::new(s)
    }

    fn matrix(entries: &[(&str, &str, f64)]) -> ConfidenceMatrix {
        let mut m = ConfidenceMatrix::new();
        for &(a, c, v) in entries {
            m.insert(id(a), id(c), v);
        }
        m
    }

    #[test]
    fn inherit_links_propagates_to_subtypes() {
        let arch = EndpointModel::architecture(vec![Endpoint::component("c", "Storage")]).unwrap();
        let code = EndpointModel::code(vec![
            Endpoint::compilation_unit("base", "Storage", ["store"]),
            Endpoint::compilation_unit("sql", "SqlBackend", ["store", "sql"]).with_supertypes(["base"]),
            Endpoint::compilation_unit("pg", "PgBackend", ["store", "pg"]).with_supertypes(["sql"]),
            Endpoint::compilation_unit("other", "Other", ["misc"]),
        ])
        .unwrap();
        let child = matrix(&[("c", "base", 0.8)]);

        let out = StructuralRule::InheritLinks.apply(&child, ModelPair::new(&arch, &code));
        assert_eq!(out.value(&id("c"), &id("sql")), 0.8);
        assert_eq!(out.value(&id("c"), &id("pg")), 0.8);
        assert!(!out.contains(&id("c"), &id("base")));
        assert!(!out.contains(&id("c"), &id("other")));
    }

    #[test]
    fn required_drops_units_owned_by_providers() {
        let arch = EndpointModel::architecture(vec![
            Endpoint::component("client", "Client").requiring(["api"]),
            Endpoint::component("server", "Server").providing(["api"]),
            Endpoint::interface("api", "Api"),
        ])
        .unwrap();
        let code = EndpointModel::code(vec![
            Endpoint::compilation_unit("u1", "ServerClient", ["net"]),
            Endpoint::compilation_unit("u2", "ClientUi", ["ui"]),
        ])
        .unwrap();
        let child = matrix(&[("client", "u1", 0.5), ("server", "u1", 0.5), ("client", "u2", 0.5)]);

        let out = StructuralRule::Required.apply(&child, ModelPair::new(&arch, &code));
        assert!(!out.contains(&id("client"), &id("u1")));
        assert!(out.contains(&id("server"), &id("u1")));
        assert!(out.contains(&id("client"), &id("u2")));
    }

    #[test]
    fn subpackage_filter_prefers_the_deeper_claim() {
        let arch = EndpointModel::architecture(vec![
            Endpoint::component("shop", "Shop"),
            Endpoint::component("order", "Order"),
        ])
        .unwrap();
        let code = EndpointModel::code(vec![
            Endpoint::compilation_unit("cart", "Cart", ["com", "shop", "cart"]),
            Endpoint::compilation_unit("checkout", "Checkout", ["com", "shop", "order"]),
        ])
        .unwrap();
        let child = matrix(&[("shop", "cart", 1.0), ("shop", "checkout", 1.0), ("order", "checkout", 1.0)]);

        let out = StructuralRule::SubpackageFilter.apply(&child, ModelPair::new(&arch, &code));
        assert!(out.contains(&id("shop"), &id("cart")));
        assert!(!out.contains(&id("shop"), &id("checkout")));
        assert!(out.contains(&id("order"), &id("checkout")));
    }

    #[test]
    fn provided_interface_correspondence_keeps_the_realising_package() {
        let arch = EndpointModel::architecture(vec![
            Endpoint::component("billing", "Billing").providing(["ipay"]),
            Endpoint::interface("ipay", "IPayment"),
        ])
        .unwrap();
        let code = EndpointModel::code(vec![
            Endpoint::compilation_unit("api", "IPayment", ["com", "api"]).as_interface(),
            Endpoint::compilation_unit("impl", "PaymentImpl", ["com", "billing"]).with_supertypes(["api"]),
            Endpoint::compilation_unit("stray", "BillingReport", ["com", "report"]),
        ])
        .unwrap();
        let child = matrix(&[
            ("billing", "impl", 1.0),
            ("billing", "stray", 0.5),
            ("ipay", "api", 1.0),
        ]);

        let out = StructuralRule::ProvidedInterfaceCorrespondence.apply(&child, ModelPair::new(&arch, &code));
        assert!(out.contains(&id("billing"), &id("impl")));
        assert!(!out.contains(&id("billing"), &id("stray")));
        assert!(out.contains(&id("ipay"), &id("api")));
    }

    #[test]
    fn common_words_gives_unmatched_components_a_second_chance() {
        let arch = EndpointModel::architecture(vec![
            Endpoint::component("order", "OrderService"),
            Endpoint::component("user", "UserService"),
        ])
        .unwrap();
        let code = EndpointModel::code(vec![
            Endpoint::compilation_unit("u1", "OrderManager", ["app"]),
            Endpoint::compilation_unit("u2", "UserService", ["app"]),
        ])
        .unwrap();
        let child = matrix(&[("user", "u2", 1.0)]);

        let out = StructuralRule::CommonWords.apply(&child, ModelPair::new(&arch, &code));
        assert_eq!(out.value(&id("order"), &id("u1")), 0.5);
        assert!(!out.has_links(Side::Architecture, &id("user")));
    }
}
