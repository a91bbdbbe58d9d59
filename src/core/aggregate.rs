// aggregation kernels: combine, select and gate child results
use std::collections::{BTreeMap, BTreeSet};

use crate::core::matrix::{Confidence, ConfidenceMatrix};
use crate::core::model::EndpointModel;
use crate::core::types::{Axis, EndpointId, Side};

/// Elementwise maximum. A pair present in any input survives with its best
/// confidence; absence in one input never lowers it.
pub fn maximum<'a>(inputs: impl IntoIterator<Item = &'a ConfidenceMatrix>) -> ConfidenceMatrix {
    let mut out = ConfidenceMatrix::new();
    for m in inputs {
        for (a, c, conf) in m.iter() {
            out.insert_max(a.clone(), c.clone(), conf);
        }
    }
    out
}

fn best_per(m: &ConfidenceMatrix, side: Side) -> BTreeMap<&EndpointId, Confidence> {
    let mut best: BTreeMap<&EndpointId, Confidence> = BTreeMap::new();
    for (a, c, conf) in m.iter() {
        let key = match side {
            Side::Architecture => a,
            Side::Code => c,
        };
        best.entry(key).and_modify(|b| *b = b.max(conf)).or_insert(conf);
    }
    best
}

fn match_best_on(m: &ConfidenceMatrix, side: Side) -> ConfidenceMatrix {
    let best = best_per(m, side);
    m.iter()
        .filter(|(a, c, conf)| {
            let key = match side {
                Side::Architecture => *a,
                Side::Code => *c,
            };
            best.get(key).is_some_and(|b| *conf == *b)
        })
        .map(|(a, c, conf)| (a.clone(), c.clone(), conf))
        .collect()
}

/// For every endpoint on the axis keep only the pairs at its maximum.
/// All ties are retained. `Axis::Both` applies the architecture axis first
/// and the code axis last.
pub fn match_best(m: &ConfidenceMatrix, axis: Axis) -> ConfidenceMatrix {
    match axis {
        Axis::Architecture => match_best_on(m, Side::Architecture),
        Axis::Code => match_best_on(m, Side::Code),
        Axis::Both => match_best_on(&match_best_on(m, Side::Architecture), Side::Code),
    }
}

/// Pairs of `base` that `predicate` admits, with `base`'s confidences.
pub fn filter(base: &ConfidenceMatrix, predicate: &ConfidenceMatrix) -> ConfidenceMatrix {
    let mut out = base.clone();
    out.retain(|a, c, _| predicate.contains(a, c));
    out
}

pub fn threshold(m: &ConfidenceMatrix, min: Confidence) -> ConfidenceMatrix {
    let mut out = m.clone();
    out.retain(|_, _, conf| conf >= min);
    out
}

// c lies in the package (or a sub-package) of one of the accepted units
fn consistent(code: &EndpointModel, candidate: &EndpointId, accepted: &BTreeSet<EndpointId>) -> bool {
    if accepted.contains(candidate) {
        return true;
    }
    let chain = code.ancestors(candidate);
    accepted.iter().any(|unit| {
        let pkg = code.ancestors(unit);
        !pkg.is_empty() && chain.starts_with(pkg)
    })
}

/// Coarse-then-fine matching.
///
/// For an architecture endpoint with coarse evidence, fine pairs are kept only
/// for code endpoints inside a package the coarse stage accepted. Endpoints
/// without coarse evidence keep their fine pairs unchanged. The result is the
/// maximum of the coarse matrix and the narrowed fine matrix.
pub fn match_sequentially(coarse: &ConfidenceMatrix, fine: &ConfidenceMatrix, code: &EndpointModel) -> ConfidenceMatrix {
    let mut out = coarse.clone();
    for arch in fine.endpoints(Side::Architecture) {
        let accepted = coarse.linked(Side::Architecture, &arch);
        for (c, conf) in fine.row(&arch) {
            if accepted.is_empty() || consistent(code, c, &accepted) {
                out.insert_max(arch.clone(), c.clone(), conf);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::Endpoint;

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
    fn maximum_takes_the_best_vote() {
        let a = matrix(&[("x", "1", 0.4), ("x", "2", 0.9)]);
        let b = matrix(&[("x", "1", 0.6), ("y", "1", 0.2)]);
        let m = maximum([&a, &b]);
        assert_eq!(m.len(), 3);
        assert_eq!(m.value(&id("x"), &id("1")), 0.6);
        assert_eq!(m.value(&id("x"), &id("2")), 0.9);
        assert_eq!(m.value(&id("y"), &id("1")), 0.2);
    }

    #[test]
    fn match_best_keeps_all_ties() {
        let m = matrix(&[("cache", "a.Cache", 1.0), ("cache", "b.Cache", 1.0), ("cache", "Util", 0.5)]);
        let best = match_best(&m, Axis::Architecture);
        assert_eq!(best.len(), 2);
        assert!(best.contains(&id("cache"), &id("a.Cache")));
        assert!(best.contains(&id("cache"), &id("b.Cache")));
    }

    #[test]
    fn both_axes_apply_code_last() {
        // arch first: x -> 1, y -> 1; then code 1 keeps x only
        let m = matrix(&[("x", "1", 0.9), ("y", "1", 0.8), ("y", "2", 0.5)]);
        let both = match_best(&m, Axis::Both);
        assert_eq!(both, matrix(&[("x", "1", 0.9)]));
        assert_eq!(both, match_best(&match_best(&m, Axis::Architecture), Axis::Code));

        // code first keeps y -> 2, which the architecture pass then accepts
        let code_then_arch = match_best(&match_best(&m, Axis::Code), Axis::Architecture);
        assert_eq!(code_then_arch, matrix(&[("x", "1", 0.9), ("y", "2", 0.5)]));
        assert_ne!(both, code_then_arch);
    }

    #[test]
    fn both_axes_keep_ties_on_both_sides() {
        let tie = matrix(&[("x", "1", 0.5), ("y", "1", 0.5), ("y", "2", 0.5)]);
        assert_eq!(match_best(&tie, Axis::Both), tie);
    }

    #[test]
    fn filter_and_threshold_are_subsets() {
        let base = matrix(&[("x", "1", 0.4), ("x", "2", 0.9), ("y", "1", 0.7)]);
        let predicate = matrix(&[("x", "2", 0.1), ("y", "1", 1.0), ("z", "9", 1.0)]);
        let f = filter(&base, &predicate);
        assert_eq!(f, matrix(&[("x", "2", 0.9), ("y", "1", 0.7)]));

        let t = threshold(&base, Confidence::new(0.7).unwrap());
        assert_eq!(t, matrix(&[("x", "2", 0.9), ("y", "1", 0.7)]));
    }

    #[test]
    fn match_sequentially_narrows_fine_candidates() {
        let code = EndpointModel::code(vec![
            Endpoint::compilation_unit("order.A", "Cache", ["com", "order"]),
            Endpoint::compilation_unit("order.impl.B", "CacheImpl", ["com", "order", "impl"]),
            Endpoint::compilation_unit("user.C", "Cache", ["com", "user"]),
        ])
        .unwrap();
        let coarse = matrix(&[("order", "order.A", 0.5)]);
        let fine = matrix(&[
            ("order", "order.A", 1.0),
            ("order", "order.impl.B", 0.5),
            ("order", "user.C", 1.0),
            ("user", "user.C", 1.0),
        ]);

        let m = match_sequentially(&coarse, &fine, &code);
        assert_eq!(m.value(&id("order"), &id("order.A")), 1.0);
        assert_eq!(m.value(&id("order"), &id("order.impl.B")), 0.5);
        assert!(!m.contains(&id("order"), &id("user.C")));
        // no coarse evidence for "user": the fine result passes through
        assert!(m.contains(&id("user"), &id("user.C")));
    }
}
