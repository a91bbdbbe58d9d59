// leaf nodes: pairwise scoring functions over the two models
pub mod method;
pub mod names;
pub mod package;
pub mod resemblance;

pub use method::MethodResemblance;
pub use package::{PackageResemblance, PathResemblance};
pub use resemblance::{NameConfig, NameResemblance};

use crate::core::model::{Endpoint, ModelPair};

/// A deterministic, side-effect-free comparison strategy.
///
/// `confidence` returns `None` when there is no evidence for the pair. The
/// engine also drops zero, negative and non-finite values, so an
/// implementation never has to guard its own divisions for the matrix's sake.
pub trait PairwiseHeuristic: Send + Sync {
    fn name(&self) -> String;

    fn confidence(&self, arch: &Endpoint, code: &Endpoint, models: ModelPair<'_>) -> Option<f64>;
}

impl<F> PairwiseHeuristic for (&'static str, F)
where
    F: Fn(&Endpoint, &Endpoint) -> Option<f64> + Send + Sync,
{
    fn name(&self) -> String {
        self.0.to_string()
    }

    fn confidence(&self, arch: &Endpoint, code: &Endpoint, _models: ModelPair<'_>) -> Option<f64> {
        (self.1)(arch, code)
    }
}
