// the sparse pair -> confidence result threaded through the computation graph
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::types::{EndpointId, Side};

/// A confidence value, always within (0, 1].
///
/// There is no way to build a zero, negative or non-finite confidence; absence
/// from a matrix is how "no evidence" is expressed.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const ONE: Confidence = Confidence(1.0);

    /// Values above 1 are clamped; zero, negative, NaN and infinities yield `None`.
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() || value <= 0.0 {
            return None;
        }
        Some(Confidence(value.min(1.0)))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn max(self, other: Confidence) -> Confidence {
        if other.0 > self.0 { other } else { self }
    }
}

impl TryFrom<f64> for Confidence {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Confidence::new(value).ok_or_else(|| format!("confidence {value} is outside (0, 1]"))
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

/// Partial function (architecture endpoint, code endpoint) -> confidence.
///
/// Entries are kept ordered by (architecture id, code id) so that iteration,
/// and everything derived from it, is deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfidenceMatrix {
    entries: BTreeMap<(EndpointId, EndpointId), Confidence>,
}

impl ConfidenceMatrix {
    pub const fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Stores `value` for the pair, or leaves the pair absent when `value` is
    /// not a valid confidence. Returns whether an entry was written.
    pub fn insert(&mut self, arch: EndpointId, code: EndpointId, value: f64) -> bool {
        match Confidence::new(value) {
            Some(c) => {
                self.entries.insert((arch, code), c);
                true
            }
            None => false,
        }
    }

    pub fn insert_confidence(&mut self, arch: EndpointId, code: EndpointId, confidence: Confidence) {
        self.entries.insert((arch, code), confidence);
    }

    /// Keeps the larger of the stored and the given confidence.
    pub fn insert_max(&mut self, arch: EndpointId, code: EndpointId, confidence: Confidence) {
        self.entries
            .entry((arch, code))
            .and_modify(|c| *c = c.max(confidence))
            .or_insert(confidence);
    }

    pub fn get(&self, arch: &EndpointId, code: &EndpointId) -> Option<Confidence> {
        // BTreeMap lookups on tuple keys need an owned key
        self.entries.get(&(arch.clone(), code.clone())).copied()
    }

    /// Confidence of the pair, 0 when absent.
    pub fn value(&self, arch: &EndpointId, code: &EndpointId) -> f64 {
        self.get(arch, code).map_or(0.0, Confidence::value)
    }

    pub fn contains(&self, arch: &EndpointId, code: &EndpointId) -> bool {
        self.get(arch, code).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EndpointId, &EndpointId, Confidence)> {
        self.entries.iter().map(|((a, c), &conf)| (a, c, conf))
    }

    /// All entries of one architecture endpoint, ordered by code id.
    pub fn row<'a>(&'a self, arch: &EndpointId) -> impl Iterator<Item = (&'a EndpointId, Confidence)> + use<'a> {
        let key = arch.clone();
        self.entries
            .range((arch.clone(), EndpointId::new(""))..)
            .take_while(move |((a, _), _)| *a == key)
            .map(|((_, c), &conf)| (c, conf))
    }

    /// All entries that contain `id` on the given side, as (other endpoint, confidence).
    pub fn entries_of<'a>(
        &'a self,
        side: Side,
        id: &'a EndpointId,
    ) -> Box<dyn Iterator<Item = (&'a EndpointId, Confidence)> + 'a> {
        match side {
            Side::Architecture => Box::new(self.row(id)),
            Side::Code => Box::new(
                self.entries
                    .iter()
                    .filter(move |((_, c), _)| c == id)
                    .map(|((a, _), &conf)| (a, conf)),
            ),
        }
    }

    /// Highest confidence among the entries containing `id` on the given side.
    pub fn best_for(&self, side: Side, id: &EndpointId) -> Option<Confidence> {
        self.entries_of(side, id).map(|(_, c)| c).reduce(Confidence::max)
    }

    /// Endpoints of the opposite side linked to `id`.
    pub fn linked(&self, side: Side, id: &EndpointId) -> BTreeSet<EndpointId> {
        self.entries_of(side, id).map(|(other, _)| other.clone()).collect()
    }

    pub fn has_links(&self, side: Side, id: &EndpointId) -> bool {
        self.entries_of(side, id).next().is_some()
    }

    /// Distinct endpoint ids of one side that appear in the matrix.
    pub fn endpoints(&self, side: Side) -> BTreeSet<EndpointId> {
        self.entries
            .keys()
            .map(|(a, c)| match side {
                Side::Architecture => a.clone(),
                Side::Code => c.clone(),
            })
            .collect()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&EndpointId, &EndpointId, Confidence) -> bool) {
        self.entries.retain(|(a, c), conf| keep(a, c, *conf));
    }
}

impl FromIterator<(EndpointId, EndpointId, Confidence)> for ConfidenceMatrix {
    fn from_iter<T: IntoIterator<Item = (EndpointId, EndpointId, Confidence)>>(iter: T) -> Self {
        let mut m = ConfidenceMatrix::new();
        for (a, c, conf) in iter {
            m.insert_max(a, c, conf);
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> EndpointId {
        EndpointId::new(s)
    }

    #[test]
    fn invalid_confidences_are_omitted() {
        let mut m = ConfidenceMatrix::new();
        assert!(!m.insert(id("a"), id("x"), 0.0));
        assert!(!m.insert(id("a"), id("y"), -0.5));
        assert!(!m.insert(id("a"), id("z"), f64::NAN));
        assert!(!m.insert(id("b"), id("x"), f64::INFINITY));
        assert!(m.is_empty());

        assert!(m.insert(id("a"), id("x"), 1.7));
        assert_eq!(m.value(&id("a"), &id("x")), 1.0);
        assert_eq!(m.value(&id("a"), &id("missing")), 0.0);
    }

    #[test]
    fn rows_and_columns() {
        let mut m = ConfidenceMatrix::new();
        m.insert(id("a"), id("x"), 0.5);
        m.insert(id("a"), id("y"), 0.9);
        m.insert(id("ab"), id("x"), 0.3);
        m.insert(id("b"), id("x"), 0.7);

        let row: Vec<&str> = m.row(&id("a")).map(|(c, _)| c.as_str()).collect();
        assert_eq!(row, vec!["x", "y"]);

        // the row outlives the id it was looked up with
        let row: Vec<(&EndpointId, Confidence)> = {
            let lookup = EndpointId::new(String::from("a"));
            m.row(&lookup).collect()
        };
        assert_eq!(row.len(), 2);
        assert!(m.row(&EndpointId::new("zz")).next().is_none());

        assert_eq!(m.best_for(Side::Architecture, &id("a")).unwrap().value(), 0.9);
        assert_eq!(m.best_for(Side::Code, &id("x")).unwrap().value(), 0.7);
        assert_eq!(m.linked(Side::Code, &id("x")).len(), 3);
        assert!(m.best_for(Side::Code, &id("nope")).is_none());
    }
}
