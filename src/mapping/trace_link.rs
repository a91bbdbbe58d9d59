// accepted (architecture endpoint, code endpoint, confidence) records
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::matrix::{Confidence, ConfidenceMatrix};
use crate::core::types::EndpointId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceLink {
    pub architecture_endpoint: EndpointId,
    pub code_endpoint: EndpointId,
    pub confidence: Confidence,
}

#[derive(Debug, Error, PartialEq)]
pub enum TraceLinkError {
    #[error("link {arch} -> {code} already recorded with confidence {old}, refusing {new}")]
    LinkAlreadyExists {
        arch: EndpointId,
        code: EndpointId,
        old: Confidence,
        new: Confidence,
    },
}

/// A set of trace links, at most one per endpoint pair, iterated in
/// (architecture id, code id) order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceLinkSet {
    links: BTreeMap<(EndpointId, EndpointId), Confidence>,
}

impl TraceLinkSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry of the matrix becomes one link.
    pub fn from_matrix(matrix: &ConfidenceMatrix) -> Self {
        Self {
            links: matrix
                .iter()
                .map(|(a, c, conf)| ((a.clone(), c.clone()), conf))
                .collect(),
        }
    }

    //idempotent for an identical link, never overwrites a different confidence
    pub fn insert(&mut self, link: TraceLink) -> Result<(), TraceLinkError> {
        let key = (link.architecture_endpoint, link.code_endpoint);
        match self.links.get(&key).copied() {
            None => {
                self.links.insert(key, link.confidence);
                Ok(())
            }
            Some(old) if old == link.confidence => Ok(()),
            Some(old) => Err(TraceLinkError::LinkAlreadyExists {
                arch: key.0,
                code: key.1,
                old,
                new: link.confidence,
            }),
        }
    }

    pub fn get(&self, arch: &EndpointId, code: &EndpointId) -> Option<Confidence> {
        self.links.get(&(arch.clone(), code.clone())).copied()
    }

    pub fn contains(&self, arch: &EndpointId, code: &EndpointId) -> bool {
        self.get(arch, code).is_some()
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = TraceLink> + '_ {
        self.links.iter().map(|((a, c), &confidence)| TraceLink {
            architecture_endpoint: a.clone(),
            code_endpoint: c.clone(),
            confidence,
        })
    }

    //links of one architecture endpoint, for reports
    pub fn for_architecture<'a>(&'a self, arch: &'a EndpointId) -> impl Iterator<Item = TraceLink> + 'a {
        self.iter().filter(move |l| &l.architecture_endpoint == arch)
    }

    pub fn to_vec(&self) -> Vec<TraceLink> {
        self.iter().collect()
    }
}

impl FromIterator<TraceLink> for TraceLinkSet {
    // keeps the highest confidence when a pair repeats
    fn from_iter<T: IntoIterator<Item = TraceLink>>(iter: T) -> Self {
        let mut links: BTreeMap<(EndpointId, EndpointId), Confidence> = BTreeMap::new();
        for link in iter {
            links
                .entry((link.architecture_endpoint, link.code_endpoint))
                .and_modify(|c| *c = c.max(link.confidence))
                .or_insert(link.confidence);
        }
        Self { links }
    }
}
