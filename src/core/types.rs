// shared identifiers and small enums
use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of an endpoint inside one model.
///
/// Ordering is lexicographic on the underlying string, which is what every
/// deterministic iteration in the crate relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EndpointId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EndpointId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Index of a computation node inside the arena of one `ComputationGraph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which model an endpoint comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Architecture,
    Code,
}

/// Selection axis of a best-match stage.
///
/// `Both` is `Code` applied on top of `Architecture`: the outer (code) axis
/// is applied last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Architecture,
    Code,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointKind {
    Component,
    Interface,
    CompilationUnit,
}

impl EndpointKind {
    pub fn side(self) -> Side {
        match self {
            EndpointKind::Component | EndpointKind::Interface => Side::Architecture,
            EndpointKind::CompilationUnit => Side::Code,
        }
    }
}

/// How two name fragments are normalized before they are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreprocessingMethod {
    #[default]
    None,
    Stemming,
    Lemmatization,
}

impl fmt::Display for PreprocessingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PreprocessingMethod::None => "none",
            PreprocessingMethod::Stemming => "stemming",
            PreprocessingMethod::Lemmatization => "lemmatization",
        };
        f.write_str(s)
    }
}
