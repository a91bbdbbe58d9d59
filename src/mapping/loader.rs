// TOON documents: endpoint models, pipeline definitions, config, trace links
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::core::definition::PipelineDefinition;
use crate::core::graph::{ComputationGraph, GraphError};
use crate::core::model::{Endpoint, EndpointModel, ModelError};
use crate::core::types::{NodeId, Side};
use crate::mapping::generator::PipelineConfig;
use crate::mapping::trace_link::{TraceLink, TraceLinkSet};

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid TOON document: {0}")]
    Decode(String),
    #[error("cannot encode TOON document: {0}")]
    Encode(String),
    #[error("unexpected document shape: {0}")]
    Shape(#[from] serde_json::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// `side` plus the ordered endpoint list, as written by a model extractor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    pub side: Side,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

impl ModelDocument {
    pub fn into_model(self) -> Result<EndpointModel, ModelError> {
        EndpointModel::new(self.side, self.endpoints)
    }
}

impl From<&EndpointModel> for ModelDocument {
    fn from(model: &EndpointModel) -> Self {
        Self {
            // an empty model built without a side is written as code
            side: model.side().unwrap_or(Side::Code),
            endpoints: model.endpoints().to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceLinkDocument {
    pub links: Vec<TraceLink>,
}

// TOON <-> serde_json::Value <-> T
pub fn parse_toon<T: DeserializeOwned>(text: &str) -> Result<T, LoadError> {
    let value: serde_json::Value = toon_format::decode_default(text).map_err(|e| LoadError::Decode(e.to_string()))?;
    Ok(serde_json::from_value(value)?)
}

pub fn to_toon<T: Serialize>(value: &T) -> Result<String, LoadError> {
    let value = serde_json::to_value(value)?;
    toon_format::encode_default(&value).map_err(|e| LoadError::Encode(e.to_string()))
}

fn read(path: &Path) -> Result<String, LoadError> {
    fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })
}

pub fn parse_model(text: &str) -> Result<EndpointModel, LoadError> {
    Ok(parse_toon::<ModelDocument>(text)?.into_model()?)
}

pub fn load_model(path: impl AsRef<Path>) -> Result<EndpointModel, LoadError> {
    parse_model(&read(path.as_ref())?)
}

pub fn parse_pipeline(text: &str) -> Result<(ComputationGraph, NodeId), LoadError> {
    Ok(parse_toon::<PipelineDefinition>(text)?.compile()?)
}

pub fn load_pipeline(path: impl AsRef<Path>) -> Result<(ComputationGraph, NodeId), LoadError> {
    parse_pipeline(&read(path.as_ref())?)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<PipelineConfig, LoadError> {
    parse_toon(&read(path.as_ref())?)
}

pub fn trace_links_to_toon(links: &TraceLinkSet) -> Result<String, LoadError> {
    to_toon(&TraceLinkDocument { links: links.to_vec() })
}
