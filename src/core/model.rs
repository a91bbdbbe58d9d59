// endpoint models: the read-only views handed in by the model extractors
use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::{EndpointId, EndpointKind, Side};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("duplicate endpoint id {0}")]
    DuplicateEndpoint(EndpointId),
    #[error("endpoint {id} is a {kind:?}, which does not belong to the {expected:?} model")]
    WrongSide {
        id: EndpointId,
        kind: EndpointKind,
        expected: Side,
    },
}

/// A matchable unit of either model.
///
/// Architecture endpoints use `provided`, `required` and `signatures`; code
/// endpoints use the containment chain, declared types, methods, supertypes
/// and path. Unused fields simply stay empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
    pub id: EndpointId,
    pub name: String,
    pub kind: EndpointKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Ancestor package names, outermost first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub containment: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub declared_types: Vec<String>,
    #[serde(default)]
    pub is_interface: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub supertypes: Vec<EndpointId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provided: Vec<EndpointId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<EndpointId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<String>,
}

impl Endpoint {
    pub fn new(id: impl Into<EndpointId>, name: impl Into<String>, kind: EndpointKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            type_name: None,
            containment: Vec::new(),
            declared_types: Vec::new(),
            is_interface: false,
            methods: Vec::new(),
            supertypes: Vec::new(),
            path: None,
            provided: Vec::new(),
            required: Vec::new(),
            signatures: Vec::new(),
        }
    }

    pub fn component(id: impl Into<EndpointId>, name: impl Into<String>) -> Self {
        Self::new(id, name, EndpointKind::Component)
    }

    pub fn interface(id: impl Into<EndpointId>, name: impl Into<String>) -> Self {
        Self::new(id, name, EndpointKind::Interface)
    }

    /// A compilation unit inside the given package chain (outermost first).
    pub fn compilation_unit<S: Into<String>>(
        id: impl Into<EndpointId>,
        name: impl Into<String>,
        containment: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut e = Self::new(id, name, EndpointKind::CompilationUnit);
        e.containment = containment.into_iter().map(Into::into).collect();
        e
    }

    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.type_name = Some(type_name.into());
        self
    }

    pub fn with_declared_types<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.declared_types = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_methods<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.methods = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_signatures<S: Into<String>>(mut self, names: impl IntoIterator<Item = S>) -> Self {
        self.signatures = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_supertypes<I: Into<EndpointId>>(mut self, ids: impl IntoIterator<Item = I>) -> Self {
        self.supertypes = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn providing<I: Into<EndpointId>>(mut self, ids: impl IntoIterator<Item = I>) -> Self {
        self.provided = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn requiring<I: Into<EndpointId>>(mut self, ids: impl IntoIterator<Item = I>) -> Self {
        self.required = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn as_interface(mut self) -> Self {
        self.is_interface = true;
        self
    }

    pub fn has_parent(&self) -> bool {
        !self.containment.is_empty()
    }

    /// The unit's own name followed by the names of the types it declares.
    pub fn names_and_declared_types(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.declared_types.iter().map(String::as_str))
    }
}

/// Ordered, immutable collection of the endpoints of one side.
#[derive(Debug, Clone, Default)]
pub struct EndpointModel {
    side: Option<Side>,
    endpoints: Vec<Endpoint>,
    index: HashMap<EndpointId, usize>,
}

impl EndpointModel {
    pub fn new(side: Side, endpoints: Vec<Endpoint>) -> Result<Self, ModelError> {
        let mut index = HashMap::with_capacity(endpoints.len());
        for (pos, e) in endpoints.iter().enumerate() {
            if e.kind.side() != side {
                return Err(ModelError::WrongSide {
                    id: e.id.clone(),
                    kind: e.kind,
                    expected: side,
                });
            }
            if index.insert(e.id.clone(), pos).is_some() {
                return Err(ModelError::DuplicateEndpoint(e.id.clone()));
            }
        }
        Ok(Self {
            side: Some(side),
            endpoints,
            index,
        })
    }

    pub fn architecture(endpoints: Vec<Endpoint>) -> Result<Self, ModelError> {
        Self::new(Side::Architecture, endpoints)
    }

    pub fn code(endpoints: Vec<Endpoint>) -> Result<Self, ModelError> {
        Self::new(Side::Code, endpoints)
    }

    pub fn empty(side: Side) -> Self {
        Self {
            side: Some(side),
            ..Self::default()
        }
    }

    pub fn side(&self) -> Option<Side> {
        self.side
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn get(&self, id: &EndpointId) -> Option<&Endpoint> {
        self.index.get(id).map(|&pos| &self.endpoints[pos])
    }

    pub fn contains(&self, id: &EndpointId) -> bool {
        self.index.contains_key(id)
    }

    /// Containment chain of an endpoint, outermost package first.
    pub fn ancestors(&self, id: &EndpointId) -> &[String] {
        self.get(id).map(|e| e.containment.as_slice()).unwrap_or(&[])
    }

    pub fn of_kind(&self, kind: EndpointKind) -> impl Iterator<Item = &Endpoint> {
        self.endpoints.iter().filter(move |e| e.kind == kind)
    }

    /// Every endpoint whose containment chain starts with `package`
    /// (the package itself and all of its sub-packages).
    pub fn units_in_package<'a>(&'a self, package: &'a [String]) -> impl Iterator<Item = &'a Endpoint> + 'a {
        self.endpoints
            .iter()
            .filter(move |e| e.containment.starts_with(package))
    }

    /// Ids of all supertypes reachable from `id` (excluding `id` itself).
    pub fn supertypes_transitive(&self, id: &EndpointId) -> BTreeSet<EndpointId> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<&EndpointId> = match self.get(id) {
            Some(e) => e.supertypes.iter().collect(),
            None => return seen,
        };
        while let Some(next) = stack.pop() {
            if next == id || !seen.insert(next.clone()) {
                continue;
            }
            if let Some(e) = self.get(next) {
                stack.extend(e.supertypes.iter());
            }
        }
        seen
    }
}

/// The unit of evaluation: one architecture model and one code model.
#[derive(Debug, Clone, Copy)]
pub struct ModelPair<'a> {
    pub architecture: &'a EndpointModel,
    pub code: &'a EndpointModel,
}

impl<'a> ModelPair<'a> {
    pub fn new(architecture: &'a EndpointModel, code: &'a EndpointModel) -> Self {
        Self { architecture, code }
    }

    pub fn is_empty(&self) -> bool {
        self.architecture.is_empty() || self.code.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_ids_and_wrong_side() {
        let dup = EndpointModel::architecture(vec![
            Endpoint::component("a", "A"),
            Endpoint::component("a", "B"),
        ])
        .unwrap_err();
        assert_eq!(dup, ModelError::DuplicateEndpoint(EndpointId::new("a")));

        let wrong = EndpointModel::code(vec![Endpoint::component("a", "A")]).unwrap_err();
        match wrong {
            ModelError::WrongSide { expected, kind, .. } => {
                assert_eq!(expected, Side::Code);
                assert_eq!(kind, EndpointKind::Component);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn package_queries_and_supertypes() {
        let code = EndpointModel::code(vec![
            Endpoint::compilation_unit("base", "Base", ["com", "shop"]),
            Endpoint::compilation_unit("mid", "Mid", ["com", "shop", "order"]).with_supertypes(["base"]),
            Endpoint::compilation_unit("leaf", "Leaf", ["com", "util"]).with_supertypes(["mid"]),
        ])
        .unwrap();

        let pkg = vec!["com".to_string(), "shop".to_string()];
        let ids: Vec<&str> = code.units_in_package(&pkg).map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["base", "mid"]);

        let supers = code.supertypes_transitive(&EndpointId::new("leaf"));
        assert!(supers.contains(&EndpointId::new("mid")));
        assert!(supers.contains(&EndpointId::new("base")));
        assert_eq!(supers.len(), 2);

        assert_eq!(code.ancestors(&EndpointId::new("mid")).len(), 3);
        assert!(code.ancestors(&EndpointId::new("missing")).is_empty());
    }
}
