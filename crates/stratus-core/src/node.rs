//! Realized resource nodes

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::SynthError;
use crate::expr::{Expr, Resolver};
use crate::path::ConstructPath;

/// Declarative record of a single resource, emitted during rendering
///
/// Carries the construct path it was realized at (which determines its
/// logical id), its resource type string and a property map of deferred
/// expressions. Nodes are plain data: all cross-resource knowledge lives in
/// the expressions.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceNode {
    path: ConstructPath,
    resource_type: String,
    properties: IndexMap<String, Expr>,
}

impl ResourceNode {
    /// Create a node of `resource_type` at `path` with no properties
    #[must_use]
    pub fn new(path: ConstructPath, resource_type: impl Into<String>) -> Self {
        Self {
            path,
            resource_type: resource_type.into(),
            properties: IndexMap::new(),
        }
    }

    /// Add a property (builder form)
    #[must_use]
    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Add or replace a property
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<Expr>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Add a property when a value is present, omit the key otherwise
    pub fn set_optional(&mut self, name: &str, value: Option<impl Into<Expr>>) {
        if let Some(value) = value {
            self.properties.insert(name.to_owned(), value.into());
        }
    }

    /// Construct path the node was realized at
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    /// Resource type string, e.g. `AWS::ECS::Service`
    #[inline]
    #[must_use]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Property map in insertion order
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &IndexMap<String, Expr> {
        &self.properties
    }

    /// Render to the template record `{"Type": ..., "Properties": {...}}`
    ///
    /// The `Properties` key is omitted when the node has none.
    pub(crate) fn render(&self, resolver: &dyn Resolver) -> Result<Value, SynthError> {
        let mut record = serde_json::Map::new();
        record.insert(
            "Type".to_owned(),
            Value::String(self.resource_type.clone()),
        );
        if !self.properties.is_empty() {
            let mut rendered = serde_json::Map::new();
            for (name, expr) in &self.properties {
                rendered.insert(name.clone(), expr.resolve(resolver)?);
            }
            record.insert("Properties".to_owned(), Value::Object(rendered));
        }
        Ok(Value::Object(record))
    }
}
