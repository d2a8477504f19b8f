//! One-shot synthesis
//!
//! Walks a [`Stack`](crate::Stack) in declaration order, runs bind
//! hooks, renders resource nodes and resolves every deferred expression,
//! producing an immutable [`Template`]. Synthesis never mutates construct
//! state visible to callers, so a stack can be synthesized repeatedly with
//! identical results.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::{json, Value};

use crate::error::SynthError;
use crate::expr::{Expr, Resolver};
use crate::ids::LogicalId;
use crate::node::ResourceNode;
use crate::path::ConstructPath;
use crate::tree::Stack;

/// Collector for resource nodes emitted during the render pass
pub struct NodeSink {
    nodes: Vec<ResourceNode>,
}

impl NodeSink {
    fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Emit a node into the template being synthesized
    pub fn emit(&mut self, node: ResourceNode) {
        self.nodes.push(node);
    }
}

/// Resolver used while the template is still being assembled
struct SynthResolver<'a> {
    ids: &'a HashMap<ConstructPath, String>,
    stack: &'a Stack,
}

impl Resolver for SynthResolver<'_> {
    fn resolve_path(&self, path: &ConstructPath) -> Result<String, SynthError> {
        if let Some(id) = self.ids.get(path) {
            return Ok(id.clone());
        }
        if self.stack.is_declared(path) {
            Err(SynthError::UnresolvedReference { path: path.clone() })
        } else {
            Err(SynthError::DanglingReference { path: path.clone() })
        }
    }
}

pub(crate) fn synthesize(stack: &Stack) -> Result<Template, SynthError> {
    // Bind pass. Hooks may declare and register further constructs (late
    // roles, grants); those are picked up before rendering starts.
    let mut index = 0;
    while let Some(construct) = stack.construct_at(index) {
        construct.bind(stack)?;
        index += 1;
    }
    tracing::debug!(constructs = index, "bind pass complete");

    // Render pass over the now-settled tree.
    let mut sink = NodeSink::new();
    for construct in stack.constructs_snapshot() {
        construct.render(&mut sink)?;
    }
    tracing::debug!(nodes = sink.nodes.len(), "render pass complete");

    // Assign logical ids, then resolve every property expression.
    let mut ids: HashMap<ConstructPath, String> = HashMap::new();
    let mut assigned: BTreeSet<String> = BTreeSet::new();
    for node in &sink.nodes {
        let logical = LogicalId::from_path(node.path()).into_string();
        if !assigned.insert(logical.clone()) {
            return Err(SynthError::DuplicateLogicalId { id: logical });
        }
        ids.insert(node.path().clone(), logical);
    }

    let resolver = SynthResolver { ids: &ids, stack };
    let mut resources = BTreeMap::new();
    for node in &sink.nodes {
        let record = node.render(&resolver)?;
        resources.insert(ids[node.path()].clone(), record);
    }

    let paths = ids
        .iter()
        .map(|(path, logical)| (path.to_string(), logical.clone()))
        .collect();
    let declared = stack
        .declared_paths()
        .iter()
        .map(ToString::to_string)
        .collect();
    tracing::debug!(resources = resources.len(), "synthesis complete");

    Ok(Template {
        resources,
        paths,
        declared,
    })
}

/// Immutable synthesis output
///
/// Holds the rendered resource map plus the construct-path index needed to
/// look up logical ids and resolve further expressions after synthesis.
/// Sorted maps throughout, so serialization is canonical: the same tree
/// synthesizes to byte-identical JSON every time.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    resources: BTreeMap<String, Value>,
    paths: BTreeMap<String, String>,
    declared: BTreeSet<String>,
}

impl Template {
    /// Full template document
    #[must_use]
    pub fn to_value(&self) -> Value {
        json!({ "Resources": self.resources })
    }

    /// Canonical single-line JSON rendering
    #[must_use]
    pub fn to_canonical_json(&self) -> String {
        self.to_value().to_string()
    }

    /// Pretty-printed JSON rendering
    #[must_use]
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(&self.to_value()).unwrap_or_default()
    }

    /// Resource record by logical id
    #[must_use]
    pub fn resource(&self, logical_id: &str) -> Option<&Value> {
        self.resources.get(logical_id)
    }

    /// Iterate resource records sorted by logical id
    pub fn resources(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.resources.iter().map(|(id, record)| (id.as_str(), record))
    }

    /// Resource records with the given type, sorted by logical id
    #[must_use]
    pub fn resources_of_type(&self, resource_type: &str) -> Vec<(&str, &Value)> {
        self.resources()
            .filter(|(_, record)| {
                record.get("Type").and_then(Value::as_str) == Some(resource_type)
            })
            .collect()
    }

    /// Number of resources in the template
    #[must_use]
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Logical id of the resource realized at `path`, if any
    #[must_use]
    pub fn logical_id(&self, path: &ConstructPath) -> Option<&str> {
        self.paths.get(&path.to_string()).map(String::as_str)
    }

    /// Resolve an expression against this template
    ///
    /// Useful for asserting on composed values after synthesis.
    ///
    /// # Errors
    /// Returns reference errors for paths outside the template and
    /// expression errors for malformed compositions
    pub fn resolve(&self, expr: &Expr) -> Result<Value, SynthError> {
        expr.resolve(self)
    }
}

impl Resolver for Template {
    fn resolve_path(&self, path: &ConstructPath) -> Result<String, SynthError> {
        let key = path.to_string();
        if let Some(id) = self.paths.get(&key) {
            return Ok(id.clone());
        }
        if self.declared.contains(&key) {
            Err(SynthError::UnresolvedReference { path: path.clone() })
        } else {
            Err(SynthError::DanglingReference { path: path.clone() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{AsScope, Construct, Scope};
    use std::rc::Rc;

    struct Leaf {
        scope: Scope,
        with_ref: Option<ConstructPath>,
    }

    impl Construct for Leaf {
        fn scope(&self) -> &Scope {
            &self.scope
        }

        fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
            let mut node = ResourceNode::new(self.scope.path().clone(), "Test::Leaf");
            if let Some(target) = &self.with_ref {
                node.set_property("Target", Expr::ref_to(target.clone()));
            }
            nodes.emit(node);
            Ok(())
        }
    }

    fn leaf(stack: &Stack, id: &str) -> Rc<Leaf> {
        let construct = Rc::new(Leaf {
            scope: stack.as_scope().child(id).unwrap(),
            with_ref: None,
        });
        stack.register(construct.clone());
        construct
    }

    #[test]
    fn template_maps_path_to_logical_id() {
        let stack = Stack::new();
        let a = leaf(&stack, "Alpha");
        let template = stack.synth().unwrap();
        let id = template.logical_id(a.scope.path()).unwrap();
        assert!(id.starts_with("Alpha"));
        assert!(template.resource(id).is_some());
    }

    #[test]
    fn reference_to_undeclared_path_is_dangling() {
        let stack = Stack::new();
        let construct = Rc::new(Leaf {
            scope: stack.as_scope().child("Alpha").unwrap(),
            with_ref: Some(ConstructPath::single("NeverDeclared")),
        });
        stack.register(construct);
        assert!(matches!(
            stack.synth(),
            Err(SynthError::DanglingReference { .. })
        ));
    }

    #[test]
    fn reference_to_resourceless_construct_is_unresolved() {
        let stack = Stack::new();
        // Declared scope with no registered construct behind it.
        let ghost = stack.as_scope().child("Ghost").unwrap();
        let construct = Rc::new(Leaf {
            scope: stack.as_scope().child("Alpha").unwrap(),
            with_ref: Some(ghost.path().clone()),
        });
        stack.register(construct);
        assert!(matches!(
            stack.synth(),
            Err(SynthError::UnresolvedReference { .. })
        ));
    }

    #[test]
    fn synth_twice_is_identical() {
        let stack = Stack::new();
        leaf(&stack, "Alpha");
        leaf(&stack, "Beta");
        let first = stack.synth().unwrap().to_canonical_json();
        let second = stack.synth().unwrap().to_canonical_json();
        assert_eq!(first, second);
    }

    #[test]
    fn resources_of_type_filters() {
        let stack = Stack::new();
        leaf(&stack, "Alpha");
        let template = stack.synth().unwrap();
        assert_eq!(template.resources_of_type("Test::Leaf").len(), 1);
        assert!(template.resources_of_type("Test::Other").is_empty());
    }
}
