//! Deferred value expressions
//!
//! Provides [`Expr`], the symbolic value type construct properties are built
//! from. An expression is either a concrete JSON literal or a deferred
//! operation (resource reference, attribute lookup, string assembly) that is
//! resolved against the realized resource graph during synthesis.
//!
//! Constructors collapse eagerly: assembling expressions from fully concrete
//! operands yields a plain literal, so deferral only survives where a real
//! dependency on a not-yet-realized resource exists.

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::error::SynthError;
use crate::path::ConstructPath;

/// Built-in deployment environment parameters
///
/// Resolved by the deployment engine, never by the synthesizer, so they
/// always render as deferred references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PseudoParam {
    /// Account the template is deployed into
    AccountId,
    /// Region the template is deployed into
    Region,
    /// Partition of the deployment region
    Partition,
    /// Domain suffix for service endpoints in the deployment partition
    UrlSuffix,
}

impl PseudoParam {
    /// Parameter name as it appears in rendered templates
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AccountId => "AWS::AccountId",
            Self::Region => "AWS::Region",
            Self::Partition => "AWS::Partition",
            Self::UrlSuffix => "AWS::URLSuffix",
        }
    }
}

/// Maps construct paths to the logical ids of their realized resources
///
/// Implemented by the synthesizer while a template is being produced and by
/// [`Template`](crate::Template) afterwards.
pub trait Resolver {
    /// Logical id of the resource realized at `path`
    ///
    /// # Errors
    /// Returns [`SynthError::DanglingReference`] when no construct was ever
    /// declared at `path`, and [`SynthError::UnresolvedReference`] when a
    /// construct was declared there but produced no resource.
    fn resolve_path(&self, path: &ConstructPath) -> Result<String, SynthError>;
}

/// Symbolic property value
///
/// Every construct property is an `Expr`. Concrete values are [`Expr::Lit`];
/// everything else defers to synthesis time, when the full resource graph is
/// known and references can be rewritten into template intrinsics.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Concrete JSON value
    Lit(Value),
    /// Reference to the resource declared at a construct path
    Ref(ConstructPath),
    /// Runtime attribute of the resource declared at a construct path
    GetAtt {
        /// Producing construct
        path: ConstructPath,
        /// Attribute name, e.g. `Arn`
        attribute: String,
    },
    /// Deployment environment parameter
    Pseudo(PseudoParam),
    /// String assembled from parts
    Join {
        /// Separator placed between parts
        separator: String,
        /// Parts, each resolving to a string
        parts: Vec<Expr>,
    },
    /// Element of a list-valued expression
    Select {
        /// Zero-based element index
        index: usize,
        /// Expression resolving to a list
        from: Box<Expr>,
    },
    /// String split into a list
    Split {
        /// Separator to split on
        separator: String,
        /// Expression resolving to a string
        value: Box<Expr>,
    },
    /// List of expressions
    List(Vec<Expr>),
    /// String-keyed map of expressions, insertion order preserved
    Map(IndexMap<String, Expr>),
}

impl Expr {
    /// Concrete literal
    #[inline]
    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Lit(value.into())
    }

    /// Reference to the resource at `path`
    #[inline]
    #[must_use]
    pub fn ref_to(path: ConstructPath) -> Self {
        Self::Ref(path)
    }

    /// Runtime attribute of the resource at `path`
    #[inline]
    pub fn get_att(path: ConstructPath, attribute: impl Into<String>) -> Self {
        Self::GetAtt {
            path,
            attribute: attribute.into(),
        }
    }

    /// Deployment environment parameter
    #[inline]
    #[must_use]
    pub const fn pseudo(param: PseudoParam) -> Self {
        Self::Pseudo(param)
    }

    /// Assemble a string from `parts` with `separator` between them
    ///
    /// Nested joins with the same separator are spliced into the parent, so
    /// composed strings resolve to a single flat intrinsic. Collapses to a
    /// literal when every part is already a literal string.
    #[must_use]
    pub fn join(separator: impl Into<String>, parts: Vec<Expr>) -> Self {
        let separator = separator.into();
        let mut flat = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                Self::Join {
                    separator: inner_sep,
                    parts: inner,
                } if inner_sep == separator => flat.extend(inner),
                other => flat.push(other),
            }
        }
        let literals: Option<Vec<&str>> = flat
            .iter()
            .map(|p| match p {
                Self::Lit(Value::String(s)) => Some(s.as_str()),
                _ => None,
            })
            .collect();
        match literals {
            Some(strings) => Self::Lit(Value::String(strings.join(&separator))),
            None => Self::Join {
                separator,
                parts: flat,
            },
        }
    }

    /// Select element `index` of a list-valued expression
    ///
    /// Collapses when the operand is already a literal list with the index
    /// in range; an out-of-range index on a literal list stays deferred and
    /// fails at resolution.
    #[must_use]
    pub fn select(index: usize, from: Expr) -> Self {
        if let Self::Lit(Value::Array(items)) = &from {
            if let Some(item) = items.get(index) {
                return Self::Lit(item.clone());
            }
        }
        Self::Select {
            index,
            from: Box::new(from),
        }
    }

    /// Split a string-valued expression on `separator`
    ///
    /// Collapses to a literal list when the operand is already a literal
    /// string.
    #[must_use]
    pub fn split(separator: impl Into<String>, value: Expr) -> Self {
        let separator = separator.into();
        if let Self::Lit(Value::String(s)) = &value {
            let parts = s
                .split(separator.as_str())
                .map(|p| Value::String(p.to_owned()))
                .collect();
            return Self::Lit(Value::Array(parts));
        }
        Self::Split {
            separator,
            value: Box::new(value),
        }
    }

    /// List of expressions
    ///
    /// Collapses to a literal list when every item is a literal.
    #[must_use]
    pub fn list(items: Vec<Expr>) -> Self {
        if items.iter().all(Expr::is_concrete) {
            let values = items
                .into_iter()
                .map(|i| match i {
                    Self::Lit(v) => v,
                    _ => Value::Null,
                })
                .collect();
            return Self::Lit(Value::Array(values));
        }
        Self::List(items)
    }

    /// Map of expressions
    ///
    /// Collapses to a literal object when every value is a literal.
    #[must_use]
    pub fn map(entries: IndexMap<String, Expr>) -> Self {
        if entries.values().all(Expr::is_concrete) {
            let mut object = serde_json::Map::new();
            for (key, value) in entries {
                if let Self::Lit(v) = value {
                    object.insert(key, v);
                }
            }
            return Self::Lit(Value::Object(object));
        }
        Self::Map(entries)
    }

    /// Check whether the expression is a concrete literal
    #[inline]
    #[must_use]
    pub const fn is_concrete(&self) -> bool {
        matches!(self, Self::Lit(_))
    }

    /// Concrete value, or `None` for deferred expressions
    #[inline]
    #[must_use]
    pub const fn as_lit(&self) -> Option<&Value> {
        match self {
            Self::Lit(v) => Some(v),
            _ => None,
        }
    }

    /// Resolve to a concrete JSON value against `resolver`
    ///
    /// References become `{"Ref": id}` / `{"Fn::GetAtt": [id, attr]}`
    /// intrinsics; assembly operations collapse where their resolved
    /// operands are concrete and stay intrinsic otherwise. Resolution is
    /// read-only, so resolving the same expression twice yields the same
    /// value.
    ///
    /// # Errors
    /// Returns reference errors from `resolver` and
    /// [`SynthError::Expression`] when an operand resolves to a value the
    /// operation cannot consume (non-string join part, select on a
    /// non-list, out-of-range index).
    pub fn resolve(&self, resolver: &dyn Resolver) -> Result<Value, SynthError> {
        match self {
            Self::Lit(value) => Ok(value.clone()),
            Self::Ref(path) => {
                let id = resolver.resolve_path(path)?;
                Ok(json!({ "Ref": id }))
            }
            Self::GetAtt { path, attribute } => {
                let id = resolver.resolve_path(path)?;
                Ok(json!({ "Fn::GetAtt": [id, attribute] }))
            }
            Self::Pseudo(param) => Ok(json!({ "Ref": param.name() })),
            Self::Join { separator, parts } => {
                let mut resolved = Vec::with_capacity(parts.len());
                for part in parts {
                    resolved.push(part.resolve(resolver)?);
                }
                if resolved.iter().all(Value::is_string) {
                    let joined: Vec<&str> =
                        resolved.iter().filter_map(Value::as_str).collect();
                    return Ok(Value::String(joined.join(separator)));
                }
                if let Some(bad) = resolved.iter().find(|v| !v.is_string() && !v.is_object()) {
                    return Err(SynthError::expression(format!(
                        "join part must resolve to a string, got {bad}"
                    )));
                }
                Ok(json!({ "Fn::Join": [separator, resolved] }))
            }
            Self::Select { index, from } => match from.resolve(resolver)? {
                Value::Array(items) => {
                    let len = items.len();
                    items.into_iter().nth(*index).ok_or_else(|| {
                        SynthError::expression(format!(
                            "select index {index} out of range for list of length {len}"
                        ))
                    })
                }
                deferred @ Value::Object(_) => Ok(json!({ "Fn::Select": [index, deferred] })),
                other => Err(SynthError::expression(format!(
                    "select applied to non-list value {other}"
                ))),
            },
            Self::Split { separator, value } => match value.resolve(resolver)? {
                Value::String(s) => Ok(Value::Array(
                    s.split(separator.as_str())
                        .map(|p| Value::String(p.to_owned()))
                        .collect(),
                )),
                deferred @ Value::Object(_) => Ok(json!({ "Fn::Split": [separator, deferred] })),
                other => Err(SynthError::expression(format!(
                    "split applied to non-string value {other}"
                ))),
            },
            Self::List(items) => {
                let mut resolved = Vec::with_capacity(items.len());
                for item in items {
                    resolved.push(item.resolve(resolver)?);
                }
                Ok(Value::Array(resolved))
            }
            Self::Map(entries) => {
                let mut object = serde_json::Map::new();
                for (key, value) in entries {
                    object.insert(key.clone(), value.resolve(resolver)?);
                }
                Ok(Value::Object(object))
            }
        }
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        Self::Lit(Value::String(s.to_owned()))
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        Self::Lit(Value::String(s))
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        Self::Lit(Value::Bool(b))
    }
}

impl From<u32> for Expr {
    fn from(n: u32) -> Self {
        Self::Lit(Value::from(n))
    }
}

impl From<u64> for Expr {
    fn from(n: u64) -> Self {
        Self::Lit(Value::from(n))
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        Self::Lit(Value::from(n))
    }
}

impl From<f64> for Expr {
    fn from(n: f64) -> Self {
        Self::Lit(Value::from(n))
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Self::Lit(value)
    }
}
