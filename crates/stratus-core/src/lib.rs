//! Stratus Core
//!
//! Construct tree, deferred value expressions and one-shot synthesis into
//! an immutable deployment template.
//!
//! # Core Concepts
//!
//! - [`Stack`]: Root of a construct tree; synthesizes into a [`Template`]
//! - [`Scope`]: Addressable position of a construct, with weak back-reference
//! - [`Construct`]: Declaration-time object realized via bind and render hooks
//! - [`Expr`]: Symbolic property value, concrete or deferred until synthesis
//! - [`ResourceNode`]: Declarative resource record emitted during rendering
//! - [`LogicalId`]: Deterministic template-level name derived from a path
//!
//! # Example
//!
//! ```rust,ignore
//! use stratus_core::{AsScope, Stack};
//!
//! let stack = Stack::new();
//! let cluster = Cluster::new(&stack, "EcsCluster", ClusterProps::new(&vpc))?;
//!
//! // Deferred values flow between constructs and settle at synthesis.
//! let template = stack.synth()?;
//! println!("{}", template.to_json_pretty());
//! ```

// Core modules
mod error;
mod expr;
mod ids;
mod metric;
mod node;
mod path;
mod synth;
mod tree;

// Re-exports
pub use error::SynthError;
pub use expr::{Expr, PseudoParam, Resolver};
pub use ids::LogicalId;
pub use metric::Metric;
pub use node::ResourceNode;
pub use path::{ConstructPath, PathError};
pub use synth::{NodeSink, Template};
pub use tree::{AsScope, BindKey, Construct, Scope, Stack};
