//! Construct tree and scope management
//!
//! Provides [`Stack`], the root every construct attaches to, and [`Scope`],
//! the addressable position a construct occupies in the tree. Scopes hold a
//! weak back-reference to their stack: child-to-parent links never keep the
//! tree alive, and a handle used after its stack is dropped reports
//! [`SynthError::DetachedScope`] instead of dangling.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use crate::error::SynthError;
use crate::path::ConstructPath;
use crate::synth::{self, NodeSink, Template};

/// A node in the construct tree
///
/// Constructs validate their options eagerly at declaration time and are
/// realized lazily in two passes: `bind` runs cross-construct side effects
/// (grants, attachments, late role creation), then `render` emits resource
/// nodes once all state has settled.
pub trait Construct {
    /// Scope the construct was declared at
    fn scope(&self) -> &Scope;

    /// Run cross-construct side effects before rendering
    ///
    /// Called once per synthesis in declaration order. Constructs declared
    /// by a bind hook are themselves bound before rendering starts.
    ///
    /// # Errors
    /// Returns an error when the construct's settled state is unusable,
    /// e.g. a task definition bound with no containers
    fn bind(&self, stack: &Stack) -> Result<(), SynthError> {
        let _ = stack;
        Ok(())
    }

    /// Emit resource nodes for the realized construct
    ///
    /// Must not declare or register further constructs.
    ///
    /// # Errors
    /// Returns an error when the construct cannot be expressed as resource
    /// nodes
    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let _ = nodes;
        Ok(())
    }
}

/// Identity of a capability interaction between two constructs
///
/// Interactions keyed this way run their side effects once; repeats are
/// no-ops. Used for grants and load-balancer attachments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindKey {
    producer: ConstructPath,
    consumer: ConstructPath,
    capability: &'static str,
}

impl BindKey {
    /// Key the interaction `capability` between `producer` and `consumer`
    #[inline]
    #[must_use]
    pub fn new(
        producer: ConstructPath,
        consumer: ConstructPath,
        capability: &'static str,
    ) -> Self {
        Self {
            producer,
            consumer,
            capability,
        }
    }
}

#[derive(Default)]
struct StackInner {
    declared: RefCell<HashSet<ConstructPath>>,
    constructs: RefCell<Vec<Rc<dyn Construct>>>,
    bound: RefCell<HashSet<BindKey>>,
}

/// Root of a construct tree
///
/// Owns every registered construct, the declaration registry that keeps
/// sibling ids unique, and the interaction memo that keeps capability side
/// effects idempotent. Cloning a `Stack` yields another handle to the same
/// tree. Synthesis via [`Stack::synth`] reads the tree without consuming
/// it.
#[derive(Clone, Default)]
pub struct Stack {
    inner: Rc<StackInner>,
}

impl Stack {
    /// Create an empty stack
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a construct for the synthesis passes
    ///
    /// Constructs are bound and rendered in registration order.
    pub fn register(&self, construct: Rc<dyn Construct>) {
        self.inner.constructs.borrow_mut().push(construct);
    }

    /// Record a capability interaction, returning `true` the first time
    ///
    /// A second call with an equal key returns `false`; callers skip the
    /// side effect in that case.
    pub fn once(&self, key: BindKey) -> bool {
        self.inner.bound.borrow_mut().insert(key)
    }

    /// Synthesize the tree into an immutable template
    ///
    /// # Errors
    /// Returns any error raised by a bind or render hook, plus reference
    /// and logical-id errors from the resolution pass
    pub fn synth(&self) -> Result<Template, SynthError> {
        synth::synthesize(self)
    }

    pub(crate) fn construct_at(&self, index: usize) -> Option<Rc<dyn Construct>> {
        self.inner.constructs.borrow().get(index).cloned()
    }

    pub(crate) fn constructs_snapshot(&self) -> Vec<Rc<dyn Construct>> {
        self.inner.constructs.borrow().clone()
    }

    pub(crate) fn is_declared(&self, path: &ConstructPath) -> bool {
        self.inner.declared.borrow().contains(path)
    }

    pub(crate) fn declared_paths(&self) -> Vec<ConstructPath> {
        self.inner.declared.borrow().iter().cloned().collect()
    }
}

/// Addressable position of a construct in the tree
///
/// Created by declaring a child id under a parent scope (or under the stack
/// itself). Declaration reserves the id: a sibling with the same id is
/// rejected immediately, not at synthesis.
#[derive(Debug, Clone)]
pub struct Scope {
    stack: Weak<StackInner>,
    path: ConstructPath,
}

impl Scope {
    /// Path of this scope
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        &self.path
    }

    /// Stack this scope belongs to
    ///
    /// # Errors
    /// Returns [`SynthError::DetachedScope`] when the stack has been
    /// dropped
    pub fn stack(&self) -> Result<Stack, SynthError> {
        self.stack
            .upgrade()
            .map(|inner| Stack { inner })
            .ok_or(SynthError::DetachedScope)
    }

    /// Declare a child scope under this one
    ///
    /// # Errors
    /// Returns an error when the id is malformed, a sibling with the same
    /// id exists, or the stack has been dropped
    pub fn child(&self, id: &str) -> Result<Scope, SynthError> {
        ConstructPath::validate_id(id)?;
        let inner = self.stack.upgrade().ok_or(SynthError::DetachedScope)?;
        let path = self.path.child(id);
        if !inner.declared.borrow_mut().insert(path.clone()) {
            return Err(SynthError::DuplicateId {
                parent: self.path.clone(),
                id: id.to_owned(),
            });
        }
        Ok(Scope {
            stack: self.stack.clone(),
            path,
        })
    }
}

/// Types constructs can attach to
pub trait AsScope {
    /// Scope new children are declared under
    fn as_scope(&self) -> Scope;
}

impl AsScope for Stack {
    fn as_scope(&self) -> Scope {
        Scope {
            stack: Rc::downgrade(&self.inner),
            path: ConstructPath::root(),
        }
    }
}

impl AsScope for Scope {
    fn as_scope(&self) -> Scope {
        self.clone()
    }
}
