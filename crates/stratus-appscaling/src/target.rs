//! Scalable targets
//!
//! A [`ScalableTarget`] registers a resource dimension with the scaling
//! engine and carries the capacity range scaling may move within. Policies
//! and scheduled actions attach to it afterwards.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use stratus_core::{
    AsScope, Construct, ConstructPath, Expr, NodeSink, ResourceNode, Scope, SynthError,
};

use crate::policy::{self, StepScalingProps, TargetTrackingProps};
use crate::schedule::Schedule;

/// Service namespace a scalable dimension belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceNamespace {
    /// Container service dimensions, e.g. desired task count
    Ecs,
}

impl ServiceNamespace {
    /// Namespace string in rendered targets
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ecs => "ecs",
        }
    }
}

/// Options for [`ScalableTarget::new`]
pub struct ScalableTargetProps {
    /// Namespace of the scalable dimension
    pub service_namespace: ServiceNamespace,
    /// Dimension being scaled, e.g. `ecs:service:DesiredCount`
    pub scalable_dimension: String,
    /// Identifier of the resource the dimension belongs to
    pub resource_id: Expr,
    /// Capacity the target never scales below
    pub min_capacity: u32,
    /// Capacity the target never scales above
    pub max_capacity: u32,
}

/// Capacity change applied on a schedule
pub struct ScalingSchedule {
    /// When the action fires
    pub schedule: Schedule,
    /// New minimum capacity, if the action raises the floor
    pub min_capacity: Option<u32>,
    /// New maximum capacity, if the action lowers the ceiling
    pub max_capacity: Option<u32>,
}

struct ScheduledAction {
    name: String,
    schedule: Schedule,
    min_capacity: Option<u32>,
    max_capacity: Option<u32>,
}

struct ScalableTargetInner {
    scope: Scope,
    namespace: ServiceNamespace,
    dimension: String,
    resource_id: Expr,
    min_capacity: u32,
    max_capacity: u32,
    scheduled: RefCell<Vec<ScheduledAction>>,
}

/// A resource dimension registered with the scaling engine
#[derive(Clone)]
pub struct ScalableTarget {
    inner: Rc<ScalableTargetInner>,
}

impl ScalableTarget {
    /// Registers a new scalable target under `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or taken, or when the
    /// capacity range is inverted.
    pub fn new(
        scope: &impl AsScope,
        id: &str,
        props: ScalableTargetProps,
    ) -> Result<Self, SynthError> {
        let scope = scope.as_scope().child(id)?;
        if props.min_capacity > props.max_capacity {
            return Err(SynthError::configuration(
                scope.path(),
                format!(
                    "minimum capacity ({}) exceeds maximum capacity ({})",
                    props.min_capacity, props.max_capacity
                ),
            ));
        }
        tracing::debug!(target = %scope.path(), dimension = %props.scalable_dimension, "scalable target declared");
        let target = Self {
            inner: Rc::new(ScalableTargetInner {
                namespace: props.service_namespace,
                dimension: props.scalable_dimension,
                resource_id: props.resource_id,
                min_capacity: props.min_capacity,
                max_capacity: props.max_capacity,
                scheduled: RefCell::new(Vec::new()),
                scope,
            }),
        };
        target.inner.scope.stack()?.register(Rc::new(target.clone()));
        Ok(target)
    }

    /// Path of this target in the scope tree
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Reference to this target's identifier
    #[inline]
    #[must_use]
    pub fn target_id(&self) -> Expr {
        Expr::ref_to(self.path().clone())
    }

    /// Adjusts the capacity range on a schedule.
    ///
    /// # Errors
    ///
    /// Returns an error when the action sets neither bound or reuses a
    /// previous action name.
    pub fn scale_on_schedule(&self, id: &str, action: ScalingSchedule) -> Result<(), SynthError> {
        if action.min_capacity.is_none() && action.max_capacity.is_none() {
            return Err(SynthError::configuration(
                self.path(),
                format!("scheduled action '{id}' needs a minimum or maximum capacity"),
            ));
        }
        let mut scheduled = self.inner.scheduled.borrow_mut();
        if scheduled.iter().any(|existing| existing.name == id) {
            return Err(SynthError::configuration(
                self.path(),
                format!("scheduled action '{id}' already exists"),
            ));
        }
        tracing::debug!(target = %self.path(), action = id, "scheduled action added");
        scheduled.push(ScheduledAction {
            name: id.to_owned(),
            schedule: action.schedule,
            min_capacity: action.min_capacity,
            max_capacity: action.max_capacity,
        });
        Ok(())
    }

    /// Holds a metric at a target value by adjusting capacity.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or taken, or when the
    /// policy options name zero or two metric sources.
    pub fn scale_to_track_metric(
        &self,
        id: &str,
        props: TargetTrackingProps,
    ) -> Result<(), SynthError> {
        policy::declare_target_tracking(&self.inner.scope, self.path().clone(), id, props)
    }

    /// Applies stepped capacity changes driven by a metric.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or taken, or when the step
    /// intervals are empty or unbounded.
    pub fn scale_on_metric(&self, id: &str, props: StepScalingProps) -> Result<(), SynthError> {
        policy::declare_step_scaling(&self.inner.scope, self.path().clone(), id, props)
    }

    fn scheduled_actions_expr(&self) -> Option<Expr> {
        let scheduled = self.inner.scheduled.borrow();
        if scheduled.is_empty() {
            return None;
        }
        let actions = scheduled
            .iter()
            .map(|action| {
                let mut bounds = IndexMap::new();
                if let Some(max) = action.max_capacity {
                    bounds.insert("MaxCapacity".to_owned(), Expr::from(max));
                }
                if let Some(min) = action.min_capacity {
                    bounds.insert("MinCapacity".to_owned(), Expr::from(min));
                }
                let mut entry = IndexMap::new();
                entry.insert("ScalableTargetAction".to_owned(), Expr::map(bounds));
                entry.insert("Schedule".to_owned(), Expr::from(action.schedule.as_str()));
                entry.insert("ScheduledActionName".to_owned(), Expr::from(action.name.clone()));
                Expr::map(entry)
            })
            .collect();
        Some(Expr::list(actions))
    }
}

impl Construct for ScalableTarget {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let mut node = ResourceNode::new(
            self.path().clone(),
            "AWS::ApplicationAutoScaling::ScalableTarget",
        )
        .with_property("MaxCapacity", self.inner.max_capacity)
        .with_property("MinCapacity", self.inner.min_capacity)
        .with_property("ResourceId", self.inner.resource_id.clone())
        .with_property("ScalableDimension", self.inner.dimension.clone())
        .with_property("ServiceNamespace", self.inner.namespace.as_str());
        node.set_optional("ScheduledActions", self.scheduled_actions_expr());
        nodes.emit(node);
        Ok(())
    }
}
