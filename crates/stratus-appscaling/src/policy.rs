//! Scaling policy constructs
//!
//! Two policy families hang off a scalable target: target tracking (hold a
//! metric at a set value) and step scaling (apply capacity deltas per
//! metric interval). Policies are declared through the
//! [`ScalableTarget`](crate::ScalableTarget) methods and render as
//! `AWS::ApplicationAutoScaling::ScalingPolicy` resources.

use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use stratus_core::{
    Construct, ConstructPath, Expr, LogicalId, Metric, NodeSink, ResourceNode, Scope, SynthError,
};

/// Metrics the engine can track without a full metric description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredefinedMetric {
    /// Average CPU utilization across a service's tasks
    EcsServiceAverageCpuUtilization,
    /// Average memory utilization across a service's tasks
    EcsServiceAverageMemoryUtilization,
    /// Request count per load-balancer target
    AlbRequestCountPerTarget,
}

impl PredefinedMetric {
    /// Metric type string in rendered policies
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EcsServiceAverageCpuUtilization => "ECSServiceAverageCPUUtilization",
            Self::EcsServiceAverageMemoryUtilization => "ECSServiceAverageMemoryUtilization",
            Self::AlbRequestCountPerTarget => "ALBRequestCountPerTarget",
        }
    }
}

/// Options for target tracking policies
///
/// Exactly one metric source must be set: a predefined metric (optionally
/// narrowed by a resource label) or a custom metric description.
pub struct TargetTrackingProps {
    /// Value the tracked metric is held at
    pub target_value: f64,
    /// Predefined metric to track
    pub predefined_metric: Option<PredefinedMetric>,
    /// Narrows a predefined metric to one resource, e.g. a target group
    pub resource_label: Option<Expr>,
    /// Custom metric to track
    pub custom_metric: Option<Metric>,
    /// Cooldown between scale-in activities
    pub scale_in_cooldown: Option<Duration>,
    /// Cooldown between scale-out activities
    pub scale_out_cooldown: Option<Duration>,
}

impl TargetTrackingProps {
    /// Track a predefined metric at `target_value`
    #[must_use]
    pub fn predefined(metric: PredefinedMetric, target_value: f64) -> Self {
        Self {
            target_value,
            predefined_metric: Some(metric),
            resource_label: None,
            custom_metric: None,
            scale_in_cooldown: None,
            scale_out_cooldown: None,
        }
    }

    /// Track a custom metric at `target_value`
    #[must_use]
    pub fn custom(metric: Metric, target_value: f64) -> Self {
        Self {
            target_value,
            predefined_metric: None,
            resource_label: None,
            custom_metric: Some(metric),
            scale_in_cooldown: None,
            scale_out_cooldown: None,
        }
    }

    fn validate(&self, path: &ConstructPath) -> Result<(), SynthError> {
        match (&self.predefined_metric, &self.custom_metric) {
            (None, None) | (Some(_), Some(_)) => Err(SynthError::configuration(
                path,
                "exactly one of predefined metric or custom metric must be set",
            )),
            _ => {
                if self.resource_label.is_some() && self.predefined_metric.is_none() {
                    return Err(SynthError::configuration(
                        path,
                        "a resource label only applies to a predefined metric",
                    ));
                }
                Ok(())
            }
        }
    }
}

/// How a step adjustment changes capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdjustmentType {
    /// Add the adjustment to current capacity
    ChangeInCapacity,
    /// Add a percentage of current capacity
    PercentChangeInCapacity,
    /// Replace current capacity with the adjustment
    ExactCapacity,
}

impl AdjustmentType {
    /// Adjustment type string in rendered policies
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChangeInCapacity => "ChangeInCapacity",
            Self::PercentChangeInCapacity => "PercentChangeInCapacity",
            Self::ExactCapacity => "ExactCapacity",
        }
    }
}

/// One interval of a step scaling policy
///
/// Intervals with an upper bound feed the scale-in policy, intervals with
/// only a lower bound feed the scale-out policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingInterval {
    /// Metric value the interval starts at
    pub lower: Option<f64>,
    /// Metric value the interval ends at
    pub upper: Option<f64>,
    /// Capacity adjustment applied inside the interval
    pub change: i64,
}

/// Options for step scaling policies
pub struct StepScalingProps {
    /// Metric the steps respond to
    pub metric: Metric,
    /// Intervals and their capacity adjustments
    pub scaling_steps: Vec<ScalingInterval>,
    /// Adjustment semantics, `ChangeInCapacity` by default
    pub adjustment_type: Option<AdjustmentType>,
    /// Cooldown between scaling activities
    pub cooldown: Option<Duration>,
}

impl StepScalingProps {
    /// Step policy over `metric` with the given intervals
    #[must_use]
    pub fn new(metric: Metric, scaling_steps: Vec<ScalingInterval>) -> Self {
        Self {
            metric,
            scaling_steps,
            adjustment_type: None,
            cooldown: None,
        }
    }
}

/// Render a number the way the engine expects: integral values without a
/// fraction part.
pub(crate) fn number_expr(value: f64) -> Expr {
    #[allow(clippy::cast_possible_truncation)]
    if value.fract() == 0.0 && value.abs() < 9e15 {
        Expr::from(value as i64)
    } else {
        Expr::from(value)
    }
}

struct TargetTrackingPolicy {
    scope: Scope,
    target_path: ConstructPath,
    props: TargetTrackingProps,
}

pub(crate) fn declare_target_tracking(
    parent: &Scope,
    target_path: ConstructPath,
    id: &str,
    props: TargetTrackingProps,
) -> Result<(), SynthError> {
    let scope = parent.child(id)?;
    props.validate(scope.path())?;
    tracing::debug!(policy = %scope.path(), "target tracking policy declared");
    let policy = TargetTrackingPolicy {
        target_path,
        props,
        scope: scope.clone(),
    };
    scope.stack()?.register(Rc::new(policy));
    Ok(())
}

impl Construct for TargetTrackingPolicy {
    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let mut config = IndexMap::new();
        if let Some(metric) = &self.props.custom_metric {
            let mut spec = IndexMap::new();
            if !metric.dimensions().is_empty() {
                let dimensions = metric
                    .dimensions()
                    .iter()
                    .map(|(name, value)| {
                        let mut pair = IndexMap::new();
                        pair.insert("Name".to_owned(), Expr::from(name.clone()));
                        pair.insert("Value".to_owned(), value.clone());
                        Expr::map(pair)
                    })
                    .collect();
                spec.insert("Dimensions".to_owned(), Expr::list(dimensions));
            }
            spec.insert("MetricName".to_owned(), Expr::from(metric.metric_name()));
            spec.insert("Namespace".to_owned(), Expr::from(metric.namespace()));
            spec.insert("Statistic".to_owned(), Expr::from(metric.statistic()));
            config.insert("CustomizedMetricSpecification".to_owned(), Expr::map(spec));
        }
        if let Some(predefined) = self.props.predefined_metric {
            let mut spec = IndexMap::new();
            spec.insert(
                "PredefinedMetricType".to_owned(),
                Expr::from(predefined.as_str()),
            );
            if let Some(label) = &self.props.resource_label {
                spec.insert("ResourceLabel".to_owned(), label.clone());
            }
            config.insert("PredefinedMetricSpecification".to_owned(), Expr::map(spec));
        }
        if let Some(cooldown) = self.props.scale_in_cooldown {
            config.insert("ScaleInCooldown".to_owned(), Expr::from(cooldown.as_secs()));
        }
        if let Some(cooldown) = self.props.scale_out_cooldown {
            config.insert("ScaleOutCooldown".to_owned(), Expr::from(cooldown.as_secs()));
        }
        config.insert("TargetValue".to_owned(), number_expr(self.props.target_value));

        nodes.emit(
            ResourceNode::new(
                self.scope.path().clone(),
                "AWS::ApplicationAutoScaling::ScalingPolicy",
            )
            .with_property(
                "PolicyName",
                LogicalId::from_path(self.scope.path()).into_string(),
            )
            .with_property("PolicyType", "TargetTrackingScaling")
            .with_property("ScalingTargetId", Expr::ref_to(self.target_path.clone()))
            .with_property("TargetTrackingScalingPolicyConfiguration", Expr::map(config)),
        );
        Ok(())
    }
}

struct StepScalingPolicy {
    scope: Scope,
    target_path: ConstructPath,
    adjustment_type: AdjustmentType,
    aggregation: &'static str,
    cooldown: Option<Duration>,
    adjustments: Vec<ScalingInterval>,
}

impl StepScalingPolicy {
    fn adjustment_expr(interval: ScalingInterval) -> Expr {
        let mut entry = IndexMap::new();
        if let Some(lower) = interval.lower {
            entry.insert("MetricIntervalLowerBound".to_owned(), number_expr(lower));
        }
        if let Some(upper) = interval.upper {
            entry.insert("MetricIntervalUpperBound".to_owned(), number_expr(upper));
        }
        entry.insert("ScalingAdjustment".to_owned(), Expr::from(interval.change));
        Expr::map(entry)
    }
}

impl Construct for StepScalingPolicy {
    fn scope(&self) -> &Scope {
        &self.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let mut config = IndexMap::new();
        config.insert(
            "AdjustmentType".to_owned(),
            Expr::from(self.adjustment_type.as_str()),
        );
        if let Some(cooldown) = self.cooldown {
            config.insert("Cooldown".to_owned(), Expr::from(cooldown.as_secs()));
        }
        config.insert(
            "MetricAggregationType".to_owned(),
            Expr::from(self.aggregation),
        );
        config.insert(
            "StepAdjustments".to_owned(),
            Expr::list(
                self.adjustments
                    .iter()
                    .copied()
                    .map(Self::adjustment_expr)
                    .collect(),
            ),
        );

        nodes.emit(
            ResourceNode::new(
                self.scope.path().clone(),
                "AWS::ApplicationAutoScaling::ScalingPolicy",
            )
            .with_property(
                "PolicyName",
                LogicalId::from_path(self.scope.path()).into_string(),
            )
            .with_property("PolicyType", "StepScaling")
            .with_property("ScalingTargetId", Expr::ref_to(self.target_path.clone()))
            .with_property("StepScalingPolicyConfiguration", Expr::map(config)),
        );
        Ok(())
    }
}

pub(crate) fn declare_step_scaling(
    parent: &Scope,
    target_path: ConstructPath,
    id: &str,
    props: StepScalingProps,
) -> Result<(), SynthError> {
    let intended = parent.path().child(id);
    if props.scaling_steps.is_empty() {
        return Err(SynthError::configuration(
            &intended,
            "at least one scaling step is required",
        ));
    }
    if props
        .scaling_steps
        .iter()
        .any(|step| step.lower.is_none() && step.upper.is_none())
    {
        return Err(SynthError::configuration(
            &intended,
            "every scaling step needs a lower or upper bound",
        ));
    }

    let aggregation = match props.metric.statistic() {
        "Minimum" => "Minimum",
        "Maximum" => "Maximum",
        _ => "Average",
    };
    let adjustment_type = props.adjustment_type.unwrap_or(AdjustmentType::ChangeInCapacity);
    let (scale_in, scale_out): (Vec<ScalingInterval>, Vec<ScalingInterval>) = props
        .scaling_steps
        .iter()
        .copied()
        .partition(|step| step.upper.is_some());

    if !scale_in.is_empty() {
        let scope = parent.child(&format!("{id}LowerPolicy"))?;
        let policy = StepScalingPolicy {
            target_path: target_path.clone(),
            adjustment_type,
            aggregation,
            cooldown: props.cooldown,
            adjustments: scale_in,
            scope: scope.clone(),
        };
        scope.stack()?.register(Rc::new(policy));
    }
    if !scale_out.is_empty() {
        let scope = parent.child(&format!("{id}UpperPolicy"))?;
        let policy = StepScalingPolicy {
            target_path,
            adjustment_type,
            aggregation,
            cooldown: props.cooldown,
            adjustments: scale_out,
            scope: scope.clone(),
        };
        scope.stack()?.register(Rc::new(policy));
    }
    Ok(())
}
