//! Scalable task counts
//!
//! [`FargateService::auto_scale_task_count`] hands out a
//! [`ScalableTaskCount`], a task count flavored wrapper around the scaling
//! engine's target. The wrapper fixes the namespace and dimension and
//! offers the common service scaling patterns as one-liners.
//!
//! [`FargateService::auto_scale_task_count`]: crate::FargateService::auto_scale_task_count

use std::fmt;
use std::time::Duration;

use stratus_appscaling::{
    PredefinedMetric, ScalableTarget, ScalableTargetProps, ScalingSchedule, ServiceNamespace,
    StepScalingProps, TargetTrackingProps,
};
use stratus_core::{Expr, Metric, Scope, SynthError};
use stratus_elb::ApplicationTargetGroup;

const TASK_COUNT_DIMENSION: &str = "ecs:service:DesiredCount";

/// Task count range scaling may move within
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacity {
    /// Fewest tasks scaling may leave running
    pub min_capacity: u32,
    /// Most tasks scaling may start
    pub max_capacity: u32,
}

impl Capacity {
    /// Range from one task up to `max_capacity`
    #[inline]
    #[must_use]
    pub const fn up_to(max_capacity: u32) -> Self {
        Self {
            min_capacity: 1,
            max_capacity,
        }
    }
}

/// Options for utilization driven scaling
pub struct UtilizationScalingProps {
    /// Utilization percentage held by scaling
    pub target_utilization_percent: f64,
    /// Cooldown between scale-in activities
    pub scale_in_cooldown: Option<Duration>,
    /// Cooldown between scale-out activities
    pub scale_out_cooldown: Option<Duration>,
}

impl UtilizationScalingProps {
    /// Holds utilization at `target_utilization_percent`
    #[inline]
    #[must_use]
    pub const fn percent(target_utilization_percent: f64) -> Self {
        Self {
            target_utilization_percent,
            scale_in_cooldown: None,
            scale_out_cooldown: None,
        }
    }
}

/// Options for request count driven scaling
pub struct RequestCountScalingProps {
    /// Requests per target held by scaling
    pub requests_per_target: f64,
    /// Target group whose request count is tracked
    pub target_group: ApplicationTargetGroup,
}

/// Options for scaling on a caller supplied metric
pub struct TrackCustomMetricProps {
    /// Metric held at the target value
    pub metric: Metric,
    /// Value the metric is held at
    pub target_value: f64,
    /// Cooldown between scale-in activities
    pub scale_in_cooldown: Option<Duration>,
    /// Cooldown between scale-out activities
    pub scale_out_cooldown: Option<Duration>,
}

/// A service's task count registered with the scaling engine
#[derive(Clone)]
pub struct ScalableTaskCount {
    target: ScalableTarget,
}

impl fmt::Debug for ScalableTaskCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalableTaskCount")
            .field("path", self.target.path())
            .finish_non_exhaustive()
    }
}

impl ScalableTaskCount {
    pub(crate) fn new(
        parent: &Scope,
        resource_id: Expr,
        capacity: Capacity,
    ) -> Result<Self, SynthError> {
        let target = ScalableTarget::new(
            parent,
            "TaskCountTarget",
            ScalableTargetProps {
                service_namespace: ServiceNamespace::Ecs,
                scalable_dimension: TASK_COUNT_DIMENSION.to_owned(),
                resource_id,
                min_capacity: capacity.min_capacity,
                max_capacity: capacity.max_capacity,
            },
        )?;
        Ok(Self { target })
    }

    /// Adjusts the task count range on a schedule.
    ///
    /// # Errors
    ///
    /// Returns an error when the action sets neither bound or reuses a
    /// previous action name.
    pub fn scale_on_schedule(&self, id: &str, action: ScalingSchedule) -> Result<(), SynthError> {
        self.target.scale_on_schedule(id, action)
    }

    /// Holds average CPU utilization at a target percentage.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or already taken.
    pub fn scale_on_cpu_utilization(
        &self,
        id: &str,
        props: UtilizationScalingProps,
    ) -> Result<(), SynthError> {
        self.target.scale_to_track_metric(
            id,
            TargetTrackingProps {
                target_value: props.target_utilization_percent,
                predefined_metric: Some(PredefinedMetric::EcsServiceAverageCpuUtilization),
                resource_label: None,
                custom_metric: None,
                scale_in_cooldown: props.scale_in_cooldown,
                scale_out_cooldown: props.scale_out_cooldown,
            },
        )
    }

    /// Holds average memory utilization at a target percentage.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or already taken.
    pub fn scale_on_memory_utilization(
        &self,
        id: &str,
        props: UtilizationScalingProps,
    ) -> Result<(), SynthError> {
        self.target.scale_to_track_metric(
            id,
            TargetTrackingProps {
                target_value: props.target_utilization_percent,
                predefined_metric: Some(PredefinedMetric::EcsServiceAverageMemoryUtilization),
                resource_label: None,
                custom_metric: None,
                scale_in_cooldown: props.scale_in_cooldown,
                scale_out_cooldown: props.scale_out_cooldown,
            },
        )
    }

    /// Holds the request count per load balancer target at a target value.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or already taken.
    pub fn scale_on_request_count(
        &self,
        id: &str,
        props: RequestCountScalingProps,
    ) -> Result<(), SynthError> {
        let resource_label = Expr::join(
            "",
            vec![
                props.target_group.load_balancer_full_name(),
                "/".into(),
                props.target_group.full_name(),
            ],
        );
        self.target.scale_to_track_metric(
            id,
            TargetTrackingProps {
                target_value: props.requests_per_target,
                predefined_metric: Some(PredefinedMetric::AlbRequestCountPerTarget),
                resource_label: Some(resource_label),
                custom_metric: None,
                scale_in_cooldown: None,
                scale_out_cooldown: None,
            },
        )
    }

    /// Holds a caller supplied metric at a target value.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or already taken.
    pub fn scale_to_track_custom_metric(
        &self,
        id: &str,
        props: TrackCustomMetricProps,
    ) -> Result<(), SynthError> {
        self.target.scale_to_track_metric(
            id,
            TargetTrackingProps {
                target_value: props.target_value,
                predefined_metric: None,
                resource_label: None,
                custom_metric: Some(props.metric),
                scale_in_cooldown: props.scale_in_cooldown,
                scale_out_cooldown: props.scale_out_cooldown,
            },
        )
    }

    /// Applies stepped task count changes driven by a metric.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or taken, or when the step
    /// intervals are empty or unbounded.
    pub fn scale_on_metric(&self, id: &str, props: StepScalingProps) -> Result<(), SynthError> {
        self.target.scale_on_metric(id, props)
    }
}
