//! Stratus Application Auto Scaling
//!
//! Declarative capacity scaling for resources declared elsewhere in a
//! stack. A [`ScalableTarget`] names the resource dimension and capacity
//! range; [`TargetTrackingProps`] and [`StepScalingProps`] attach metric
//! driven policies to it and [`Schedule`] drives time based capacity
//! changes.
//!
//! ```rust,ignore
//! let target = ScalableTarget::new(&stack, "Scaling", ScalableTargetProps {
//!     service_namespace: ServiceNamespace::Ecs,
//!     scalable_dimension: "ecs:service:DesiredCount".to_owned(),
//!     resource_id: service_resource_id,
//!     min_capacity: 1,
//!     max_capacity: 10,
//! })?;
//! target.scale_to_track_metric(
//!     "CpuScaling",
//!     TargetTrackingProps::predefined(PredefinedMetric::EcsServiceAverageCpuUtilization, 50.0),
//! )?;
//! ```

mod policy;
mod schedule;
mod target;

pub use policy::{
    AdjustmentType, PredefinedMetric, ScalingInterval, StepScalingProps, TargetTrackingProps,
};
pub use schedule::{CronOptions, Schedule};
pub use target::{ScalableTarget, ScalableTargetProps, ScalingSchedule, ServiceNamespace};
