//! Stratus ECS
//!
//! Container service constructs over the Stratus core: clusters, task
//! definitions with their containers and roles, Fargate services with
//! networking, discovery and load balancer attachment, and task count
//! scaling on top of the application auto scaling engine.
//!
//! # Core Concepts
//!
//! - [`Cluster`]: placement for services, optionally carrying a default
//!   service discovery namespace
//! - [`TaskDefinition`] / [`FargateTaskDefinition`]: the launch recipe,
//!   collecting containers, roles and sizing
//! - [`ContainerImage`]: a symbolic image source, bound to the task
//!   definition during synthesis
//! - [`FargateService`]: keeps tasks running, attaches to target groups
//!   and registers discovery entries
//! - [`ScalableTaskCount`]: the service's task count registered with the
//!   scaling engine
//!
//! ```rust,ignore
//! let stack = Stack::new();
//! let vpc = Vpc::new(&stack, "Vpc", VpcProps::default())?;
//! let cluster = Cluster::new(&stack, "Cluster", ClusterProps::new(&vpc))?;
//! let task_definition =
//!     FargateTaskDefinition::new(&stack, "TaskDef", FargateTaskDefinitionProps::default())?;
//! task_definition.add_container(
//!     "web",
//!     ContainerDefinitionProps::new(ContainerImage::from_registry("amazon/amazon-ecs-sample")),
//! )?;
//! let service = FargateService::new(
//!     &stack,
//!     "Service",
//!     FargateServiceProps::new(&cluster, &task_definition),
//! )?;
//! let template = stack.synth()?;
//! ```

mod cloudmap;
mod cluster;
mod container;
mod iam;
mod images;
mod repository;
mod scaling;
mod service;
mod task_definition;

pub use cloudmap::{
    CloudMapNamespace, CloudMapNamespaceProps, CloudMapOptions, DnsRecordType, NamespaceType,
};
pub use cluster::{Cluster, ClusterProps};
pub use container::{ContainerDefinition, ContainerDefinitionProps, PortMapping, Protocol};
pub use iam::{PolicyStatement, Role, RoleProps, ServicePrincipal};
pub use images::ContainerImage;
pub use repository::Repository;
pub use scaling::{
    Capacity, RequestCountScalingProps, ScalableTaskCount, TrackCustomMetricProps,
    UtilizationScalingProps,
};
pub use service::{FargateService, FargateServiceProps};
pub use task_definition::{
    Compatibility, FargateTaskDefinition, FargateTaskDefinitionProps, NetworkMode, TaskDefinition,
    TaskDefinitionProps,
};
