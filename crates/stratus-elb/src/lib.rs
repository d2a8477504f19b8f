//! Stratus ELB
//!
//! Application load balancing constructs: the balancer itself, port
//! listeners and the target groups workloads register with.
//!
//! # Core Concepts
//!
//! - [`ApplicationLoadBalancer`]: Layer-7 balancer placed in a VPC
//! - [`ApplicationListener`]: Port binding, forwarding to a target group
//! - [`ApplicationTargetGroup`]: Endpoint group with deferred name attributes
//! - [`LoadBalancerTarget`]: Capability workloads implement to register

// Core modules
mod listener;
mod load_balancer;
mod target_group;

// Re-exports
pub use listener::{ApplicationListener, ApplicationListenerProps};
pub use load_balancer::{ApplicationLoadBalancer, ApplicationLoadBalancerProps};
pub use target_group::{AddTargetsProps, ApplicationTargetGroup, LoadBalancerTarget};
