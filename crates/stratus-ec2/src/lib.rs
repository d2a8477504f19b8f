//! Stratus EC2
//!
//! Network-level constructs: VPCs with a public/private subnet split and
//! security groups.
//!
//! # Core Concepts
//!
//! - [`Vpc`]: Network with two public and two private subnets
//! - [`SubnetType`]: Side of the subnet split workloads are placed in
//! - [`SecurityGroup`]: Stateful firewall with an allow-all egress default

// Core modules
mod security_group;
mod vpc;

// Re-exports
pub use security_group::{EgressRule, SecurityGroup, SecurityGroupProps};
pub use vpc::{Subnet, SubnetType, Vpc, VpcProps};
