//! Fargate services
//!
//! A [`FargateService`] keeps a task definition running on a cluster. The
//! construct validates launch type compatibility up front, provisions a
//! security group when none is supplied, registers discovery entries and
//! accepts load balancer traffic through the
//! [`LoadBalancerTarget`] seam.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use stratus_core::{
    AsScope, BindKey, Construct, ConstructPath, Expr, Metric, NodeSink, ResourceNode, Scope,
    SynthError,
};
use stratus_ec2::{SecurityGroup, SecurityGroupProps, SubnetType};
use stratus_elb::{ApplicationTargetGroup, LoadBalancerTarget};

use crate::cloudmap::{CloudMapOptions, CloudMapService};
use crate::cluster::Cluster;
use crate::scaling::{Capacity, ScalableTaskCount};
use crate::task_definition::TaskDefinition;

const DEFAULT_DESIRED_COUNT: u32 = 1;
const DEFAULT_MAX_HEALTHY_PERCENT: u32 = 200;
const DEFAULT_MIN_HEALTHY_PERCENT: u32 = 50;
const LB_GRACE_PERIOD_SECONDS: u64 = 60;

/// Options for [`FargateService::new`]
pub struct FargateServiceProps {
    /// Cluster the service runs on
    pub cluster: Cluster,
    /// Task definition the service keeps running
    pub task_definition: TaskDefinition,
    /// Number of task copies, `1` when left out
    pub desired_count: Option<u32>,
    /// Whether tasks get public addresses
    pub assign_public_ip: bool,
    /// How long the scheduler ignores failing health checks after launch
    pub health_check_grace_period: Option<Duration>,
    /// Upper deployment bound in percent, `200` when left out
    pub max_healthy_percent: Option<u32>,
    /// Lower deployment bound in percent, `50` when left out
    pub min_healthy_percent: Option<u32>,
    /// Discovery entry registered in the cluster's namespace
    pub cloud_map_options: Option<CloudMapOptions>,
    /// Security group of the tasks, provisioned when left out
    pub security_group: Option<SecurityGroup>,
    /// Explicit service name
    pub service_name: Option<String>,
    /// Subnets the tasks are placed into, chosen by address visibility
    /// when left out
    pub vpc_subnets: Option<SubnetType>,
}

impl FargateServiceProps {
    /// Service options for `task_definition` on `cluster`
    #[must_use]
    pub fn new(cluster: &Cluster, task_definition: &TaskDefinition) -> Self {
        Self {
            cluster: cluster.clone(),
            task_definition: task_definition.clone(),
            desired_count: None,
            assign_public_ip: false,
            health_check_grace_period: None,
            max_healthy_percent: None,
            min_healthy_percent: None,
            cloud_map_options: None,
            security_group: None,
            service_name: None,
            vpc_subnets: None,
        }
    }
}

struct LoadBalancerAttachment {
    container_name: String,
    container_port: u16,
    target_group_arn: Expr,
}

struct FargateServiceInner {
    scope: Scope,
    cluster: Cluster,
    task_definition: TaskDefinition,
    desired_count: u32,
    assign_public_ip: bool,
    health_check_grace_period: Option<Duration>,
    max_healthy_percent: u32,
    min_healthy_percent: u32,
    service_name: Option<String>,
    subnet_selection: SubnetType,
    security_group: SecurityGroup,
    cloud_map_service: Option<CloudMapService>,
    load_balancers: RefCell<Vec<LoadBalancerAttachment>>,
    scalable_task_count: RefCell<Option<ScalableTaskCount>>,
}

/// A long running service keeping tasks alive on Fargate
#[derive(Clone)]
pub struct FargateService {
    inner: Rc<FargateServiceInner>,
}

impl fmt::Debug for FargateService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FargateService")
            .field("path", self.inner.scope.path())
            .finish_non_exhaustive()
    }
}

impl FargateService {
    /// Registers a new service under `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or taken, when the task
    /// definition cannot launch on Fargate or has no containers, or when
    /// discovery is requested on a cluster without a namespace.
    pub fn new(
        scope: &impl AsScope,
        id: &str,
        props: FargateServiceProps,
    ) -> Result<Self, SynthError> {
        let scope = scope.as_scope().child(id)?;
        if !props.task_definition.is_fargate_compatible() {
            return Err(SynthError::incompatible(
                scope.path(),
                "Supplied TaskDefinition is not configured for compatibility with Fargate",
            ));
        }
        if !props.task_definition.has_containers() {
            return Err(SynthError::configuration(
                scope.path(),
                "Supplied TaskDefinition has no containers",
            ));
        }

        let security_group = match props.security_group {
            Some(security_group) => security_group,
            None => SecurityGroup::new(
                &scope,
                "SecurityGroup",
                SecurityGroupProps::new(props.cluster.vpc()),
            )?,
        };

        let cloud_map_service = match props.cloud_map_options {
            Some(options) => {
                let Some(namespace) = props.cluster.default_cloud_map_namespace() else {
                    return Err(SynthError::missing_dependency(
                        scope.path(),
                        "Cannot enable service discovery if a Cloudmap Namespace has not been \
                         created in the cluster.",
                    ));
                };
                Some(CloudMapService::new(
                    &scope,
                    "CloudmapService",
                    &namespace,
                    options,
                )?)
            }
            None => None,
        };

        let subnet_selection = props.vpc_subnets.unwrap_or(if props.assign_public_ip {
            SubnetType::Public
        } else {
            SubnetType::Private
        });

        tracing::debug!(service = %scope.path(), "service declared");
        let service = Self {
            inner: Rc::new(FargateServiceInner {
                scope,
                cluster: props.cluster,
                task_definition: props.task_definition,
                desired_count: props.desired_count.unwrap_or(DEFAULT_DESIRED_COUNT),
                assign_public_ip: props.assign_public_ip,
                health_check_grace_period: props.health_check_grace_period,
                max_healthy_percent: props
                    .max_healthy_percent
                    .unwrap_or(DEFAULT_MAX_HEALTHY_PERCENT),
                min_healthy_percent: props
                    .min_healthy_percent
                    .unwrap_or(DEFAULT_MIN_HEALTHY_PERCENT),
                service_name: props.service_name,
                subnet_selection,
                security_group,
                cloud_map_service,
                load_balancers: RefCell::new(Vec::new()),
                scalable_task_count: RefCell::new(None),
            }),
        };
        service.inner.scope.stack()?.register(Rc::new(service.clone()));
        Ok(service)
    }

    /// Path of this service in the scope tree
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Cluster the service runs on
    #[inline]
    #[must_use]
    pub fn cluster(&self) -> &Cluster {
        &self.inner.cluster
    }

    /// Task definition the service keeps running
    #[inline]
    #[must_use]
    pub fn task_definition(&self) -> &TaskDefinition {
        &self.inner.task_definition
    }

    /// Security group the service's tasks run with
    #[inline]
    #[must_use]
    pub fn security_group(&self) -> &SecurityGroup {
        &self.inner.security_group
    }

    /// Deferred name of the service
    #[inline]
    #[must_use]
    pub fn service_name(&self) -> Expr {
        Expr::get_att(self.path().clone(), "Name")
    }

    /// Makes the task count scalable within `capacity`.
    ///
    /// # Errors
    ///
    /// Returns an error when scaling was already enabled for this service.
    pub fn auto_scale_task_count(&self, capacity: Capacity) -> Result<ScalableTaskCount, SynthError> {
        let mut scalable = self.inner.scalable_task_count.borrow_mut();
        if scalable.is_some() {
            return Err(SynthError::configuration(
                self.path(),
                "AutoScaling of task count already enabled for this service",
            ));
        }
        let resource_id = Expr::join(
            "",
            vec![
                "service/".into(),
                self.inner.cluster.cluster_name(),
                "/".into(),
                self.service_name(),
            ],
        );
        let created = ScalableTaskCount::new(&self.inner.scope, resource_id, capacity)?;
        *scalable = Some(created.clone());
        Ok(created)
    }

    /// CPU utilization of the service, averaged over five minutes
    #[must_use]
    pub fn metric_cpu_utilization(&self) -> Metric {
        self.metric("CPUUtilization")
    }

    /// Memory utilization of the service, averaged over five minutes
    #[must_use]
    pub fn metric_memory_utilization(&self) -> Metric {
        self.metric("MemoryUtilization")
    }

    fn metric(&self, metric_name: &str) -> Metric {
        Metric::new("AWS/ECS", metric_name)
            .with_dimension("ClusterName", self.inner.cluster.cluster_name())
            .with_dimension("ServiceName", self.service_name())
    }

    fn network_configuration(&self) -> Expr {
        let assign = if self.inner.assign_public_ip {
            "ENABLED"
        } else {
            "DISABLED"
        };
        let subnets = self
            .inner
            .cluster
            .vpc()
            .subnet_ids(self.inner.subnet_selection);
        let mut awsvpc = IndexMap::new();
        awsvpc.insert("AssignPublicIp".to_owned(), Expr::from(assign));
        awsvpc.insert(
            "SecurityGroups".to_owned(),
            Expr::list(vec![self.inner.security_group.group_id()]),
        );
        awsvpc.insert("Subnets".to_owned(), Expr::list(subnets));
        let mut network = IndexMap::new();
        network.insert("AwsvpcConfiguration".to_owned(), Expr::map(awsvpc));
        Expr::map(network)
    }
}

impl Construct for FargateService {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let mut deployment = IndexMap::new();
        deployment.insert(
            "MaximumPercent".to_owned(),
            Expr::from(self.inner.max_healthy_percent),
        );
        deployment.insert(
            "MinimumHealthyPercent".to_owned(),
            Expr::from(self.inner.min_healthy_percent),
        );

        let attachments = self.inner.load_balancers.borrow();
        let grace = match self.inner.health_check_grace_period {
            Some(period) => Some(period.as_secs()),
            None if !attachments.is_empty() => Some(LB_GRACE_PERIOD_SECONDS),
            None => None,
        };

        let mut node = ResourceNode::new(self.path().clone(), "AWS::ECS::Service")
            .with_property("Cluster", self.inner.cluster.cluster_name())
            .with_property("DeploymentConfiguration", Expr::map(deployment))
            .with_property("DesiredCount", self.inner.desired_count);
        node.set_optional("HealthCheckGracePeriodSeconds", grace);
        node.set_property("LaunchType", "FARGATE");
        if !attachments.is_empty() {
            let load_balancers = attachments
                .iter()
                .map(|attachment| {
                    let mut entry = IndexMap::new();
                    entry.insert(
                        "ContainerName".to_owned(),
                        Expr::from(attachment.container_name.clone()),
                    );
                    entry.insert(
                        "ContainerPort".to_owned(),
                        Expr::from(u32::from(attachment.container_port)),
                    );
                    entry.insert(
                        "TargetGroupArn".to_owned(),
                        attachment.target_group_arn.clone(),
                    );
                    Expr::map(entry)
                })
                .collect();
            node.set_property("LoadBalancers", Expr::list(load_balancers));
        }
        node.set_property("NetworkConfiguration", self.network_configuration());
        node.set_optional("ServiceName", self.inner.service_name.clone());
        if let Some(cloud_map) = &self.inner.cloud_map_service {
            let mut registry = IndexMap::new();
            registry.insert("RegistryArn".to_owned(), cloud_map.arn());
            node.set_property("ServiceRegistries", Expr::list(vec![Expr::map(registry)]));
        }
        node.set_property("TaskDefinition", self.inner.task_definition.arn());
        nodes.emit(node);
        Ok(())
    }
}

impl LoadBalancerTarget for FargateService {
    fn attach_to_application_target_group(
        &self,
        target_group: &ApplicationTargetGroup,
    ) -> Result<(), SynthError> {
        let stack = self.inner.scope.stack()?;
        let key = BindKey::new(
            self.path().clone(),
            target_group.path().clone(),
            "attach-target-group",
        );
        if stack.once(key) {
            let container = self.inner.task_definition.default_container().ok_or_else(|| {
                SynthError::configuration(
                    self.path(),
                    "task definition needs an essential container to receive traffic",
                )
            })?;
            let port_mapping = container.first_port_mapping().ok_or_else(|| {
                SynthError::configuration(
                    self.path(),
                    "the default container exposes no ports to route traffic to",
                )
            })?;
            tracing::debug!(service = %self.path(), target_group = %target_group.path(), "attached to target group");
            self.inner.load_balancers.borrow_mut().push(LoadBalancerAttachment {
                container_name: container.name().to_owned(),
                container_port: port_mapping.container_port,
                target_group_arn: target_group.arn(),
            });
        }
        Ok(())
    }
}
