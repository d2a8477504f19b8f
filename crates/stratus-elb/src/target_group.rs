//! Target group construct and the target capability

use std::rc::Rc;

use stratus_core::{
    Construct, ConstructPath, Expr, NodeSink, ResourceNode, Scope, SynthError,
};
use stratus_ec2::Vpc;

use crate::listener::ApplicationListener;

/// Workloads that can register with an application target group
///
/// Implementors wire themselves into the group (and remember the
/// attachment) when added via
/// [`ApplicationListener::add_targets`]. Attaching the same workload to the
/// same group twice is a no-op.
pub trait LoadBalancerTarget {
    /// Wire this workload into `target_group`
    ///
    /// # Errors
    /// Returns an error when the workload cannot serve traffic, e.g. no
    /// container with a port mapping
    fn attach_to_application_target_group(
        &self,
        target_group: &ApplicationTargetGroup,
    ) -> Result<(), SynthError>;
}

/// Options for [`ApplicationListener::add_targets`]
pub struct AddTargetsProps<'a> {
    /// Port traffic is forwarded to
    pub port: u16,
    /// Workloads to register with the group
    pub targets: Vec<&'a dyn LoadBalancerTarget>,
}

struct TargetGroupInner {
    scope: Scope,
    listener: ApplicationListener,
    vpc: Vpc,
    port: u16,
}

/// Group of workload endpoints a listener forwards traffic to
#[derive(Clone)]
pub struct ApplicationTargetGroup {
    inner: Rc<TargetGroupInner>,
}

impl ApplicationTargetGroup {
    pub(crate) fn new(
        listener: &ApplicationListener,
        id: &str,
        port: u16,
    ) -> Result<Self, SynthError> {
        let scope = listener.scope().child(id)?;
        let group = Self {
            inner: Rc::new(TargetGroupInner {
                listener: listener.clone(),
                vpc: listener.load_balancer().vpc().clone(),
                port,
                scope: scope.clone(),
            }),
        };
        scope.stack()?.register(Rc::new(group.clone()));
        Ok(group)
    }

    /// Path of the target group construct
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Deferred target group ARN
    #[must_use]
    pub fn arn(&self) -> Expr {
        Expr::ref_to(self.path().clone())
    }

    /// Port traffic is forwarded to
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Deferred full name of the group, e.g.
    /// `targetgroup/EcsTG/16e15d5e5526599a`
    #[must_use]
    pub fn full_name(&self) -> Expr {
        Expr::get_att(self.path().clone(), "TargetGroupFullName")
    }

    /// Deferred full name of the owning load balancer
    ///
    /// Carved out of the listener ARN, whose resource part reads
    /// `listener/app/my-lb/50dc6c495c0c9188/f2f7dc8efc522ab2`: segments 1
    /// to 3 of the `/`-split are the balancer's full name.
    #[must_use]
    pub fn load_balancer_full_name(&self) -> Expr {
        let split = Expr::split("/", self.inner.listener.arn());
        Expr::join(
            "",
            vec![
                Expr::select(1, split.clone()),
                "/".into(),
                Expr::select(2, split.clone()),
                "/".into(),
                Expr::select(3, split),
            ],
        )
    }
}

impl Construct for ApplicationTargetGroup {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        nodes.emit(
            ResourceNode::new(
                self.path().clone(),
                "AWS::ElasticLoadBalancingV2::TargetGroup",
            )
            .with_property("Port", u32::from(self.inner.port))
            .with_property("Protocol", "HTTP")
            .with_property("TargetType", "ip")
            .with_property("VpcId", self.inner.vpc.vpc_id()),
        );
        Ok(())
    }
}
