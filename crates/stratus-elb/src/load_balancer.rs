//! Application load balancer construct

use std::rc::Rc;

use stratus_core::{
    AsScope, Construct, ConstructPath, Expr, NodeSink, ResourceNode, Scope, SynthError,
};
use stratus_ec2::{SubnetType, Vpc};

use crate::listener::{ApplicationListener, ApplicationListenerProps};

/// Options for [`ApplicationLoadBalancer::new`]
#[derive(Clone)]
pub struct ApplicationLoadBalancerProps {
    /// Network the balancer is placed in
    pub vpc: Vpc,
    /// Whether the balancer accepts traffic from the public internet
    pub internet_facing: bool,
}

impl ApplicationLoadBalancerProps {
    /// Props with defaults: internal balancer
    #[must_use]
    pub fn new(vpc: &Vpc) -> Self {
        Self {
            vpc: vpc.clone(),
            internet_facing: false,
        }
    }
}

struct LoadBalancerInner {
    scope: Scope,
    vpc: Vpc,
    internet_facing: bool,
}

/// Layer-7 load balancer that listeners attach to
#[derive(Clone)]
pub struct ApplicationLoadBalancer {
    inner: Rc<LoadBalancerInner>,
}

impl ApplicationLoadBalancer {
    /// Declare a load balancer under `scope`
    ///
    /// # Errors
    /// Returns an error when the id is taken or malformed
    pub fn new(
        scope: &impl AsScope,
        id: &str,
        props: ApplicationLoadBalancerProps,
    ) -> Result<Self, SynthError> {
        let scope = scope.as_scope().child(id)?;
        let balancer = Self {
            inner: Rc::new(LoadBalancerInner {
                vpc: props.vpc,
                internet_facing: props.internet_facing,
                scope: scope.clone(),
            }),
        };
        scope.stack()?.register(Rc::new(balancer.clone()));
        Ok(balancer)
    }

    /// Path of the load balancer construct
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Deferred load balancer ARN
    #[must_use]
    pub fn arn(&self) -> Expr {
        Expr::ref_to(self.path().clone())
    }

    /// Network the balancer is placed in
    #[must_use]
    pub fn vpc(&self) -> &Vpc {
        &self.inner.vpc
    }

    /// Add a listener on `port`
    ///
    /// # Errors
    /// Returns an error when the listener id is taken or malformed
    pub fn add_listener(
        &self,
        id: &str,
        props: ApplicationListenerProps,
    ) -> Result<ApplicationListener, SynthError> {
        ApplicationListener::new(self, id, props)
    }
}

impl Construct for ApplicationLoadBalancer {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let subnet_type = if self.inner.internet_facing {
            SubnetType::Public
        } else {
            SubnetType::Private
        };
        let scheme = if self.inner.internet_facing {
            "internet-facing"
        } else {
            "internal"
        };
        nodes.emit(
            ResourceNode::new(
                self.path().clone(),
                "AWS::ElasticLoadBalancingV2::LoadBalancer",
            )
            .with_property("Scheme", scheme)
            .with_property(
                "Subnets",
                Expr::list(self.inner.vpc.subnet_ids(subnet_type)),
            )
            .with_property("Type", "application"),
        );
        Ok(())
    }
}
