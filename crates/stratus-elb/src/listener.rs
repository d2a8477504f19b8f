//! Listener construct

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use stratus_core::{
    Construct, ConstructPath, Expr, NodeSink, ResourceNode, Scope, Stack, SynthError,
};

use crate::load_balancer::ApplicationLoadBalancer;
use crate::target_group::{AddTargetsProps, ApplicationTargetGroup};

/// Options for [`ApplicationLoadBalancer::add_listener`]
#[derive(Debug, Clone, Copy)]
pub struct ApplicationListenerProps {
    /// Port the listener accepts traffic on
    pub port: u16,
}

struct ListenerInner {
    scope: Scope,
    load_balancer: ApplicationLoadBalancer,
    port: u16,
    default_target_group: RefCell<Option<ConstructPath>>,
}

/// Port binding on a load balancer, forwarding to a target group
///
/// A listener is unusable until [`ApplicationListener::add_targets`] gives
/// it a default target group; synthesis rejects a listener without one.
#[derive(Clone)]
pub struct ApplicationListener {
    inner: Rc<ListenerInner>,
}

impl ApplicationListener {
    pub(crate) fn new(
        load_balancer: &ApplicationLoadBalancer,
        id: &str,
        props: ApplicationListenerProps,
    ) -> Result<Self, SynthError> {
        let scope = load_balancer.scope().child(id)?;
        let listener = Self {
            inner: Rc::new(ListenerInner {
                load_balancer: load_balancer.clone(),
                port: props.port,
                default_target_group: RefCell::new(None),
                scope: scope.clone(),
            }),
        };
        scope.stack()?.register(Rc::new(listener.clone()));
        Ok(listener)
    }

    /// Path of the listener construct
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Deferred listener ARN
    #[must_use]
    pub fn arn(&self) -> Expr {
        Expr::ref_to(self.path().clone())
    }

    /// Port the listener accepts traffic on
    #[must_use]
    pub fn port(&self) -> u16 {
        self.inner.port
    }

    /// Create a target group under this listener and register `targets`
    /// with it
    ///
    /// The first target group becomes the listener's default forward
    /// action.
    ///
    /// # Errors
    /// Returns an error when the id is taken or a target rejects the
    /// attachment
    pub fn add_targets(
        &self,
        id: &str,
        props: AddTargetsProps<'_>,
    ) -> Result<ApplicationTargetGroup, SynthError> {
        let group = ApplicationTargetGroup::new(self, &format!("{id}Group"), props.port)?;
        let mut default = self.inner.default_target_group.borrow_mut();
        if default.is_none() {
            *default = Some(group.path().clone());
            tracing::debug!(listener = %self.path(), group = %group.path(), "default forward action set");
        }
        drop(default);
        for target in props.targets {
            target.attach_to_application_target_group(&group)?;
        }
        Ok(group)
    }

    pub(crate) fn load_balancer(&self) -> &ApplicationLoadBalancer {
        &self.inner.load_balancer
    }
}

impl Construct for ApplicationListener {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn bind(&self, _stack: &Stack) -> Result<(), SynthError> {
        if self.inner.default_target_group.borrow().is_none() {
            return Err(SynthError::configuration(
                self.path(),
                "listener has no default target group, add targets first",
            ));
        }
        Ok(())
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let default = self
            .inner
            .default_target_group
            .borrow()
            .clone()
            .ok_or_else(|| {
                SynthError::configuration(
                    self.path(),
                    "listener has no default target group, add targets first",
                )
            })?;
        let mut action = IndexMap::new();
        action.insert("TargetGroupArn".to_owned(), Expr::ref_to(default));
        action.insert("Type".to_owned(), Expr::from("forward"));
        let protocol = if self.inner.port == 443 { "HTTPS" } else { "HTTP" };
        nodes.emit(
            ResourceNode::new(
                self.path().clone(),
                "AWS::ElasticLoadBalancingV2::Listener",
            )
            .with_property("DefaultActions", Expr::list(vec![Expr::map(action)]))
            .with_property("LoadBalancerArn", self.inner.load_balancer.arn())
            .with_property("Port", u32::from(self.inner.port))
            .with_property("Protocol", protocol),
        );
        Ok(())
    }
}
