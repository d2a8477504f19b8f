//! Container service clusters
//!
//! A [`Cluster`] anchors services to a network and optionally carries the
//! default service discovery namespace they register into.

use std::cell::RefCell;
use std::rc::Rc;

use stratus_core::{
    AsScope, Construct, ConstructPath, Expr, NodeSink, ResourceNode, Scope, SynthError,
};
use stratus_ec2::Vpc;

use crate::cloudmap::{CloudMapNamespace, CloudMapNamespaceProps};

/// Options for [`Cluster::new`]
pub struct ClusterProps {
    /// Network the cluster's services run in
    pub vpc: Vpc,
}

impl ClusterProps {
    /// Cluster options over `vpc`
    #[inline]
    #[must_use]
    pub fn new(vpc: &Vpc) -> Self {
        Self { vpc: vpc.clone() }
    }
}

struct ClusterInner {
    scope: Scope,
    vpc: Vpc,
    namespace: RefCell<Option<CloudMapNamespace>>,
}

/// A cluster services are placed into
#[derive(Clone)]
pub struct Cluster {
    inner: Rc<ClusterInner>,
}

impl Cluster {
    /// Registers a new cluster under `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or already taken, or when
    /// the scope is detached from its stack.
    pub fn new(scope: &impl AsScope, id: &str, props: ClusterProps) -> Result<Self, SynthError> {
        let scope = scope.as_scope().child(id)?;
        tracing::debug!(cluster = %scope.path(), "cluster declared");
        let cluster = Self {
            inner: Rc::new(ClusterInner {
                vpc: props.vpc,
                namespace: RefCell::new(None),
                scope,
            }),
        };
        cluster.inner.scope.stack()?.register(Rc::new(cluster.clone()));
        Ok(cluster)
    }

    /// Path of this cluster in the scope tree
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Network the cluster's services run in
    #[inline]
    #[must_use]
    pub fn vpc(&self) -> &Vpc {
        &self.inner.vpc
    }

    /// Deferred name of the cluster
    #[inline]
    #[must_use]
    pub fn cluster_name(&self) -> Expr {
        Expr::ref_to(self.path().clone())
    }

    /// Creates the namespace services discover each other through.
    ///
    /// # Errors
    ///
    /// Returns an error when a default namespace already exists.
    pub fn add_default_cloud_map_namespace(
        &self,
        props: CloudMapNamespaceProps,
    ) -> Result<CloudMapNamespace, SynthError> {
        let mut namespace = self.inner.namespace.borrow_mut();
        if namespace.is_some() {
            return Err(SynthError::configuration(
                self.path(),
                "Can only add default namespace once.",
            ));
        }
        let created = CloudMapNamespace::new(
            &self.inner.scope,
            "DefaultServiceDiscoveryNamespace",
            props,
            self.inner.vpc.clone(),
        )?;
        *namespace = Some(created.clone());
        Ok(created)
    }

    /// Namespace created by [`Cluster::add_default_cloud_map_namespace`]
    #[must_use]
    pub fn default_cloud_map_namespace(&self) -> Option<CloudMapNamespace> {
        self.inner.namespace.borrow().clone()
    }
}

impl Construct for Cluster {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        nodes.emit(ResourceNode::new(self.path().clone(), "AWS::ECS::Cluster"));
        Ok(())
    }
}
