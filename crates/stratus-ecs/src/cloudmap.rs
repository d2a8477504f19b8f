//! Service discovery
//!
//! A cluster may carry one default [`CloudMapNamespace`]; services then
//! register a discovery entry into it. The namespace renders as a private
//! or public DNS namespace, the entry as an `AWS::ServiceDiscovery::Service`
//! pointing back at the namespace through its deferred id.

use std::rc::Rc;
use std::time::Duration;

use indexmap::IndexMap;
use stratus_core::{Construct, ConstructPath, Expr, NodeSink, ResourceNode, Scope, SynthError};
use stratus_ec2::Vpc;

/// Kind of DNS namespace a cluster publishes discovery records into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceType {
    /// Records resolvable only inside the cluster's network
    DnsPrivate,
    /// Records resolvable from the public internet
    DnsPublic,
}

/// Options for [`Cluster::add_default_cloud_map_namespace`]
///
/// [`Cluster::add_default_cloud_map_namespace`]: crate::Cluster::add_default_cloud_map_namespace
pub struct CloudMapNamespaceProps {
    /// Domain name of the namespace, e.g. `foo.com`
    pub name: String,
    /// Kind of namespace, private by default
    pub namespace_type: NamespaceType,
}

impl CloudMapNamespaceProps {
    /// Private namespace named `name`
    #[inline]
    #[must_use]
    pub fn private(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace_type: NamespaceType::DnsPrivate,
        }
    }

    /// Public namespace named `name`
    #[inline]
    #[must_use]
    pub fn public(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace_type: NamespaceType::DnsPublic,
        }
    }
}

struct CloudMapNamespaceInner {
    scope: Scope,
    name: String,
    namespace_type: NamespaceType,
    vpc: Vpc,
}

/// A DNS namespace shared by a cluster's services
#[derive(Clone)]
pub struct CloudMapNamespace {
    inner: Rc<CloudMapNamespaceInner>,
}

impl CloudMapNamespace {
    pub(crate) fn new(
        parent: &Scope,
        id: &str,
        props: CloudMapNamespaceProps,
        vpc: Vpc,
    ) -> Result<Self, SynthError> {
        let scope = parent.child(id)?;
        tracing::debug!(namespace = %scope.path(), name = %props.name, "namespace declared");
        let namespace = Self {
            inner: Rc::new(CloudMapNamespaceInner {
                name: props.name,
                namespace_type: props.namespace_type,
                vpc,
                scope,
            }),
        };
        namespace
            .inner
            .scope
            .stack()?
            .register(Rc::new(namespace.clone()));
        Ok(namespace)
    }

    /// Path of this namespace in the scope tree
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Domain name of the namespace
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Deferred identifier of the namespace
    #[inline]
    #[must_use]
    pub fn namespace_id(&self) -> Expr {
        Expr::get_att(self.path().clone(), "Id")
    }
}

impl Construct for CloudMapNamespace {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let node = match self.inner.namespace_type {
            NamespaceType::DnsPrivate => ResourceNode::new(
                self.path().clone(),
                "AWS::ServiceDiscovery::PrivateDnsNamespace",
            )
            .with_property("Name", self.inner.name.clone())
            .with_property("Vpc", self.inner.vpc.vpc_id()),
            NamespaceType::DnsPublic => ResourceNode::new(
                self.path().clone(),
                "AWS::ServiceDiscovery::PublicDnsNamespace",
            )
            .with_property("Name", self.inner.name.clone()),
        };
        nodes.emit(node);
        Ok(())
    }
}

/// DNS record kind a discovery entry publishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DnsRecordType {
    /// Address records, one per task
    A,
    /// Service records carrying host and port
    Srv,
}

impl DnsRecordType {
    /// Record type string in rendered discovery services
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::Srv => "SRV",
        }
    }
}

/// Discovery options for a service
pub struct CloudMapOptions {
    /// Name of the discovery entry, the construct id when unset
    pub name: Option<String>,
    /// Record kind, address records by default
    pub dns_record_type: DnsRecordType,
    /// Time to live of published records
    pub dns_ttl: Duration,
    /// Failed custom health checks before a task is dropped
    pub failure_threshold: u32,
}

impl Default for CloudMapOptions {
    fn default() -> Self {
        Self {
            name: None,
            dns_record_type: DnsRecordType::A,
            dns_ttl: Duration::from_secs(60),
            failure_threshold: 1,
        }
    }
}

struct CloudMapServiceInner {
    scope: Scope,
    namespace: CloudMapNamespace,
    options: CloudMapOptions,
}

/// A service's discovery entry in a namespace
#[derive(Clone)]
pub(crate) struct CloudMapService {
    inner: Rc<CloudMapServiceInner>,
}

impl CloudMapService {
    pub(crate) fn new(
        parent: &Scope,
        id: &str,
        namespace: &CloudMapNamespace,
        options: CloudMapOptions,
    ) -> Result<Self, SynthError> {
        let scope = parent.child(id)?;
        tracing::debug!(entry = %scope.path(), namespace = %namespace.name(), "discovery entry declared");
        let service = Self {
            inner: Rc::new(CloudMapServiceInner {
                namespace: namespace.clone(),
                options,
                scope,
            }),
        };
        service.inner.scope.stack()?.register(Rc::new(service.clone()));
        Ok(service)
    }

    pub(crate) fn arn(&self) -> Expr {
        Expr::get_att(self.inner.scope.path().clone(), "Arn")
    }
}

impl Construct for CloudMapService {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let mut record = IndexMap::new();
        record.insert(
            "TTL".to_owned(),
            Expr::from(self.inner.options.dns_ttl.as_secs()),
        );
        record.insert(
            "Type".to_owned(),
            Expr::from(self.inner.options.dns_record_type.as_str()),
        );
        let mut dns_config = IndexMap::new();
        dns_config.insert("DnsRecords".to_owned(), Expr::list(vec![Expr::map(record)]));
        dns_config.insert("NamespaceId".to_owned(), self.inner.namespace.namespace_id());
        dns_config.insert("RoutingPolicy".to_owned(), Expr::from("MULTIVALUE"));

        let mut health = IndexMap::new();
        health.insert(
            "FailureThreshold".to_owned(),
            Expr::from(self.inner.options.failure_threshold),
        );

        let mut node = ResourceNode::new(
            self.inner.scope.path().clone(),
            "AWS::ServiceDiscovery::Service",
        )
        .with_property("DnsConfig", Expr::map(dns_config))
        .with_property("HealthCheckCustomConfig", Expr::map(health));
        node.set_optional("Name", self.inner.options.name.clone());
        node.set_property("NamespaceId", self.inner.namespace.namespace_id());
        nodes.emit(node);
        Ok(())
    }
}
