//! Security group construct

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use stratus_core::{
    AsScope, Construct, ConstructPath, Expr, NodeSink, ResourceNode, Scope, SynthError,
};

use crate::vpc::Vpc;

/// A single outbound rule on a [`SecurityGroup`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EgressRule {
    /// Destination CIDR range
    pub cidr: String,
    /// Human-readable rule description
    pub description: String,
    /// IP protocol, `-1` for all
    pub protocol: String,
}

impl EgressRule {
    /// Rule permitting all outbound traffic to anywhere
    #[must_use]
    pub fn all_traffic() -> Self {
        Self {
            cidr: "0.0.0.0/0".to_owned(),
            description: "Allow all outbound traffic by default".to_owned(),
            protocol: "-1".to_owned(),
        }
    }

    fn to_expr(&self) -> Expr {
        let mut entry = IndexMap::new();
        entry.insert("CidrIp".to_owned(), Expr::from(self.cidr.clone()));
        entry.insert("Description".to_owned(), Expr::from(self.description.clone()));
        entry.insert("IpProtocol".to_owned(), Expr::from(self.protocol.clone()));
        Expr::map(entry)
    }
}

/// Options for [`SecurityGroup::new`]
#[derive(Clone)]
pub struct SecurityGroupProps {
    /// Network the group belongs to
    pub vpc: Vpc,
    /// Description, defaults to the construct path
    pub description: Option<String>,
    /// Explicit group name, omitted by default
    pub group_name: Option<String>,
    /// Whether to start with an allow-all egress rule
    pub allow_all_outbound: bool,
}

impl SecurityGroupProps {
    /// Props with defaults: no explicit name, allow-all outbound
    #[must_use]
    pub fn new(vpc: &Vpc) -> Self {
        Self {
            vpc: vpc.clone(),
            description: None,
            group_name: None,
            allow_all_outbound: true,
        }
    }
}

struct SecurityGroupInner {
    scope: Scope,
    vpc: Vpc,
    description: String,
    group_name: Option<String>,
    egress: RefCell<Vec<EgressRule>>,
}

/// Stateful firewall attached to workload network interfaces
#[derive(Clone)]
pub struct SecurityGroup {
    inner: Rc<SecurityGroupInner>,
}

impl SecurityGroup {
    /// Declare a security group under `scope`
    ///
    /// # Errors
    /// Returns an error when the id is taken or malformed
    pub fn new(
        scope: &impl AsScope,
        id: &str,
        props: SecurityGroupProps,
    ) -> Result<Self, SynthError> {
        let scope = scope.as_scope().child(id)?;
        let description = props
            .description
            .unwrap_or_else(|| scope.path().to_string());
        let egress = if props.allow_all_outbound {
            vec![EgressRule::all_traffic()]
        } else {
            Vec::new()
        };
        let group = Self {
            inner: Rc::new(SecurityGroupInner {
                vpc: props.vpc,
                description,
                group_name: props.group_name,
                egress: RefCell::new(egress),
                scope: scope.clone(),
            }),
        };
        scope.stack()?.register(Rc::new(group.clone()));
        Ok(group)
    }

    /// Path of the security group construct
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Deferred group id
    #[must_use]
    pub fn group_id(&self) -> Expr {
        Expr::get_att(self.path().clone(), "GroupId")
    }

    /// Append an outbound rule
    pub fn add_egress_rule(&self, rule: EgressRule) {
        self.inner.egress.borrow_mut().push(rule);
    }
}

impl Construct for SecurityGroup {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let mut node = ResourceNode::new(self.path().clone(), "AWS::EC2::SecurityGroup")
            .with_property("GroupDescription", self.inner.description.as_str());
        node.set_optional("GroupName", self.inner.group_name.as_deref());
        let egress = self.inner.egress.borrow();
        if !egress.is_empty() {
            node.set_property(
                "SecurityGroupEgress",
                Expr::list(egress.iter().map(EgressRule::to_expr).collect()),
            );
        }
        node.set_property("VpcId", self.inner.vpc.vpc_id());
        nodes.emit(node);
        Ok(())
    }
}
