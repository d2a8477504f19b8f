//! VPC and subnet constructs
//!
//! Provides [`Vpc`], a network with a fixed two-way subnet split: two public
//! and two private subnets carved out of the VPC CIDR block. Constructs that
//! place workloads pick a side with [`SubnetType`].

use std::rc::Rc;

use stratus_core::{
    AsScope, Construct, ConstructPath, Expr, NodeSink, ResourceNode, Scope, SynthError,
};

/// Which side of the subnet split to place resources in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubnetType {
    /// Subnets with a route to the public internet
    Public,
    /// Subnets reachable only from inside the VPC
    Private,
}

/// Options for [`Vpc::new`]
#[derive(Debug, Clone)]
pub struct VpcProps {
    /// CIDR block of the network, `10.0.0.0/16` by default
    pub cidr: String,
}

impl Default for VpcProps {
    fn default() -> Self {
        Self {
            cidr: "10.0.0.0/16".to_owned(),
        }
    }
}

struct SubnetInner {
    scope: Scope,
    vpc_path: ConstructPath,
    cidr: String,
    public: bool,
}

/// A single subnet inside a [`Vpc`]
#[derive(Clone)]
pub struct Subnet {
    inner: Rc<SubnetInner>,
}

impl Subnet {
    fn new(vpc_scope: &Scope, id: &str, cidr: String, public: bool) -> Result<Self, SynthError> {
        let scope = vpc_scope.child(id)?;
        let subnet = Self {
            inner: Rc::new(SubnetInner {
                vpc_path: vpc_scope.path().clone(),
                scope,
                cidr,
                public,
            }),
        };
        vpc_scope.stack()?.register(Rc::new(subnet.clone()));
        Ok(subnet)
    }

    /// Path of the subnet construct
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Deferred subnet id
    #[must_use]
    pub fn subnet_id(&self) -> Expr {
        Expr::ref_to(self.path().clone())
    }

    /// Whether the subnet routes to the public internet
    #[must_use]
    pub fn is_public(&self) -> bool {
        self.inner.public
    }
}

impl Construct for Subnet {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        nodes.emit(
            ResourceNode::new(self.path().clone(), "AWS::EC2::Subnet")
                .with_property("CidrBlock", self.inner.cidr.as_str())
                .with_property("MapPublicIpOnLaunch", self.inner.public)
                .with_property("VpcId", Expr::ref_to(self.inner.vpc_path.clone())),
        );
        Ok(())
    }
}

struct VpcInner {
    scope: Scope,
    cidr: String,
    public_subnets: Vec<Subnet>,
    private_subnets: Vec<Subnet>,
}

/// A network holding two public and two private subnets
///
/// Subnet CIDR blocks are carved as consecutive `/24` slices of the VPC
/// block, public first.
#[derive(Clone)]
pub struct Vpc {
    inner: Rc<VpcInner>,
}

impl Vpc {
    /// Declare a VPC under `scope`
    ///
    /// # Errors
    /// Returns an error when the id is taken or malformed
    pub fn new(scope: &impl AsScope, id: &str, props: VpcProps) -> Result<Self, SynthError> {
        let scope = scope.as_scope().child(id)?;
        let base = props
            .cidr
            .split('.')
            .take(2)
            .collect::<Vec<_>>()
            .join(".");

        let mut public_subnets = Vec::new();
        let mut private_subnets = Vec::new();
        for index in 0..2_u8 {
            public_subnets.push(Subnet::new(
                &scope,
                &format!("PublicSubnet{}", index + 1),
                format!("{base}.{index}.0/24"),
                true,
            )?);
        }
        for index in 0..2_u8 {
            private_subnets.push(Subnet::new(
                &scope,
                &format!("PrivateSubnet{}", index + 1),
                format!("{base}.{}.0/24", index + 2),
                false,
            )?);
        }
        tracing::debug!(path = %scope.path(), "declared vpc");

        let vpc = Self {
            inner: Rc::new(VpcInner {
                cidr: props.cidr,
                public_subnets,
                private_subnets,
                scope: scope.clone(),
            }),
        };
        scope.stack()?.register(Rc::new(vpc.clone()));
        Ok(vpc)
    }

    /// Path of the VPC construct
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Deferred VPC id
    #[must_use]
    pub fn vpc_id(&self) -> Expr {
        Expr::ref_to(self.path().clone())
    }

    /// Subnets on the requested side of the split
    #[must_use]
    pub fn select_subnets(&self, subnet_type: SubnetType) -> &[Subnet] {
        match subnet_type {
            SubnetType::Public => &self.inner.public_subnets,
            SubnetType::Private => &self.inner.private_subnets,
        }
    }

    /// Deferred subnet ids on the requested side of the split
    #[must_use]
    pub fn subnet_ids(&self, subnet_type: SubnetType) -> Vec<Expr> {
        self.select_subnets(subnet_type)
            .iter()
            .map(Subnet::subnet_id)
            .collect()
    }
}

impl Construct for Vpc {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        nodes.emit(
            ResourceNode::new(self.path().clone(), "AWS::EC2::VPC")
                .with_property("CidrBlock", self.inner.cidr.as_str()),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratus_core::Stack;

    fn vpc() -> (Stack, Vpc) {
        let stack = Stack::new();
        let vpc = Vpc::new(&stack, "MyVpc", VpcProps::default()).unwrap();
        (stack, vpc)
    }

    #[test]
    fn four_subnets_two_per_side() {
        let (_stack, vpc) = vpc();
        assert_eq!(vpc.select_subnets(SubnetType::Public).len(), 2);
        assert_eq!(vpc.select_subnets(SubnetType::Private).len(), 2);
        assert!(vpc.select_subnets(SubnetType::Public)[0].is_public());
        assert!(!vpc.select_subnets(SubnetType::Private)[0].is_public());
    }

    #[test]
    fn renders_vpc_and_subnet_nodes() {
        let (stack, vpc) = vpc();
        let template = stack.synth().unwrap();
        assert_eq!(template.resources_of_type("AWS::EC2::VPC").len(), 1);
        assert_eq!(template.resources_of_type("AWS::EC2::Subnet").len(), 4);

        let public_id = template
            .logical_id(vpc.select_subnets(SubnetType::Public)[0].path())
            .unwrap();
        let record = template.resource(public_id).unwrap();
        assert_eq!(record["Properties"]["CidrBlock"], "10.0.0.0/24");
        assert_eq!(record["Properties"]["MapPublicIpOnLaunch"], true);
    }

    #[test]
    fn subnet_cidrs_are_disjoint_slices() {
        let (_stack, vpc) = vpc();
        let private = vpc.select_subnets(SubnetType::Private);
        assert_eq!(private[0].inner.cidr, "10.0.2.0/24");
        assert_eq!(private[1].inner.cidr, "10.0.3.0/24");
    }

    #[test]
    fn duplicate_vpc_id_rejected() {
        let stack = Stack::new();
        Vpc::new(&stack, "MyVpc", VpcProps::default()).unwrap();
        assert!(matches!(
            Vpc::new(&stack, "MyVpc", VpcProps::default()),
            Err(SynthError::DuplicateId { .. })
        ));
    }
}
