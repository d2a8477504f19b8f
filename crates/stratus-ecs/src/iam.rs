//! Service roles and their policies
//!
//! A [`Role`] renders an `AWS::IAM::Role` assumable by one service
//! principal. Statements granted to it through [`Role::add_to_policy`]
//! collect into a single `AWS::IAM::Policy` declared as a `DefaultPolicy`
//! child of the role.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use stratus_core::{
    AsScope, Construct, ConstructPath, Expr, LogicalId, NodeSink, ResourceNode, Scope, SynthError,
};

/// A service allowed to assume a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePrincipal {
    service: String,
}

impl ServicePrincipal {
    /// Principal for `service`, e.g. `ecs-tasks.amazonaws.com`
    #[inline]
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }
}

/// One allow statement of a policy document
#[derive(Debug, Clone)]
pub struct PolicyStatement {
    actions: Vec<String>,
    resources: Vec<Expr>,
}

impl PolicyStatement {
    /// Allows `actions` on `resources`
    #[must_use]
    pub fn new<A, S>(actions: A, resources: Vec<Expr>) -> Self
    where
        A: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            actions: actions.into_iter().map(Into::into).collect(),
            resources,
        }
    }

    fn to_expr(&self) -> Expr {
        let mut statement = IndexMap::new();
        statement.insert(
            "Action".to_owned(),
            Expr::list(self.actions.iter().cloned().map(Expr::from).collect()),
        );
        statement.insert("Effect".to_owned(), Expr::from("Allow"));
        statement.insert("Resource".to_owned(), Expr::list(self.resources.clone()));
        Expr::map(statement)
    }
}

/// Options for [`Role::new`]
pub struct RoleProps {
    /// Service principal allowed to assume the role
    pub assumed_by: ServicePrincipal,
}

struct RoleInner {
    scope: Scope,
    assumed_by: String,
    statements: RefCell<Vec<PolicyStatement>>,
    policy_scope: RefCell<Option<Scope>>,
}

/// An identity assumable by a service principal
#[derive(Clone)]
pub struct Role {
    inner: Rc<RoleInner>,
}

impl Role {
    /// Registers a new role under `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or already taken, or when
    /// the scope is detached from its stack.
    pub fn new(scope: &impl AsScope, id: &str, props: RoleProps) -> Result<Self, SynthError> {
        let scope = scope.as_scope().child(id)?;
        tracing::debug!(role = %scope.path(), principal = %props.assumed_by.service, "role declared");
        let role = Self {
            inner: Rc::new(RoleInner {
                assumed_by: props.assumed_by.service,
                statements: RefCell::new(Vec::new()),
                policy_scope: RefCell::new(None),
                scope,
            }),
        };
        role.inner.scope.stack()?.register(Rc::new(role.clone()));
        Ok(role)
    }

    /// Path of this role in the scope tree
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Deferred ARN of the role
    #[inline]
    #[must_use]
    pub fn arn(&self) -> Expr {
        Expr::get_att(self.path().clone(), "Arn")
    }

    /// Appends a statement to the role's default policy, declaring the
    /// policy on first use.
    ///
    /// # Errors
    ///
    /// Returns an error when the default policy id collides or the scope
    /// is detached from its stack.
    pub fn add_to_policy(&self, statement: PolicyStatement) -> Result<(), SynthError> {
        let mut statements = self.inner.statements.borrow_mut();
        if statements.is_empty() {
            let policy = self.inner.scope.child("DefaultPolicy")?;
            tracing::debug!(policy = %policy.path(), "default policy declared");
            *self.inner.policy_scope.borrow_mut() = Some(policy);
        }
        statements.push(statement);
        Ok(())
    }

    fn assume_role_document(&self) -> Expr {
        let mut principal = IndexMap::new();
        principal.insert(
            "Service".to_owned(),
            Expr::from(self.inner.assumed_by.clone()),
        );
        let mut statement = IndexMap::new();
        statement.insert("Action".to_owned(), Expr::from("sts:AssumeRole"));
        statement.insert("Effect".to_owned(), Expr::from("Allow"));
        statement.insert("Principal".to_owned(), Expr::map(principal));
        let mut document = IndexMap::new();
        document.insert("Statement".to_owned(), Expr::list(vec![Expr::map(statement)]));
        document.insert("Version".to_owned(), Expr::from("2012-10-17"));
        Expr::map(document)
    }
}

impl Construct for Role {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        nodes.emit(
            ResourceNode::new(self.path().clone(), "AWS::IAM::Role")
                .with_property("AssumeRolePolicyDocument", self.assume_role_document()),
        );

        let statements = self.inner.statements.borrow();
        if let Some(policy) = self.inner.policy_scope.borrow().as_ref() {
            let mut document = IndexMap::new();
            document.insert(
                "Statement".to_owned(),
                Expr::list(statements.iter().map(PolicyStatement::to_expr).collect()),
            );
            document.insert("Version".to_owned(), Expr::from("2012-10-17"));
            nodes.emit(
                ResourceNode::new(policy.path().clone(), "AWS::IAM::Policy")
                    .with_property("PolicyDocument", Expr::map(document))
                    .with_property(
                        "PolicyName",
                        LogicalId::from_path(policy.path()).into_string(),
                    )
                    .with_property("Roles", Expr::list(vec![Expr::ref_to(self.path().clone())])),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use stratus_core::Stack;

    fn task_role(stack: &Stack) -> Role {
        Role::new(
            stack,
            "TaskRole",
            RoleProps {
                assumed_by: ServicePrincipal::new("ecs-tasks.amazonaws.com"),
            },
        )
        .unwrap()
    }

    #[test]
    fn renders_assume_role_document_for_principal() {
        let stack = Stack::new();
        let _role = task_role(&stack);
        let template = stack.synth().unwrap();
        let (_, resource) = template.resources_of_type("AWS::IAM::Role")[0];
        assert_eq!(
            resource["Properties"]["AssumeRolePolicyDocument"],
            serde_json::json!({
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": "ecs-tasks.amazonaws.com" },
                }],
                "Version": "2012-10-17",
            })
        );
    }

    #[test]
    fn role_without_statements_has_no_policy() {
        let stack = Stack::new();
        let _role = task_role(&stack);
        let template = stack.synth().unwrap();
        assert!(template.resources_of_type("AWS::IAM::Policy").is_empty());
    }

    #[test]
    fn statements_collect_into_one_default_policy() {
        let stack = Stack::new();
        let role = task_role(&stack);
        role.add_to_policy(PolicyStatement::new(
            ["logs:CreateLogStream", "logs:PutLogEvents"],
            vec![Expr::from("*")],
        ))
        .unwrap();
        role.add_to_policy(PolicyStatement::new(
            ["ecr:GetAuthorizationToken"],
            vec![Expr::from("*")],
        ))
        .unwrap();
        let template = stack.synth().unwrap();
        let (_, policy) = template.resources_of_type("AWS::IAM::Policy")[0];
        assert_eq!(
            policy["Properties"]["PolicyDocument"]["Statement"],
            serde_json::json!([
                {
                    "Action": ["logs:CreateLogStream", "logs:PutLogEvents"],
                    "Effect": "Allow",
                    "Resource": ["*"],
                },
                {
                    "Action": ["ecr:GetAuthorizationToken"],
                    "Effect": "Allow",
                    "Resource": ["*"],
                },
            ])
        );
        let role_id = template.logical_id(role.path()).unwrap();
        assert_eq!(
            policy["Properties"]["Roles"],
            serde_json::json!([{ "Ref": role_id }])
        );
    }

    #[test]
    fn default_policy_name_matches_its_logical_id() {
        let stack = Stack::new();
        let role = task_role(&stack);
        role.add_to_policy(PolicyStatement::new(["s3:GetObject"], vec![Expr::from("*")]))
            .unwrap();
        let template = stack.synth().unwrap();
        let policy_path = role.path().child("DefaultPolicy");
        let policy_id = template.logical_id(&policy_path).unwrap();
        let resource = template.resource(policy_id).unwrap();
        assert_eq!(resource["Properties"]["PolicyName"], policy_id);
    }
}
