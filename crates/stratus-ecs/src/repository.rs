//! Container image repositories
//!
//! A [`Repository`] renders an `AWS::ECR::Repository` and knows how to
//! compose its registry URI out of deferred fragments of its own ARN,
//! long before any identifier is assigned.

use std::rc::Rc;

use stratus_core::{
    AsScope, BindKey, Construct, ConstructPath, Expr, NodeSink, PseudoParam, ResourceNode, Scope,
    SynthError,
};

use crate::iam::{PolicyStatement, Role};

const PULL_ACTIONS: [&str; 3] = [
    "ecr:BatchCheckLayerAvailability",
    "ecr:GetDownloadUrlForLayer",
    "ecr:BatchGetImage",
];

struct RepositoryInner {
    scope: Scope,
}

/// A registry repository images can be pulled from
#[derive(Clone)]
pub struct Repository {
    inner: Rc<RepositoryInner>,
}

impl Repository {
    /// Registers a new repository under `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or already taken, or when
    /// the scope is detached from its stack.
    pub fn new(scope: &impl AsScope, id: &str) -> Result<Self, SynthError> {
        let scope = scope.as_scope().child(id)?;
        tracing::debug!(repository = %scope.path(), "repository declared");
        let repository = Self {
            inner: Rc::new(RepositoryInner { scope }),
        };
        repository
            .inner
            .scope
            .stack()?
            .register(Rc::new(repository.clone()));
        Ok(repository)
    }

    /// Path of this repository in the scope tree
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Deferred ARN of the repository
    #[inline]
    #[must_use]
    pub fn arn(&self) -> Expr {
        Expr::get_att(self.path().clone(), "Arn")
    }

    /// Registry URI for one tag, assembled from account and region
    /// fragments of the repository ARN.
    #[must_use]
    pub fn repository_uri_for_tag(&self, tag: &str) -> Expr {
        let account = Expr::select(4, Expr::split(":", self.arn()));
        let region = Expr::select(3, Expr::split(":", self.arn()));
        Expr::join(
            "",
            vec![
                account,
                ".dkr.ecr.".into(),
                region,
                ".".into(),
                Expr::pseudo(PseudoParam::UrlSuffix),
                "/".into(),
                Expr::ref_to(self.path().clone()),
                ":".into(),
                tag.into(),
            ],
        )
    }

    /// Grants `role` the permissions needed to pull images. Granting the
    /// same role twice adds nothing.
    ///
    /// # Errors
    ///
    /// Returns an error when the scope is detached or the role's default
    /// policy cannot be declared.
    pub fn grant_pull(&self, role: &Role) -> Result<(), SynthError> {
        let stack = self.inner.scope.stack()?;
        let key = BindKey::new(self.path().clone(), role.path().clone(), "grant-pull");
        if stack.once(key) {
            tracing::debug!(repository = %self.path(), role = %role.path(), "pull access granted");
            role.add_to_policy(PolicyStatement::new(PULL_ACTIONS, vec![self.arn()]))?;
            role.add_to_policy(PolicyStatement::new(
                ["ecr:GetAuthorizationToken"],
                vec![Expr::from("*")],
            ))?;
        }
        Ok(())
    }
}

impl Construct for Repository {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        nodes.emit(ResourceNode::new(
            self.path().clone(),
            "AWS::ECR::Repository",
        ));
        Ok(())
    }
}
