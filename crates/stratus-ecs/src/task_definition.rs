//! Task definitions
//!
//! A [`TaskDefinition`] collects containers and the roles its tasks run
//! with, then renders them as one `AWS::ECS::TaskDefinition`. The
//! [`FargateTaskDefinition`] wrapper fixes the launch type specific
//! defaults: `awsvpc` networking and a serverless cpu and memory size.

use std::cell::RefCell;
use std::ops::Deref;
use std::rc::Rc;

use stratus_core::{
    AsScope, Construct, ConstructPath, Expr, LogicalId, NodeSink, ResourceNode, Scope, Stack,
    SynthError,
};

use crate::container::{ContainerDefinition, ContainerDefinitionProps};
use crate::iam::{Role, RoleProps, ServicePrincipal};

const TASK_PRINCIPAL: &str = "ecs-tasks.amazonaws.com";

/// Launch types a task definition may run on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// Instance backed launches only
    Ec2,
    /// Serverless launches only
    Fargate,
    /// Either launch type
    Ec2AndFargate,
}

impl Compatibility {
    /// Whether tasks may launch on Fargate
    #[inline]
    #[must_use]
    pub const fn is_fargate_compatible(self) -> bool {
        matches!(self, Self::Fargate | Self::Ec2AndFargate)
    }

    const fn requires(self) -> &'static [&'static str] {
        match self {
            Self::Ec2 => &["EC2"],
            Self::Fargate => &["FARGATE"],
            Self::Ec2AndFargate => &["EC2", "FARGATE"],
        }
    }
}

/// Network mode the task's containers share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkMode {
    /// Each task gets its own network interface
    AwsVpc,
    /// Docker bridge networking
    Bridge,
    /// Containers share the host's network
    Host,
}

impl NetworkMode {
    /// Network mode string in rendered task definitions
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AwsVpc => "awsvpc",
            Self::Bridge => "bridge",
            Self::Host => "host",
        }
    }
}

/// Options for [`TaskDefinition::new`]
pub struct TaskDefinitionProps {
    /// Launch types the definition supports
    pub compatibility: Compatibility,
    /// Network mode of the task's containers
    pub network_mode: NetworkMode,
    /// Task cpu units, rendered as given
    pub cpu: Option<String>,
    /// Task memory in MiB, rendered as given
    pub memory_mib: Option<String>,
}

struct TaskDefinitionInner {
    scope: Scope,
    compatibility: Compatibility,
    network_mode: NetworkMode,
    cpu: Option<String>,
    memory_mib: Option<String>,
    task_role: Role,
    containers: RefCell<Vec<ContainerDefinition>>,
    default_container: RefCell<Option<ContainerDefinition>>,
    execution_role: RefCell<Option<Role>>,
}

/// A recipe for launching tasks
#[derive(Clone)]
pub struct TaskDefinition {
    inner: Rc<TaskDefinitionInner>,
}

impl TaskDefinition {
    /// Registers a new task definition under `scope`, together with the
    /// role its tasks assume.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or already taken, or when
    /// the scope is detached from its stack.
    pub fn new(
        scope: &impl AsScope,
        id: &str,
        props: TaskDefinitionProps,
    ) -> Result<Self, SynthError> {
        let scope = scope.as_scope().child(id)?;
        let task_role = Role::new(
            &scope,
            "TaskRole",
            RoleProps {
                assumed_by: ServicePrincipal::new(TASK_PRINCIPAL),
            },
        )?;
        tracing::debug!(task_definition = %scope.path(), mode = props.network_mode.as_str(), "task definition declared");
        let task_definition = Self {
            inner: Rc::new(TaskDefinitionInner {
                compatibility: props.compatibility,
                network_mode: props.network_mode,
                cpu: props.cpu,
                memory_mib: props.memory_mib,
                task_role,
                containers: RefCell::new(Vec::new()),
                default_container: RefCell::new(None),
                execution_role: RefCell::new(None),
                scope,
            }),
        };
        task_definition
            .inner
            .scope
            .stack()?
            .register(Rc::new(task_definition.clone()));
        Ok(task_definition)
    }

    /// Path of this task definition in the scope tree
    #[inline]
    #[must_use]
    pub fn path(&self) -> &ConstructPath {
        self.inner.scope.path()
    }

    /// Deferred ARN of the task definition
    #[inline]
    #[must_use]
    pub fn arn(&self) -> Expr {
        Expr::ref_to(self.path().clone())
    }

    /// Network mode of the task's containers
    #[inline]
    #[must_use]
    pub fn network_mode(&self) -> NetworkMode {
        self.inner.network_mode
    }

    /// Whether tasks may launch on Fargate
    #[inline]
    #[must_use]
    pub fn is_fargate_compatible(&self) -> bool {
        self.inner.compatibility.is_fargate_compatible()
    }

    /// Role the task's containers assume at runtime
    #[inline]
    #[must_use]
    pub fn task_role(&self) -> &Role {
        &self.inner.task_role
    }

    /// Role the launch agent uses to pull images, if one exists yet
    #[must_use]
    pub fn execution_role(&self) -> Option<Role> {
        self.inner.execution_role.borrow().clone()
    }

    /// Role the launch agent uses to pull images, created on first use.
    ///
    /// # Errors
    ///
    /// Returns an error when the role cannot be declared.
    pub fn obtain_execution_role(&self) -> Result<Role, SynthError> {
        let mut execution_role = self.inner.execution_role.borrow_mut();
        if let Some(role) = execution_role.as_ref() {
            return Ok(role.clone());
        }
        let role = Role::new(
            &self.inner.scope,
            "ExecutionRole",
            RoleProps {
                assumed_by: ServicePrincipal::new(TASK_PRINCIPAL),
            },
        )?;
        *execution_role = Some(role.clone());
        Ok(role)
    }

    /// Adds a container to the definition. The first essential container
    /// becomes the default target for load balancing.
    ///
    /// # Errors
    ///
    /// Returns an error when the container name is invalid or already
    /// taken within this task definition.
    pub fn add_container(
        &self,
        name: &str,
        props: ContainerDefinitionProps,
    ) -> Result<ContainerDefinition, SynthError> {
        let container_scope = self.inner.scope.child(name)?;
        let container =
            ContainerDefinition::new(container_scope, name, props, self.inner.network_mode);
        if container.is_essential() {
            let mut default_container = self.inner.default_container.borrow_mut();
            if default_container.is_none() {
                *default_container = Some(container.clone());
            }
        }
        self.inner.containers.borrow_mut().push(container.clone());
        Ok(container)
    }

    /// First essential container added to the definition
    #[must_use]
    pub fn default_container(&self) -> Option<ContainerDefinition> {
        self.inner.default_container.borrow().clone()
    }

    pub(crate) fn has_containers(&self) -> bool {
        !self.inner.containers.borrow().is_empty()
    }
}

impl Construct for TaskDefinition {
    fn scope(&self) -> &Scope {
        &self.inner.scope
    }

    fn bind(&self, _stack: &Stack) -> Result<(), SynthError> {
        let containers = self.inner.containers.borrow();
        if !containers.iter().any(ContainerDefinition::is_essential) {
            return Err(SynthError::configuration(
                self.path(),
                "A TaskDefinition must have at least one essential container",
            ));
        }
        for container in containers.iter() {
            container.bind_image(self)?;
        }
        Ok(())
    }

    fn render(&self, nodes: &mut NodeSink) -> Result<(), SynthError> {
        let containers = self.inner.containers.borrow();
        let containers = containers
            .iter()
            .map(ContainerDefinition::render_expr)
            .collect::<Result<Vec<_>, _>>()?;
        let mut node = ResourceNode::new(self.path().clone(), "AWS::ECS::TaskDefinition")
            .with_property("ContainerDefinitions", Expr::list(containers));
        node.set_optional("Cpu", self.inner.cpu.clone());
        node.set_optional(
            "ExecutionRoleArn",
            self.inner.execution_role.borrow().as_ref().map(Role::arn),
        );
        node.set_property("Family", LogicalId::from_path(self.path()).into_string());
        node.set_optional("Memory", self.inner.memory_mib.clone());
        node.set_property("NetworkMode", self.inner.network_mode.as_str());
        node.set_property(
            "RequiresCompatibilities",
            Expr::list(
                self.inner
                    .compatibility
                    .requires()
                    .iter()
                    .map(|launch_type| Expr::from(*launch_type))
                    .collect(),
            ),
        );
        node.set_property("TaskRoleArn", self.inner.task_role.arn());
        nodes.emit(node);
        Ok(())
    }
}

/// Options for [`FargateTaskDefinition::new`]
#[derive(Default)]
pub struct FargateTaskDefinitionProps {
    /// Task cpu units, `256` when left out
    pub cpu: Option<String>,
    /// Task memory in MiB, `512` when left out
    pub memory_mib: Option<String>,
}

/// A task definition restricted to serverless launches
#[derive(Clone)]
pub struct FargateTaskDefinition {
    task_definition: TaskDefinition,
}

impl FargateTaskDefinition {
    /// Registers a Fargate task definition under `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error when the id is invalid or already taken, or when
    /// the scope is detached from its stack.
    pub fn new(
        scope: &impl AsScope,
        id: &str,
        props: FargateTaskDefinitionProps,
    ) -> Result<Self, SynthError> {
        let task_definition = TaskDefinition::new(
            scope,
            id,
            TaskDefinitionProps {
                compatibility: Compatibility::Fargate,
                network_mode: NetworkMode::AwsVpc,
                cpu: Some(props.cpu.unwrap_or_else(|| "256".to_owned())),
                memory_mib: Some(props.memory_mib.unwrap_or_else(|| "512".to_owned())),
            },
        )?;
        Ok(Self { task_definition })
    }
}

impl Deref for FargateTaskDefinition {
    type Target = TaskDefinition;

    fn deref(&self) -> &Self::Target {
        &self.task_definition
    }
}
