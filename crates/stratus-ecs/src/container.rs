//! Container definitions
//!
//! Containers are declared through
//! [`TaskDefinition::add_container`](crate::TaskDefinition::add_container)
//! and render inline in their task definition rather than as resources of
//! their own. The child scope reserved for each container keeps names
//! unique within one task definition.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use stratus_core::{Expr, Scope, SynthError};

use crate::images::{ContainerImage, ImageConfig};
use crate::task_definition::{NetworkMode, TaskDefinition};

/// Transport protocol of a port mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    /// TCP traffic
    Tcp,
    /// UDP traffic
    Udp,
}

impl Protocol {
    /// Protocol string in rendered port mappings
    #[inline]
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

/// One exposed container port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortMapping {
    /// Port the container listens on
    pub container_port: u16,
    /// Host port, the container port when left out
    pub host_port: Option<u16>,
    /// Transport protocol, TCP when left out
    pub protocol: Option<Protocol>,
}

impl PortMapping {
    /// TCP mapping exposing `container_port`
    #[inline]
    #[must_use]
    pub const fn new(container_port: u16) -> Self {
        Self {
            container_port,
            host_port: None,
            protocol: None,
        }
    }
}

/// Options for [`TaskDefinition::add_container`]
///
/// [`TaskDefinition::add_container`]: crate::TaskDefinition::add_container
pub struct ContainerDefinitionProps {
    /// Image the container runs
    pub image: ContainerImage,
    /// Hard memory limit in MiB
    pub memory_limit_mib: Option<u32>,
    /// Soft memory reservation in MiB
    pub memory_reservation_mib: Option<u32>,
    /// Whether the task fails when this container stops
    pub essential: bool,
}

impl ContainerDefinitionProps {
    /// Essential container running `image`
    #[must_use]
    pub fn new(image: ContainerImage) -> Self {
        Self {
            image,
            memory_limit_mib: None,
            memory_reservation_mib: None,
            essential: true,
        }
    }
}

struct ContainerDefinitionInner {
    scope: Scope,
    name: String,
    image: ContainerImage,
    memory_limit_mib: Option<u32>,
    memory_reservation_mib: Option<u32>,
    essential: bool,
    network_mode: NetworkMode,
    port_mappings: RefCell<Vec<PortMapping>>,
    image_config: RefCell<Option<Expr>>,
}

/// One container of a task definition
#[derive(Clone)]
pub struct ContainerDefinition {
    inner: Rc<ContainerDefinitionInner>,
}

impl ContainerDefinition {
    pub(crate) fn new(
        scope: Scope,
        name: &str,
        props: ContainerDefinitionProps,
        network_mode: NetworkMode,
    ) -> Self {
        Self {
            inner: Rc::new(ContainerDefinitionInner {
                name: name.to_owned(),
                image: props.image,
                memory_limit_mib: props.memory_limit_mib,
                memory_reservation_mib: props.memory_reservation_mib,
                essential: props.essential,
                network_mode,
                port_mappings: RefCell::new(Vec::new()),
                image_config: RefCell::new(None),
                scope,
            }),
        }
    }

    /// Name of the container within its task definition
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Whether the task fails when this container stops
    #[inline]
    #[must_use]
    pub fn is_essential(&self) -> bool {
        self.inner.essential
    }

    /// Exposes container ports.
    ///
    /// # Errors
    ///
    /// Returns an error when a host port disagrees with its container
    /// port under the `awsvpc` network mode.
    pub fn add_port_mappings(
        &self,
        mappings: impl IntoIterator<Item = PortMapping>,
    ) -> Result<(), SynthError> {
        let mut port_mappings = self.inner.port_mappings.borrow_mut();
        for mapping in mappings {
            if self.inner.network_mode == NetworkMode::AwsVpc {
                if let Some(host_port) = mapping.host_port {
                    if host_port != mapping.container_port {
                        return Err(SynthError::configuration(
                            self.inner.scope.path(),
                            format!(
                                "Host port ({host_port}) must be left out or equal to container port {} for network mode awsvpc",
                                mapping.container_port
                            ),
                        ));
                    }
                }
            }
            port_mappings.push(mapping);
        }
        Ok(())
    }

    pub(crate) fn first_port_mapping(&self) -> Option<PortMapping> {
        self.inner.port_mappings.borrow().first().copied()
    }

    pub(crate) fn bind_image(&self, task_definition: &TaskDefinition) -> Result<(), SynthError> {
        let ImageConfig { image_name } = self.inner.image.bind(task_definition)?;
        *self.inner.image_config.borrow_mut() = Some(image_name);
        Ok(())
    }

    pub(crate) fn render_expr(&self) -> Result<Expr, SynthError> {
        let image = self.inner.image_config.borrow().clone().ok_or_else(|| {
            SynthError::configuration(
                self.inner.scope.path(),
                "container image was never bound to its task definition",
            )
        })?;
        let mut container = IndexMap::new();
        container.insert("Essential".to_owned(), Expr::from(self.inner.essential));
        container.insert("Image".to_owned(), image);
        if let Some(limit) = self.inner.memory_limit_mib {
            container.insert("Memory".to_owned(), Expr::from(limit));
        }
        if let Some(reservation) = self.inner.memory_reservation_mib {
            container.insert("MemoryReservation".to_owned(), Expr::from(reservation));
        }
        container.insert("Name".to_owned(), Expr::from(self.inner.name.clone()));
        let port_mappings = self.inner.port_mappings.borrow();
        if !port_mappings.is_empty() {
            let mappings = port_mappings
                .iter()
                .map(|mapping| {
                    let mut entry = IndexMap::new();
                    entry.insert(
                        "ContainerPort".to_owned(),
                        Expr::from(u32::from(mapping.container_port)),
                    );
                    if let Some(host_port) = mapping.host_port {
                        entry.insert("HostPort".to_owned(), Expr::from(u32::from(host_port)));
                    }
                    entry.insert(
                        "Protocol".to_owned(),
                        Expr::from(mapping.protocol.unwrap_or(Protocol::Tcp).as_str()),
                    );
                    Expr::map(entry)
                })
                .collect();
            container.insert("PortMappings".to_owned(), Expr::list(mappings));
        }
        Ok(Expr::map(container))
    }
}
