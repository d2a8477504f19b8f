//! Container image sources
//!
//! A [`ContainerImage`] stays symbolic until its task definition binds.
//! Registry images resolve to their name as given; repository images
//! compose their URI from the repository ARN and grant the task's
//! execution role permission to pull.

use stratus_core::{Expr, SynthError};

use crate::repository::Repository;
use crate::task_definition::TaskDefinition;

/// Where a container's image comes from
#[derive(Clone)]
pub enum ContainerImage {
    /// An image pulled from a public or external registry
    Registry {
        /// Image name, e.g. `amazon/amazon-ecs-sample`
        name: String,
    },
    /// An image pulled from a repository declared in this stack
    Ecr {
        /// Repository holding the image
        repository: Repository,
        /// Tag to pull
        tag: String,
    },
}

impl ContainerImage {
    /// Image pulled from an external registry by name
    #[inline]
    #[must_use]
    pub fn from_registry(name: impl Into<String>) -> Self {
        Self::Registry { name: name.into() }
    }

    /// Image pulled from `repository` at `tag`
    #[inline]
    #[must_use]
    pub fn from_ecr_repository(repository: &Repository, tag: impl Into<String>) -> Self {
        Self::Ecr {
            repository: repository.clone(),
            tag: tag.into(),
        }
    }

    pub(crate) fn bind(&self, task_definition: &TaskDefinition) -> Result<ImageConfig, SynthError> {
        match self {
            Self::Registry { name } => Ok(ImageConfig {
                image_name: Expr::from(name.clone()),
            }),
            Self::Ecr { repository, tag } => {
                let role = task_definition.obtain_execution_role()?;
                repository.grant_pull(&role)?;
                Ok(ImageConfig {
                    image_name: repository.repository_uri_for_tag(tag),
                })
            }
        }
    }
}

/// Outcome of binding an image to its task definition
pub(crate) struct ImageConfig {
    pub(crate) image_name: Expr,
}
