//! Synthesis error types

use crate::path::{ConstructPath, PathError};

/// Errors surfaced while declaring constructs or synthesizing a stack
///
/// Declaration-time failures (bad options, incompatible wiring, duplicate
/// ids) carry the path of the construct being declared. Resolution failures
/// carry the path the failing expression pointed at.
#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    /// A construct was declared with contradictory or invalid options
    #[error("invalid configuration for '{path}': {reason}")]
    Configuration {
        /// Construct being declared
        path: ConstructPath,
        /// What was wrong with the options
        reason: String,
    },

    /// Two constructs that cannot work together were wired together
    #[error("incompatible constructs at '{path}': {reason}")]
    Incompatible {
        /// Construct being declared
        path: ConstructPath,
        /// Why the collaborators cannot work together
        reason: String,
    },

    /// A construct requires a collaborator that was never provided
    #[error("missing dependency for '{path}': {reason}")]
    MissingDependency {
        /// Construct being declared
        path: ConstructPath,
        /// What is missing
        reason: String,
    },

    /// Two sibling constructs were declared under the same id
    #[error("construct id '{id}' already exists under '{parent}'")]
    DuplicateId {
        /// Scope the id was declared in
        parent: ConstructPath,
        /// The contested id
        id: String,
    },

    /// Two resource nodes rendered to the same logical id
    #[error("logical id '{id}' produced by more than one resource")]
    DuplicateLogicalId {
        /// The contested logical id
        id: String,
    },

    /// An expression referenced a path where no construct was ever declared
    #[error("reference to undeclared construct '{path}'")]
    DanglingReference {
        /// The undeclared path
        path: ConstructPath,
    },

    /// An expression referenced a construct that produced no resource
    #[error("construct '{path}' was referenced but produced no resource")]
    UnresolvedReference {
        /// Path of the resourceless construct
        path: ConstructPath,
    },

    /// A construct handle was used after its stack was dropped
    #[error("construct handle outlived its stack")]
    DetachedScope,

    /// An expression could not be reduced to a valid template value
    #[error("invalid expression: {reason}")]
    Expression {
        /// What the expression tried to do
        reason: String,
    },

    /// Malformed construct id
    #[error(transparent)]
    Path(#[from] PathError),
}

impl SynthError {
    /// Invalid options on the construct at `path`
    #[must_use]
    pub fn configuration(path: &ConstructPath, reason: impl Into<String>) -> Self {
        Self::Configuration {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Incompatible collaborators wired into the construct at `path`
    #[must_use]
    pub fn incompatible(path: &ConstructPath, reason: impl Into<String>) -> Self {
        Self::Incompatible {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Missing collaborator for the construct at `path`
    #[must_use]
    pub fn missing_dependency(path: &ConstructPath, reason: impl Into<String>) -> Self {
        Self::MissingDependency {
            path: path.clone(),
            reason: reason.into(),
        }
    }

    /// Expression that cannot be reduced to a template value
    #[must_use]
    pub fn expression(reason: impl Into<String>) -> Self {
        Self::Expression {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_message_names_path_and_reason() {
        let err = SynthError::configuration(
            &ConstructPath::single("FargateService"),
            "desired count must be positive",
        );
        assert_eq!(
            err.to_string(),
            "invalid configuration for 'FargateService': desired count must be positive"
        );
    }

    #[test]
    fn duplicate_id_message() {
        let err = SynthError::DuplicateId {
            parent: ConstructPath::root(),
            id: "Cluster".to_owned(),
        };
        assert_eq!(err.to_string(), "construct id 'Cluster' already exists under ''");
    }

    #[test]
    fn path_error_converts() {
        let err: SynthError = PathError::EmptyId.into();
        assert!(matches!(err, SynthError::Path(PathError::EmptyId)));
    }
}
