//! Construct paths for addressing within the tree
//!
//! Provides [`ConstructPath`], the hierarchical address a construct occupies
//! in a stack, used for logical-id derivation and deferred references.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path of a construct within a stack
///
/// Hierarchical structure using string segments. The root of the tree (the
/// stack itself) is the empty path.
///
/// # Examples
/// - `["FargateService"]` → `FargateService`
/// - `["FargateService", "SecurityGroup"]` → `FargateService/SecurityGroup`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstructPath(Vec<String>);

impl ConstructPath {
    /// Create new path from segments
    #[inline]
    #[must_use]
    pub fn new(segments: Vec<String>) -> Self {
        Self(segments)
    }

    /// Create path from a single segment
    #[inline]
    #[must_use]
    pub fn single(segment: impl Into<String>) -> Self {
        Self(vec![segment.into()])
    }

    /// Empty path (root of the tree)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parent path, or `None` at the root
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            return None;
        }
        Some(Self(self.0[..self.0.len() - 1].to_vec()))
    }

    /// Last segment, or `None` at the root
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Extend the path with one more segment
    #[inline]
    #[must_use]
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    /// Check whether `other` lies under this path
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.0.len() > self.0.len() && other.0[..self.0.len()] == self.0[..]
    }

    /// Validate a single construct id
    ///
    /// # Errors
    /// Returns error if the id is empty or contains characters other than
    /// ASCII alphanumerics, `-` and `_`
    pub fn validate_id(id: &str) -> Result<(), PathError> {
        if id.is_empty() {
            return Err(PathError::EmptyId);
        }
        if !id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PathError::InvalidId { id: id.to_owned() });
        }
        Ok(())
    }
}

impl Display for ConstructPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for ConstructPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for segment in s.split('/') {
            Self::validate_id(segment)?;
            segments.push(segment.to_owned());
        }
        Ok(Self(segments))
    }
}

impl From<Vec<String>> for ConstructPath {
    fn from(segments: Vec<String>) -> Self {
        Self(segments)
    }
}

impl From<&[&str]> for ConstructPath {
    fn from(segments: &[&str]) -> Self {
        Self(segments.iter().map(|s| (*s).to_owned()).collect())
    }
}

/// Errors for construct id and path handling
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty construct id
    #[error("construct id must not be empty")]
    EmptyId,

    /// Id contains characters outside the allowed set
    #[error("invalid construct id {id:?}: only alphanumerics, '-' and '_' are allowed")]
    InvalidId {
        /// The rejected id
        id: String,
    },
}
