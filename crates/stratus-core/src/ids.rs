//! Deterministic logical-id derivation
//!
//! Provides [`LogicalId`], the template-level name of a realized resource,
//! derived purely from the construct path that produced it.

use std::fmt::{self, Display, Formatter};

use crate::path::ConstructPath;

/// Number of hash bytes folded into the id suffix
const SUFFIX_BYTES: usize = 4;

/// Logical id of a resource in a rendered template
///
/// Concatenation of the alphanumeric characters of every path segment,
/// followed by an uppercase hex digest of the full path. The human-readable
/// prefix keeps templates scannable; the suffix keeps ids collision-free
/// when distinct paths sanitize to the same prefix.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LogicalId(String);

impl LogicalId {
    /// Derive the logical id for a construct path
    #[must_use]
    pub fn from_path(path: &ConstructPath) -> Self {
        let mut id = String::new();
        for segment in path.segments() {
            id.extend(segment.chars().filter(char::is_ascii_alphanumeric));
        }
        let digest = blake3::hash(path.to_string().as_bytes());
        id.push_str(&hex::encode(&digest.as_bytes()[..SUFFIX_BYTES]).to_uppercase());
        Self(id)
    }

    /// Get id as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the underlying string
    #[inline]
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Display for LogicalId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<LogicalId> for String {
    fn from(id: LogicalId) -> Self {
        id.0
    }
}
