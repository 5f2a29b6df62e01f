//! Error types for entlink.
//!
//! All errors are strongly typed using thiserror. An identifier that does
//! not currently resolve to a present entity is *not* an error anywhere in
//! this crate; it is the invalid/waiting state of the link.

use thiserror::Error;

/// Errors raised while creating a link, before any state is installed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    /// The attribute name was empty.
    #[error("Attribute name cannot be empty")]
    EmptyAttribute,
}

/// Errors raised by operating on the host surface incorrectly.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UsageError {
    /// The attribute has no link.
    #[error("No link at attribute '{attribute}'")]
    NoLink {
        /// The attribute that was queried.
        attribute: String,
    },
}

/// Top-level error type for entlink operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// Invalid arguments at link creation.
    #[error("Construction error: {0}")]
    Construction(#[from] ConstructionError),

    /// Invalid operation on the host surface.
    #[error("Usage error: {0}")]
    Usage(#[from] UsageError),
}

impl LinkError {
    /// Returns true if this is a construction error.
    #[must_use]
    pub const fn is_construction(&self) -> bool {
        matches!(self, Self::Construction(_))
    }

    /// Returns true if this is a usage error.
    #[must_use]
    pub const fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_))
    }
}

/// Result type alias for entlink operations.
pub type LinkResult<T> = Result<T, LinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_error_display() {
        let err = ConstructionError::EmptyAttribute;
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_usage_error_display() {
        let err = UsageError::NoLink {
            attribute: "owner".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("No link"));
        assert!(msg.contains("owner"));
    }

    #[test]
    fn test_link_error_from_construction() {
        let err: LinkError = ConstructionError::EmptyAttribute.into();
        assert!(err.is_construction());
        assert!(!err.is_usage());
    }

    #[test]
    fn test_link_error_from_usage() {
        let err: LinkError = UsageError::NoLink {
            attribute: "foo".to_string(),
        }
        .into();
        assert!(err.is_usage());
        assert!(!err.is_construction());
    }
}
