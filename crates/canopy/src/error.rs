//! Error types for tree construction, resolution and rendering.

use std::time::Duration;

use thiserror::Error;

use crate::boundary::BoundaryKind;

/// Errors raised while building a route tree or resolving boundaries.
///
/// All variants indicate a misconfigured pages directory and are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// Two definitions claim the same place in the tree.
    #[error("conflicting routes `{first}` and `{second}`: {reason}")]
    ConflictingRoute {
        first: String,
        second: String,
        reason: String,
    },

    /// Boundary lookup reached the root without finding a handler.
    #[error("no {kind} boundary defined for `{path}`")]
    NoBoundaryDefined { kind: BoundaryKind, path: String },

    /// A directory name that does not follow the segment conventions.
    #[error("invalid segment `{segment}`: {reason}")]
    InvalidSegment { segment: String, reason: String },

    /// A file whose stem is not one of the convention names.
    #[error("unknown convention file `{0}`")]
    UnknownFile(String),
}

impl RouteError {
    pub(crate) fn conflict(
        first: impl Into<String>,
        second: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::ConflictingRoute {
            first: first.into(),
            second: second.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid(segment: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSegment {
            segment: segment.into(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by components while rendering a request.
///
/// `HandlerFailure` and `Timeout` are recovered by the nearest error
/// boundary, `NotFound` by the nearest not-found boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("handler for `{segment}` failed: {message}")]
    HandlerFailure { segment: String, message: String },

    #[error("not found")]
    NotFound,

    #[error("handler for `{segment}` timed out after {elapsed:?}")]
    Timeout { segment: String, elapsed: Duration },

    #[error(transparent)]
    Route(#[from] RouteError),
}

impl RenderError {
    /// Signal from a page that no content exists for its parameters.
    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Wraps any displayable failure raised by a component.
    ///
    /// The segment is filled in by the renderer when the error escapes the
    /// component, so components can pass an empty string.
    pub fn failure(message: impl std::fmt::Display) -> Self {
        Self::HandlerFailure {
            segment: String::new(),
            message: message.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// The boundary kind able to recover this error, if any.
    pub fn boundary_kind(&self) -> Option<BoundaryKind> {
        match self {
            Self::NotFound => Some(BoundaryKind::NotFound),
            Self::HandlerFailure { .. } | Self::Timeout { .. } => Some(BoundaryKind::Error),
            Self::Route(_) => None,
        }
    }

    pub(crate) fn at_segment(self, segment: &str) -> Self {
        match self {
            Self::HandlerFailure { segment: s, message } if s.is_empty() => Self::HandlerFailure {
                segment: segment.to_string(),
                message,
            },
            other => other,
        }
    }
}

impl From<anyhow::Error> for RenderError {
    fn from(err: anyhow::Error) -> Self {
        Self::failure(format!("{err:#}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_kind_for_errors() {
        assert_eq!(RenderError::not_found().boundary_kind(), Some(BoundaryKind::NotFound));
        assert_eq!(RenderError::failure("boom").boundary_kind(), Some(BoundaryKind::Error));
        let route = RenderError::from(RouteError::UnknownFile("x".into()));
        assert_eq!(route.boundary_kind(), None);
    }

    #[test]
    fn test_at_segment_fills_only_empty_segment() {
        let err = RenderError::failure("boom").at_segment("/users");
        assert_eq!(
            err,
            RenderError::HandlerFailure {
                segment: "/users".into(),
                message: "boom".into()
            }
        );
        assert_eq!(err.clone().at_segment("/other"), err);
    }

    #[test]
    fn test_anyhow_conversion_keeps_context() {
        let err: RenderError = anyhow::anyhow!("db down").context("loading users").into();
        match err {
            RenderError::HandlerFailure { message, .. } => {
                assert_eq!(message, "loading users: db down")
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
