//! DOM errors
//!
//! Recoverable API misuse surfaces as a [`DomError`]. Each variant maps to
//! the DOMException name scripts observe.

/// Result type for DOM operations
pub type DomResult<T> = Result<T, DomError>;

/// DOM operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomError {
    /// Illegal tree shape (cycles, wrong child type, second root element)
    #[error("HierarchyRequestError: {0}")]
    HierarchyRequest(String),

    /// Reference node is not a child of the given parent
    #[error("NotFoundError: {0}")]
    NotFound(String),

    /// Malformed element or attribute name
    #[error("InvalidCharacterError: {0}")]
    InvalidCharacter(String),

    /// Torn-down node, invalidated wrapper, or wrong lifecycle state
    #[error("InvalidStateError: {0}")]
    InvalidState(String),

    /// Operation applied to a node type that does not support it
    #[error("InvalidNodeTypeError: {0}")]
    InvalidNodeType(String),

    /// Feature disabled or not implemented for this node kind
    #[error("NotSupportedError: {0}")]
    NotSupported(String),

    /// Same-origin check failed
    #[error("SecurityError: {0}")]
    Security(String),

    /// Malformed argument (observer options and the like)
    #[error("TypeError: {0}")]
    Type(String),

    /// Attribute or index lookup miss; most callers turn this into `None`
    #[error("IndexSizeError: {0}")]
    IndexSizeOrNotFound(String),
}

impl DomError {
    /// DOMException name
    pub fn name(&self) -> &'static str {
        match self {
            Self::HierarchyRequest(_) => "HierarchyRequestError",
            Self::NotFound(_) => "NotFoundError",
            Self::InvalidCharacter(_) => "InvalidCharacterError",
            Self::InvalidState(_) => "InvalidStateError",
            Self::InvalidNodeType(_) => "InvalidNodeTypeError",
            Self::NotSupported(_) => "NotSupportedError",
            Self::Security(_) => "SecurityError",
            Self::Type(_) => "TypeError",
            Self::IndexSizeOrNotFound(_) => "IndexSizeError",
        }
    }

    /// Message without the name prefix
    pub fn message(&self) -> &str {
        match self {
            Self::HierarchyRequest(m)
            | Self::NotFound(m)
            | Self::InvalidCharacter(m)
            | Self::InvalidState(m)
            | Self::InvalidNodeType(m)
            | Self::NotSupported(m)
            | Self::Security(m)
            | Self::Type(m)
            | Self::IndexSizeOrNotFound(m) => m,
        }
    }

    pub(crate) fn hierarchy(message: impl Into<String>) -> Self {
        Self::HierarchyRequest(message.into())
    }

    pub(crate) fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }
}

/// Failure raised by an observer callback
///
/// Never unwinds through tree mutation; delivery reports it to the host
/// error channel and moves on to the next observer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CallbackError {
    pub message: String,
}

impl CallbackError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<DomError> for CallbackError {
    fn from(err: DomError) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_names() {
        let err = DomError::hierarchy("cycle");
        assert_eq!(err.name(), "HierarchyRequestError");
        assert_eq!(err.message(), "cycle");
        assert_eq!(err.to_string(), "HierarchyRequestError: cycle");

        let err = DomError::invalid_state("wrapper invalidated");
        assert_eq!(err.name(), "InvalidStateError");
    }

    #[test]
    fn test_callback_error_from_dom_error() {
        let err: CallbackError = DomError::NotFound("x".into()).into();
        assert_eq!(err.message, "NotFoundError: x");
    }
}
