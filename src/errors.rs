use thiserror::Error;

/// Errors raised while turning an analysis result into a wire value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error("cannot encode {what}")]
    Unencodable { what: String },

    #[error("map keys collide after string coercion: '{key}'")]
    KeyCollision { key: String },
}

/// Errors that can occur while registering, dispatching, or serving operations.
#[derive(Error, Debug)]
pub enum CocoaError {
    #[error("operation '{name}' is already registered")]
    DuplicateName { name: String },

    #[error("unknown operation: {name}")]
    UnknownOperation { name: String },

    #[error("invalid arguments for '{operation}': {message}")]
    InvalidArguments { operation: String, message: String },

    #[error("analysis context is not ready: {detail}")]
    ContextNotReady { detail: String },

    #[error("analysis context is closed")]
    ContextClosed,

    #[error("analysis error: {message}")]
    Analysis { message: String },

    #[error("encoding error: {0}")]
    Encoding(#[from] EncodeError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Stable failure tags reported to clients alongside the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    DuplicateName,
    UnknownOperation,
    InvalidArguments,
    ContextNotReady,
    ContextClosed,
    Analysis,
    Encoding,
    KeyCollision,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateName => "DuplicateNameError",
            Self::UnknownOperation => "UnknownOperationError",
            Self::InvalidArguments => "InvalidArgumentsError",
            Self::ContextNotReady => "ContextNotReadyError",
            Self::ContextClosed => "ContextClosedError",
            Self::Analysis => "AnalysisError",
            Self::Encoding => "EncodingError",
            Self::KeyCollision => "KeyCollisionError",
            Self::Internal => "InternalError",
        }
    }
}

impl CocoaError {
    /// Classifies the error into the tag surfaced to callers.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::DuplicateName { .. } => FailureKind::DuplicateName,
            Self::UnknownOperation { .. } => FailureKind::UnknownOperation,
            Self::InvalidArguments { .. } => FailureKind::InvalidArguments,
            Self::ContextNotReady { .. } => FailureKind::ContextNotReady,
            Self::ContextClosed => FailureKind::ContextClosed,
            Self::Analysis { .. } => FailureKind::Analysis,
            Self::Encoding(EncodeError::KeyCollision { .. }) => FailureKind::KeyCollision,
            Self::Encoding(_) => FailureKind::Encoding,
            Self::Config { .. } | Self::Io(_) | Self::Json(_) | Self::Toml(_) => {
                FailureKind::Internal
            }
        }
    }

    /// Shorthand for an engine-level query failure.
    pub fn analysis(message: impl Into<String>) -> Self {
        Self::Analysis {
            message: message.into(),
        }
    }

    pub fn invalid_arguments(operation: &str, message: impl Into<String>) -> Self {
        Self::InvalidArguments {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}

/// Convenience alias for results using `CocoaError`.
pub type Result<T> = std::result::Result<T, CocoaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_collision_is_tagged_separately() {
        let err: CocoaError = EncodeError::KeyCollision {
            key: "a.b".to_string(),
        }
        .into();
        assert_eq!(err.kind(), FailureKind::KeyCollision);
        assert_eq!(err.kind().as_str(), "KeyCollisionError");
    }

    #[test]
    fn test_unencodable_is_encoding_error() {
        let err: CocoaError = EncodeError::Unencodable {
            what: "NaN".to_string(),
        }
        .into();
        assert_eq!(err.kind(), FailureKind::Encoding);
        assert!(err.to_string().contains("NaN"));
    }

    #[test]
    fn test_ambient_errors_are_internal() {
        let err = CocoaError::Config {
            message: "bad".to_string(),
        };
        assert_eq!(err.kind(), FailureKind::Internal);
    }
}
