//! Error types for the dispatch engine

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    Config { component: String, message: String },

    /// Target failed to initialize
    #[error("Target '{target}' failed to initialize: {message}")]
    TargetInit { target: String, message: String },

    /// Write to a target's sink failed
    #[error("Write error on target '{target}': {message}")]
    Write { target: String, message: String },

    /// Formatter failed to render a record
    #[error("Format error on target '{target}': {message}")]
    Format { target: String, message: String },

    /// Record dropped after waiting for queue space
    #[error("Queue full for '{target}' ({capacity} records): dropped after {timeout:?}")]
    EnqueueTimeout {
        target: String,
        capacity: usize,
        timeout: std::time::Duration,
    },

    /// Flush did not complete in time
    #[error("Flush did not complete within {timeout:?}")]
    FlushTimeout { timeout: std::time::Duration },

    /// Shutdown did not complete in time
    #[error("Shutdown did not complete within {timeout:?}")]
    ShutdownTimeout { timeout: std::time::Duration },

    /// A target did not drain its queue before the deadline
    #[error("Target '{target}' did not drain before the deadline")]
    TargetDrainTimeout { target: String },

    /// Engine already shut down (shutdown is terminal)
    #[error("Engine already shut down")]
    AlreadyShutdown,

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl EngineError {
    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Config {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a target initialization error
    pub fn target_init(target: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::TargetInit {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a write error
    pub fn write(target: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Write {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a format error
    pub fn format(target: impl Into<String>, message: impl Into<String>) -> Self {
        EngineError::Format {
            target: target.into(),
            message: message.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        EngineError::Other(msg.into())
    }

    /// Whether this error means "didn't finish in time" rather than "failed"
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            EngineError::EnqueueTimeout { .. }
                | EngineError::FlushTimeout { .. }
                | EngineError::ShutdownTimeout { .. }
                | EngineError::TargetDrainTimeout { .. }
        )
    }
}
