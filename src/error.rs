use std::io;
use thiserror::Error;

/// Custom error type for the sysmon engine
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Probe failure ({resource}): {message}")]
    Probe { resource: String, message: String },

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("Setup failure: {0}")]
    Setup(String),

    #[error("Fatal loop failure: {0}")]
    FatalLoop(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for the sysmon engine
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    /// Create a probe failure for the named resource
    pub fn probe<R: Into<String>, S: Into<String>>(resource: R, msg: S) -> Self {
        MonitorError::Probe {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        MonitorError::Config(msg.into())
    }

    pub fn notify<S: Into<String>>(msg: S) -> Self {
        MonitorError::Notify(msg.into())
    }

    /// Create a setup error (OS handle or counter unobtainable)
    pub fn setup<S: Into<String>>(msg: S) -> Self {
        MonitorError::Setup(msg.into())
    }

    pub fn fatal_loop<S: Into<String>>(msg: S) -> Self {
        MonitorError::FatalLoop(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        MonitorError::Other(msg.into())
    }
}

/// Failure of the outbound alert notification capability.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("endpoint rejected notification with status {status}")]
    Rejected { status: u16 },

    #[error("notification channel is not configured")]
    NotConfigured,
}

impl From<NotifyError> for MonitorError {
    fn from(err: NotifyError) -> Self {
        MonitorError::Notify(err.to_string())
    }
}
