use std::fmt;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    BadBindAddress(String),
    BadPort(String),
    BadInterval(String),
    DirectoryDoesNotExist(String),
    DuplicateService(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::BadBindAddress(e) => write!(f, "Bind address error: {}", e),
            ConfigError::BadPort(e) => write!(f, "Port error: {}", e),
            ConfigError::BadInterval(e) => write!(f, "Interval error: {}", e),
            ConfigError::DirectoryDoesNotExist(e) => write!(f, "Directory error: {}", e),
            ConfigError::DuplicateService(e) => write!(f, "Duplicate service id: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Failures at the container runtime boundary.
///
/// `Unavailable` means the daemon itself could not be reached; the other
/// variants are per-call failures that callers may treat as partial.
#[derive(Debug)]
pub enum RuntimeError {
    Unavailable(String),
    Timeout(String),
    NotFound(String),
    Api(String),
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Unavailable(e) => write!(f, "Container runtime unavailable: {}", e),
            RuntimeError::Timeout(e) => write!(f, "Runtime call timed out: {}", e),
            RuntimeError::NotFound(e) => write!(f, "Container not found: {}", e),
            RuntimeError::Api(e) => write!(f, "Runtime API error: {}", e),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<bollard::errors::Error> for RuntimeError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => RuntimeError::NotFound(message),
            bollard::errors::Error::HyperResponseError { .. }
            | bollard::errors::Error::IOError { .. } => RuntimeError::Unavailable(err.to_string()),
            other => RuntimeError::Api(other.to_string()),
        }
    }
}

/// A reconciliation cycle failed as a whole.
///
/// Individual container stats failures never produce this; they degrade the
/// affected container's metrics instead.
#[derive(Debug)]
pub enum ReconcileError {
    RuntimeUnavailable(String),
}

impl fmt::Display for ReconcileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcileError::RuntimeUnavailable(e) => {
                write!(f, "Reconciliation failed, runtime unavailable: {}", e)
            }
        }
    }
}

impl std::error::Error for ReconcileError {}

#[derive(Debug)]
pub enum ControlError {
    UnknownService(String),
    UnknownContainer(String),
    CommandInFlight(String),
    Reconcile(ReconcileError),
    Runtime(RuntimeError),
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlError::UnknownService(id) => write!(f, "Unknown service: {}", id),
            ControlError::UnknownContainer(id) => write!(f, "Unknown container: {}", id),
            ControlError::CommandInFlight(key) => {
                write!(f, "A command is already in flight for: {}", key)
            }
            ControlError::Reconcile(e) => write!(f, "Reconcile error: {}", e),
            ControlError::Runtime(e) => write!(f, "Runtime error: {}", e),
        }
    }
}

impl std::error::Error for ControlError {}

impl From<ReconcileError> for ControlError {
    fn from(err: ReconcileError) -> Self {
        ControlError::Reconcile(err)
    }
}

impl From<RuntimeError> for ControlError {
    fn from(err: RuntimeError) -> Self {
        ControlError::Runtime(err)
    }
}

#[derive(Debug)]
pub enum WebError {
    BindError(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindError(e) => write!(f, "Web server bind error: {}", e),
        }
    }
}

impl std::error::Error for WebError {}
