//! Cloud resource error types

use thiserror::Error;

/// Errors raised by the reconciliation core and its providers
#[derive(Error, Debug)]
pub enum CloudError {
    /// Transport or API failure reported by a backend. Never retried here.
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal Error: {0}")]
    Internal(String),

    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A lifecycle sub-step failed. Earlier steps of the same call are not rolled back.
    #[error("{step} failed: {source}")]
    StepFailed {
        step: String,
        #[source]
        source: Box<CloudError>,
    },
}

impl CloudError {
    pub fn backend(message: impl Into<String>) -> Self {
        CloudError::Backend(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        CloudError::InvalidArgument(message.into())
    }

    /// Wrap this error with the name of the lifecycle step that produced it
    pub fn in_step(self, step: impl Into<String>) -> Self {
        CloudError::StepFailed {
            step: step.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping step context
    pub fn root(&self) -> &CloudError {
        match self {
            CloudError::StepFailed { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_backend(&self) -> bool {
        matches!(self.root(), CloudError::Backend(_))
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self.root(), CloudError::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, CloudError>;

/// Attach a step name to the error of a lifecycle sub-step
pub trait StepContext<T> {
    fn step(self, step: impl FnOnce() -> String) -> Result<T>;
}

impl<T> StepContext<T> for Result<T> {
    fn step(self, step: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| e.in_step(step()))
    }
}
