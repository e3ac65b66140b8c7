use std::io;

pub use polyrun_webclient::ErrorKind;
use polyrun_webclient::Language;

use crate::str_interp::InterpError;

#[derive(thiserror::Error, Debug)]
pub enum HarnessError {
    #[error("No harness available for language '{0}'")]
    UnsupportedLanguage(Language),

    #[error("Harness template '{0}' is not embedded")]
    MissingTemplate(String),

    #[error("Failed to render harness template '{template}': {source}")]
    Render {
        template: String,

        #[source]
        source: InterpError,
    },

    #[error("Invalid result marker {0:?}")]
    InvalidMarker(String),

    #[error("Failed to encode input as JSON: {0}")]
    Input(#[from] serde_json::Error),
}

/// Infrastructure failures of an executor.
///
/// Compile errors, runtime errors, timeouts and undecodable payloads are not
/// errors at this level; they are reported inside the `ExecutionResult`.
#[derive(thiserror::Error, Debug)]
pub enum ExecutorError {
    #[error("Cannot reach execution service: {0}")]
    Connection(#[source] polyrun_webclient::Error),

    #[error("{context}: {source}")]
    Local {
        context: String,

        #[source]
        source: io::Error,
    },

    #[error("Invalid command template: {0}")]
    Command(#[from] InterpError),

    #[error(transparent)]
    Harness(#[from] HarnessError),
}

impl ExecutorError {
    pub fn is_connection(&self) -> bool {
        matches!(self, ExecutorError::Connection(_))
    }

    pub(crate) fn local(context: impl Into<String>, source: io::Error) -> Self {
        ExecutorError::Local {
            context: context.into(),
            source,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CoordinatorError {
    #[error("Execution service unreachable ({remote}) and local execution failed ({local})")]
    Exhausted {
        remote: ExecutorError,
        local: ExecutorError,
    },

    #[error("Local execution failed: {0}")]
    Local(#[source] ExecutorError),
}
