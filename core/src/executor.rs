pub mod local;
pub mod remote;

use async_trait::async_trait;
use polyrun_webclient::{ExecutionRequest, ExecutionResult};

pub use self::{local::LocalExecutor, remote::RemoteExecutor};
use crate::error::ExecutorError;

/// One way of turning an [`ExecutionRequest`] into an [`ExecutionResult`].
///
/// Failures of the candidate program (compile errors, crashes, timeouts) are
/// reported inside `Ok`. `Err` means the executor itself could not do its
/// job.
#[async_trait]
pub trait Executor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn execute(&self, req: &ExecutionRequest) -> Result<ExecutionResult, ExecutorError>;
}
