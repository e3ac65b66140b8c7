use std::time::Duration;

use async_trait::async_trait;
use polyrun_webclient::{
    Error as WebError, ErrorKind, ExecutionRequest, ExecutionResult, ExecutionServiceClient,
};

use super::Executor;
use crate::error::ExecutorError;

/// Forwards requests to the remote execution microservice.
#[derive(Debug, Clone)]
pub struct RemoteExecutor {
    client: ExecutionServiceClient,
    extra_timeout: Duration,
}

impl RemoteExecutor {
    /// Added to the request's own budget to cover transport and queueing.
    pub const DEFAULT_EXTRA_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(client: ExecutionServiceClient) -> Self {
        Self {
            client,
            extra_timeout: Self::DEFAULT_EXTRA_TIMEOUT,
        }
    }

    pub fn extra_timeout(mut self, extra: Duration) -> Self {
        self.extra_timeout = extra;
        self
    }

    pub fn client(&self) -> &ExecutionServiceClient {
        &self.client
    }
}

#[async_trait]
impl Executor for RemoteExecutor {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn execute(&self, req: &ExecutionRequest) -> Result<ExecutionResult, ExecutorError> {
        let budget = req.timeout() + self.extra_timeout;

        match self.client.execute(req, budget).await {
            Ok(res) => Ok(res),

            Err(e) if e.is_connection() => Err(ExecutorError::Connection(e)),

            // The service may still be running the code; never run it twice.
            Err(WebError::Timeout { .. }) => {
                log::warn!("Execution service did not answer within {:?}", budget);
                Ok(ExecutionResult::failure(
                    ErrorKind::TimeoutError.describe(format!(
                        "execution service did not respond within {}s",
                        budget.as_secs()
                    )),
                    "",
                    "",
                    req.timeout_ms(),
                ))
            }

            Err(WebError::UnexpectedResponseCode { got, body, .. }) => {
                let body = body.trim();
                let error = if body.is_empty() {
                    format!("Execution service responded with {}", got)
                } else {
                    body.to_owned()
                };
                Ok(ExecutionResult::failure(error, "", "", 0))
            }

            Err(WebError::Json(e)) => Ok(ExecutionResult::failure(
                ErrorKind::ResultParseError
                    .describe(format!("undecodable response from execution service: {}", e)),
                "",
                "",
                0,
            )),

            // The request may have reached the service, so no fallback either.
            Err(e) => {
                log::warn!("Execution service request failed: {:#}", e);
                Ok(ExecutionResult::failure(
                    ErrorKind::ConnectionError
                        .describe(format!("execution service request failed: {}", e)),
                    "",
                    "",
                    0,
                ))
            }
        }
    }
}
