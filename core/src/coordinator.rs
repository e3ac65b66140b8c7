//! Remote-first execution with local fallback, plus test-case judging.

use polyrun_webclient::{ErrorKind, ExecutionRequest, ExecutionResult, Language, Value};
use serde::{Deserialize, Serialize};

use crate::{compare::compare, error::CoordinatorError, executor::Executor};

/// Outcome class of a judged test case.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
pub enum Verdict {
    #[strum(serialize = "AC")]
    Accepted,
    #[strum(serialize = "WA")]
    WrongAnswer,
    #[strum(serialize = "CE")]
    CompileError,
    #[strum(serialize = "RE")]
    RuntimeError,
    #[strum(serialize = "TLE")]
    TimeLimitExceeded,
    /// Any other failure, e.g. an unsupported language.
    #[strum(serialize = "ERR")]
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCaseResult {
    pub name: Option<String>,
    pub result: ExecutionResult,
    pub expected: Value,
    pub passed: bool,
}

impl TestCaseResult {
    pub fn verdict(&self) -> Verdict {
        if self.passed {
            return Verdict::Accepted;
        }
        if self.result.is_success() {
            return Verdict::WrongAnswer;
        }
        match self.result.error_kind() {
            Some(ErrorKind::CompileError) => Verdict::CompileError,
            Some(ErrorKind::RuntimeError) => Verdict::RuntimeError,
            Some(ErrorKind::TimeoutError) => Verdict::TimeLimitExceeded,
            _ => Verdict::Failed,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunResult {
    pub cases: Vec<TestCaseResult>,
    pub all_passed: bool,
    pub total_time_ms: u64,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    pub fn from_cases(cases: Vec<TestCaseResult>) -> Self {
        let all_passed = cases.iter().all(|c| c.passed);
        let total_time_ms = cases.iter().map(|c| c.result.time_ms).sum();
        let stdout = cases.iter().map(|c| c.result.stdout.as_str()).collect();
        let stderr = cases.iter().map(|c| c.result.stderr.as_str()).collect();
        Self {
            cases,
            all_passed,
            total_time_ms,
            stdout,
            stderr,
        }
    }

    pub fn num_passed(&self) -> usize {
        self.cases.iter().filter(|c| c.passed).count()
    }
}

/// One program judged against several inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suite {
    pub code: String,
    pub language: Language,
    #[serde(rename = "timeout", default = "Suite::default_timeout_seconds")]
    pub timeout_seconds: u64,
    pub cases: Vec<SuiteCase>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteCase {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub input: Value,
    #[serde(default)]
    pub expected: Value,
}

impl Suite {
    pub const DEFAULT_TIMEOUT_SECONDS: u64 = 5;

    fn default_timeout_seconds() -> u64 {
        Self::DEFAULT_TIMEOUT_SECONDS
    }

    pub fn request(&self, case: &SuiteCase) -> ExecutionRequest {
        ExecutionRequest::new(
            self.code.clone(),
            self.language,
            case.input.clone(),
            self.timeout_seconds,
        )
    }
}

/// Tries the remote executor first and falls back to the local one only
/// when the remote could not be reached at all.
pub struct Coordinator {
    remote: Option<Box<dyn Executor>>,
    local: Box<dyn Executor>,
}

impl Coordinator {
    pub fn new(local: impl Executor + 'static) -> Self {
        Self {
            remote: None,
            local: Box::new(local),
        }
    }

    pub fn with_remote(mut self, remote: impl Executor + 'static) -> Self {
        self.remote = Some(Box::new(remote));
        self
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    pub async fn execute(
        &self,
        req: &ExecutionRequest,
    ) -> Result<ExecutionResult, CoordinatorError> {
        let Some(remote) = &self.remote else {
            return self.local.execute(req).await.map_err(CoordinatorError::Local);
        };

        match remote.execute(req).await {
            Ok(res) => Ok(res),
            Err(remote) if remote.is_connection() => {
                log::info!("{}; falling back to {} execution", remote, self.local.name());
                self.local
                    .execute(req)
                    .await
                    .map_err(|local| CoordinatorError::Exhausted { remote, local })
            }
            // Not a reachability problem: the code may have run remotely.
            Err(e) => {
                log::warn!("{} execution failed: {:#}", remote.name(), e);
                Ok(ExecutionResult::failure(
                    ErrorKind::ConnectionError
                        .describe(format!("{} execution failed: {}", remote.name(), e)),
                    "",
                    "",
                    0,
                ))
            }
        }
    }

    pub async fn run_test_case(
        &self,
        name: Option<String>,
        req: &ExecutionRequest,
        expected: &Value,
    ) -> Result<TestCaseResult, CoordinatorError> {
        let result = self.execute(req).await?;
        let passed = result.is_success()
            && compare(result.output.as_ref().unwrap_or(&Value::Null), expected);
        Ok(TestCaseResult {
            name,
            result,
            expected: expected.clone(),
            passed,
        })
    }

    /// Runs the cases in order.
    pub async fn run_suite(&self, suite: &Suite) -> Result<RunResult, CoordinatorError> {
        let mut cases = Vec::with_capacity(suite.cases.len());
        for case in &suite.cases {
            let res = self
                .run_test_case(case.name.clone(), &suite.request(case), &case.expected)
                .await?;
            cases.push(res);
        }
        Ok(RunResult::from_cases(cases))
    }
}

impl CoordinatorError {
    /// The error as a wire-format failure result.
    pub fn to_result(&self) -> ExecutionResult {
        let error = match self {
            CoordinatorError::Exhausted { .. } => {
                ErrorKind::ConnectionError.describe(self.to_string())
            }
            _ => self.to_string(),
        };
        ExecutionResult::failure(error, "", "", 0)
    }
}
