use std::{
    collections::HashMap,
    io,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use polyrun_webclient::{ErrorKind, ExecutionRequest, ExecutionResult};
use tokio::sync::Semaphore;

use super::Executor;
use crate::{
    error::ExecutorError,
    harness::{Harness, HarnessGenerator, Marker},
    lang::{LanguageSpec, LanguageTable},
    process::{ProcessOutcome, ProcessRunner, Termination},
    protocol,
};

/// Runs requests on this machine: harness, compile, run, parse.
///
/// Each request gets its own temporary directory, removed when the request
/// finishes whatever the outcome.
#[derive(Debug, Clone)]
pub struct LocalExecutor {
    languages: Arc<LanguageTable>,
    harness: HarnessGenerator,
    runner: ProcessRunner,
    compile_timeout: Duration,
    scratch_dir: Option<PathBuf>,
    permits: Arc<Semaphore>,
}

impl LocalExecutor {
    pub const DEFAULT_COMPILE_TIMEOUT: Duration = Duration::from_secs(30);

    pub fn new(languages: Arc<LanguageTable>) -> Self {
        Self {
            harness: HarnessGenerator::new(languages.clone()),
            languages,
            runner: ProcessRunner::new(),
            compile_timeout: Self::DEFAULT_COMPILE_TIMEOUT,
            scratch_dir: None,
            permits: Arc::new(Semaphore::new(default_parallelism())),
        }
    }

    pub fn process_runner(mut self, runner: ProcessRunner) -> Self {
        self.runner = runner;
        self
    }

    pub fn compile_timeout(mut self, timeout: Duration) -> Self {
        self.compile_timeout = timeout;
        self
    }

    /// Parent directory for per-request work dirs; the system temp dir when
    /// unset.
    pub fn scratch_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.scratch_dir = dir;
        self
    }

    pub fn max_concurrent_processes(mut self, n: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(n.max(1)));
        self
    }

    pub fn fixed_marker(mut self, marker: Option<Marker>) -> Self {
        self.harness = self.harness.fixed_marker(marker);
        self
    }

    pub fn languages(&self) -> &Arc<LanguageTable> {
        &self.languages
    }

    fn make_workdir(&self) -> io::Result<tempfile::TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("polyrun-");
        match &self.scratch_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
    }

    async fn execute_in(
        &self,
        workdir: &Path,
        spec: &LanguageSpec,
        req: &ExecutionRequest,
        harness: &Harness,
    ) -> Result<ExecutionResult, ExecutorError> {
        let src_path = workdir.join(spec.source_file_name());
        tokio::fs::write(&src_path, &harness.source)
            .await
            .map_err(|e| ExecutorError::local("Failed to write harness source", e))?;

        let vars: HashMap<&str, String> = [
            ("srcPath", src_path.to_string_lossy().into_owned()),
            ("binPath", workdir.join("main").to_string_lossy().into_owned()),
            ("workDir", workdir.to_string_lossy().into_owned()),
            ("className", spec.source_stem.to_owned()),
        ]
        .into_iter()
        .collect();

        if let Some(compile) = &spec.compile {
            let cmd = compile.resolve(&vars)?;
            let out = self
                .runner
                .compile(&cmd, self.compile_timeout, workdir)
                .await
                .map_err(|e| ExecutorError::local(format!("Failed to spawn '{}'", cmd.program), e))?;

            match out.termination {
                Termination::Exited(0) => {}
                Termination::TimedOut => {
                    return Ok(ExecutionResult::failure(
                        ErrorKind::TimeoutError.describe(format!(
                            "compilation did not finish within {}s",
                            self.compile_timeout.as_secs()
                        )),
                        out.stdout,
                        out.stderr,
                        req.timeout_ms(),
                    ));
                }
                Termination::Exited(_) | Termination::Signaled => {
                    let detail = failure_detail(&out);
                    return Ok(ExecutionResult::failure(
                        ErrorKind::CompileError.describe(detail),
                        out.stdout,
                        out.stderr,
                        0,
                    ));
                }
            }
        }

        let cmd = spec.run.resolve(&vars)?.arg(harness.argv_input.as_str());
        let out = self
            .runner
            .run(&cmd, req.timeout(), workdir)
            .await
            .map_err(|e| ExecutorError::local(format!("Failed to spawn '{}'", cmd.program), e))?;

        let parsed = protocol::parse(&out.stdout, &harness.marker);
        let time_ms = (out.elapsed.as_millis() as u64).min(req.timeout_ms());

        let res = match out.termination {
            Termination::TimedOut => ExecutionResult::failure(
                ErrorKind::TimeoutError.describe(format!(
                    "execution exceeded {}s",
                    req.timeout_seconds
                )),
                parsed.user_stdout,
                out.stderr,
                req.timeout_ms(),
            ),
            Termination::Exited(0) => ExecutionResult::success(
                parsed.payload.into_output(),
                parsed.user_stdout,
                out.stderr,
                time_ms,
            ),
            Termination::Exited(_) | Termination::Signaled => {
                let detail = failure_detail(&out);
                ExecutionResult::failure(
                    ErrorKind::RuntimeError.describe(detail),
                    parsed.user_stdout,
                    out.stderr,
                    time_ms,
                )
            }
        };
        Ok(res)
    }
}

#[async_trait]
impl Executor for LocalExecutor {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn execute(&self, req: &ExecutionRequest) -> Result<ExecutionResult, ExecutorError> {
        let Some(spec) = self.languages.get(req.language) else {
            return Ok(ExecutionResult::failure(
                ErrorKind::UnsupportedLanguage
                    .describe(format!("'{}' is not available", req.language)),
                "",
                "",
                0,
            ));
        };

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| {
                ExecutorError::local("Executor is shut down", io::Error::new(io::ErrorKind::Other, e))
            })?;

        let harness = self.harness.generate(&req.code, req.language, &req.input)?;
        log::debug!(
            "Harness for {} generated, entry point: {:?}",
            req.language,
            harness.entry
        );

        let workdir = self
            .make_workdir()
            .map_err(|e| ExecutorError::local("Failed to create work dir", e))?;
        log::debug!("Work dir: {}", workdir.path().to_string_lossy());

        let res = self.execute_in(workdir.path(), spec, req, &harness).await;

        let workdir_path = workdir.path().to_owned();
        workdir.close().unwrap_or_else(|e| {
            log::warn!(
                "Failed to remove work dir {}: {:#}",
                workdir_path.to_string_lossy(),
                e
            )
        });

        res
    }
}

fn failure_detail(out: &ProcessOutcome) -> String {
    let stderr = out.stderr.trim();
    if !stderr.is_empty() {
        return stderr.to_owned();
    }
    match out.termination {
        Termination::Exited(code) => format!("exit code {}", code),
        _ => "terminated by signal".to_owned(),
    }
}

fn default_parallelism() -> usize {
    std::thread::available_parallelism().map_or(4, |n| n.get())
}
