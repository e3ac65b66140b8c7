use std::{io, path::Path, process::Stdio, time::Duration};

use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Command,
    time::Instant,
};

use crate::lang::ResolvedCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Exited(i32),
    /// Killed by a signal other than the timeout kill.
    Signaled,
    TimedOut,
}

impl Termination {
    pub fn success(&self) -> bool {
        matches!(self, Termination::Exited(0))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    pub termination: Termination,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Spawns one command at a time and waits for it under a wall-clock limit.
///
/// Commands are executed directly, never through a shell. stdin is closed,
/// stdout and stderr are captured up to a byte cap each.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    stdout_capture_max_bytes: usize,
    stderr_capture_max_bytes: usize,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner {
    pub const DEFAULT_CAPTURE_MAX_BYTES: usize = 1 << 20;

    /// How long the pipes are still drained after a timed-out child was
    /// killed. Grandchildren may hold them open.
    const KILL_GRACE: Duration = Duration::from_millis(200);

    pub fn new() -> Self {
        Self {
            stdout_capture_max_bytes: Self::DEFAULT_CAPTURE_MAX_BYTES,
            stderr_capture_max_bytes: Self::DEFAULT_CAPTURE_MAX_BYTES,
        }
    }

    pub fn stdout_capture_max_bytes(mut self, n: usize) -> Self {
        self.stdout_capture_max_bytes = n;
        self
    }

    pub fn stderr_capture_max_bytes(mut self, n: usize) -> Self {
        self.stderr_capture_max_bytes = n;
        self
    }

    pub async fn compile(
        &self,
        cmd: &ResolvedCommand,
        limit: Duration,
        cwd: &Path,
    ) -> io::Result<ProcessOutcome> {
        log::info!("Compiling: {}", cmd);
        self.spawn_and_wait(cmd, limit, cwd).await
    }

    pub async fn run(
        &self,
        cmd: &ResolvedCommand,
        limit: Duration,
        cwd: &Path,
    ) -> io::Result<ProcessOutcome> {
        log::info!("Running: {}", cmd);
        self.spawn_and_wait(cmd, limit, cwd).await
    }

    async fn spawn_and_wait(
        &self,
        cmd: &ResolvedCommand,
        limit: Duration,
        cwd: &Path,
    ) -> io::Result<ProcessOutcome> {
        let mut proc = Command::new(&cmd.program)
            .args(&cmd.args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdout = proc
            .stdout
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Failed to open stdout"))?;
        let mut stderr = proc
            .stderr
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Failed to open stderr"))?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let (out_cap, err_cap) = (self.stdout_capture_max_bytes, self.stderr_capture_max_bytes);

        let start_at = Instant::now();
        let res = tokio::time::timeout(limit, async {
            tokio::try_join!(
                drain_capped(&mut stdout, &mut stdout_buf, out_cap),
                drain_capped(&mut stderr, &mut stderr_buf, err_cap),
                proc.wait()
            )
        })
        .await;

        let termination = match res {
            Ok(Ok((_, _, status))) => match status.code() {
                Some(code) => Termination::Exited(code),
                None => Termination::Signaled,
            },

            Ok(Err(e)) => return Err(e),

            Err(_) => {
                proc.kill()
                    .await
                    .unwrap_or_else(|e| log::warn!("Failed to kill timed-out process: {:#}", e));
                let _ = tokio::time::timeout(Self::KILL_GRACE, async {
                    tokio::join!(
                        drain_capped(&mut stdout, &mut stdout_buf, out_cap),
                        drain_capped(&mut stderr, &mut stderr_buf, err_cap)
                    )
                })
                .await;
                Termination::TimedOut
            }
        };
        let elapsed = start_at.elapsed();

        log::debug!("{} finished: {:?} in {:?}", cmd.program, termination, elapsed);

        Ok(ProcessOutcome {
            termination,
            stdout: String::from_utf8_lossy(&stdout_buf).into_owned(),
            stderr: String::from_utf8_lossy(&stderr_buf).into_owned(),
            elapsed,
        })
    }
}

/// Reads `reader` to EOF, keeping at most `cap` bytes in `buf`. The rest is
/// read and dropped so the child never blocks on a full pipe.
///
/// Cancel-safe: whatever was read before cancellation stays in `buf`.
async fn drain_capped<R>(reader: &mut R, buf: &mut Vec<u8>, cap: usize) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    let mut truncated = false;
    loop {
        let n = reader.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let room = cap.saturating_sub(buf.len());
        if n > room && !truncated {
            truncated = true;
            log::warn!("Captured output exceeds {} bytes, truncating", cap);
        }
        buf.extend_from_slice(&chunk[..n.min(room)]);
    }
    Ok(())
}
