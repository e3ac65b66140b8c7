pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};
}
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use error::*;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use polyrun_webclient::{ExecutionRequest, ExecutionResult};
use tokio::sync::Mutex;

use crate::config::Config;
use crate::coordinator::{Coordinator, RunResult, Suite};
use crate::style;

/// Writes the example config into `dir`.
pub fn init_config(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let path = dir.as_ref().join(Config::FILENAME);
    ensure!(
        !path.exists(),
        "{} already exists",
        path.to_string_lossy()
    );
    std::fs::write(&path, Config::example_toml())
        .with_context(|| format!("Failed to write {}", path.to_string_lossy()))?;
    Ok(path)
}

/// Executes one request. Infrastructure failures are folded into a failed
/// result.
pub async fn execute(coord: &Coordinator, req: &ExecutionRequest) -> ExecutionResult {
    match coord.execute(req).await {
        Ok(res) => res,
        Err(e) => {
            log::error!("{:#}", e);
            e.to_result()
        }
    }
}

fn case_name(suite: &Suite, i: usize) -> String {
    suite.cases[i]
        .name
        .clone()
        .unwrap_or_else(|| format!("#{}", i + 1))
}

/// Runs every case of `suite` with a spinner per case, then prints the
/// failed cases in detail and a summary line.
pub async fn run_suite_with_progress(coord: &Coordinator, suite: &Suite) -> Result<RunResult> {
    ensure!(!suite.cases.is_empty(), "Suite has no test cases");

    let style = ProgressStyle::default_bar()
        .template("{spinner} {msg}")
        .context("Invalid progress template")?;

    let mut bars = Vec::with_capacity(suite.cases.len());
    let progress_bar_container = MultiProgress::new();

    for i in 0..suite.cases.len() {
        let bar = progress_bar_container
            .add(ProgressBar::new(100))
            .with_style(style.clone())
            .with_message(format!("Testcase {} ...", case_name(suite, i)));
        let bar = Arc::new(Mutex::new(bar));
        bars.push(bar.clone());

        // Tick spinner
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_millis(50)).await;
                let bar = bar.lock().await;
                if bar.is_finished() {
                    break;
                }
                bar.tick();
            }
        });
    }

    let mut cases = Vec::with_capacity(suite.cases.len());
    for (i, (case, bar)) in suite.cases.iter().zip(&bars).enumerate() {
        let res = coord
            .run_test_case(case.name.clone(), &suite.request(case), &case.expected)
            .await;
        let res = match res {
            Ok(res) => res,
            Err(e) => {
                for bar in &bars {
                    bar.lock().await.abandon();
                }
                return Err(e).context("Failed to execute test case");
            }
        };

        let verdict = res.verdict();
        bar.lock().await.finish_with_message({
            format!(
                "Testcase {} ... {} [{}ms]",
                case_name(suite, i),
                style::verdict_label(verdict),
                res.result.time_ms,
            )
            .cyan()
            .to_string()
        });
        cases.push(res);
    }
    println!();

    for (i, case) in cases.iter().enumerate() {
        if !case.passed {
            style::print_case_detail(&case_name(suite, i), case);
        }
    }

    let res = RunResult::from_cases(cases);
    style::print_run_summary(&res);
    Ok(res)
}
