use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context as _};
use polyrun_core::{action, Suite, SuiteCase};
use polyrun_webclient::Language;
use serde::Deserialize;

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    /// Suite file (JSON)
    #[arg()] // positional argument
    pub suite_file: PathBuf,

    /// Print the run result as JSON instead of progress and details
    #[arg(long)]
    pub json: bool,

    #[arg(long)]
    pub local_only: bool,
}

/// On-disk suite. `code_file` is relative to the suite file.
#[derive(Debug, Deserialize)]
struct SuiteFile {
    code: Option<String>,
    code_file: Option<PathBuf>,
    language: Option<Language>,
    timeout: Option<u64>,
    cases: Vec<SuiteCase>,
}

impl SuiteFile {
    fn into_suite(self, base_dir: &Path) -> anyhow::Result<Suite> {
        let (code, language) = match (self.code, self.code_file) {
            (Some(code), None) => {
                let lang = self
                    .language
                    .ok_or_else(|| anyhow!("\"language\" is required with inline \"code\""))?;
                (code, lang)
            }
            (None, Some(file)) => util::read_source(&base_dir.join(file), self.language)?,
            _ => return Err(anyhow!("Exactly one of \"code\" and \"code_file\" is required")),
        };
        Ok(Suite {
            code,
            language,
            timeout_seconds: util::check_timeout(
                self.timeout.unwrap_or(Suite::DEFAULT_TIMEOUT_SECONDS),
                "\"timeout\"",
            )?,
            cases: self.cases,
        })
    }
}

fn load_suite(path: &Path) -> anyhow::Result<Suite> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.to_string_lossy()))?;
    let file: SuiteFile = serde_json::from_str(&json)
        .with_context(|| format!("Invalid suite file {}", path.to_string_lossy()))?;
    let base_dir = path.parent().unwrap_or(Path::new("."));
    file.into_suite(base_dir)
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = global_args.load_config()?;
    let coord = cfg.coordinator(args.local_only)?;
    let suite = load_suite(&args.suite_file)?;

    let res = if args.json {
        let res = coord
            .run_suite(&suite)
            .await
            .context("Failed to execute test case")?;
        serde_json::to_writer_pretty(io::stdout(), &res)?;
        println!();
        res
    } else {
        action::run_suite_with_progress(&coord, &suite).await?
    };

    if !res.all_passed {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn code_file_is_relative_to_suite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("sol.py"), "def solve(x): return x\n").unwrap();
        let path = dir.path().join("suite.json");
        std::fs::write(
            &path,
            json!({
                "code_file": "sol.py",
                "cases": [{"name": "one", "input": 1, "expected": 1}, {"input": [], "expected": []}]
            })
            .to_string(),
        )
        .unwrap();

        let suite = load_suite(&path).unwrap();
        assert_eq!(suite.language, Language::Python);
        assert_eq!(suite.code, "def solve(x): return x\n");
        assert_eq!(suite.timeout_seconds, Suite::DEFAULT_TIMEOUT_SECONDS);
        assert_eq!(suite.cases.len(), 2);
        assert_eq!(suite.cases[0].name.as_deref(), Some("one"));
    }

    #[test]
    fn inline_code_needs_language() {
        let file: SuiteFile =
            serde_json::from_value(json!({"code": "x", "timeout": 3, "cases": []})).unwrap();
        assert!(file.into_suite(Path::new(".")).is_err());

        let file: SuiteFile = serde_json::from_value(
            json!({"code": "x", "language": "javascript", "timeout": 3, "cases": []}),
        )
        .unwrap();
        let suite = file.into_suite(Path::new(".")).unwrap();
        assert_eq!(suite.language, Language::JavaScript);
        assert_eq!(suite.timeout_seconds, 3);
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let file: SuiteFile = serde_json::from_value(
            json!({"code": "x", "language": "python", "timeout": 0, "cases": []}),
        )
        .unwrap();
        let err = file.into_suite(Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("timeout"), "{}", err);
    }
}
