use std::{
    path::{Path, PathBuf},
    process::exit,
};

use anyhow::{anyhow, ensure, Context as _};
use polyrun_webclient::{Language, Value};

pub fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|e| {
        eprintln!("Failed to get current dir: {}", e);
        exit(1);
    })
}

pub fn replace_homedir_to_tilde(path: impl Into<PathBuf>) -> PathBuf {
    let path = path.into();
    let Some(home_dir) = ::dirs::home_dir() else {
        return path
    };
    path.strip_prefix(home_dir)
        .map(|path| Path::new("~").join(path))
        .unwrap_or(path)
}

/// `explicit` if given, else guessed from the file extension.
pub fn determine_language(file: &Path, explicit: Option<Language>) -> anyhow::Result<Language> {
    if let Some(lang) = explicit {
        return Ok(lang);
    }
    file.extension()
        .and_then(|ext| Language::from_extension(&ext.to_string_lossy()))
        .ok_or_else(|| {
            anyhow!(
                "Cannot infer language of '{}', specify it with --language",
                file.to_string_lossy()
            )
        })
}

pub fn read_source(file: &Path, explicit: Option<Language>) -> anyhow::Result<(String, Language)> {
    let lang = determine_language(file, explicit)?;
    let code = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.to_string_lossy()))?;
    Ok((code, lang))
}

/// The wire format has no zero timeout.
pub fn check_timeout(seconds: u64, what: &str) -> anyhow::Result<u64> {
    ensure!(seconds > 0, "{} must be at least 1 second, got 0", what);
    Ok(seconds)
}

pub fn parse_json_arg(s: &str, what: &str) -> anyhow::Result<Value> {
    serde_json::from_str(s).with_context(|| format!("{} is not valid JSON: {}", what, s))
}

/// Input from `--input`, `--input-file`, or `null` when neither is given.
pub fn read_input(inline: Option<&str>, file: Option<&Path>) -> anyhow::Result<Value> {
    if let Some(s) = inline {
        return parse_json_arg(s, "--input");
    }
    let Some(file) = file else {
        return Ok(Value::Null);
    };
    let s = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.to_string_lossy()))?;
    parse_json_arg(&s, &file.to_string_lossy())
}
