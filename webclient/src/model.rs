use std::{num::NonZeroU64, str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

pub use reqwest::Url;
pub use serde_json::Value;

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Cpp,
    Java,
}

impl Language {
    pub const fn needs_compile(&self) -> bool {
        use Language::*;
        match self {
            Python | JavaScript | TypeScript => false,
            Cpp | Java => true,
        }
    }

    /// Guess the language from a file extension such as `py` or `cpp`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        use Language::*;
        let lang = match ext.to_ascii_lowercase().as_str() {
            "py" => Python,
            "js" | "mjs" | "cjs" => JavaScript,
            "ts" | "mts" => TypeScript,
            "cpp" | "cc" | "cxx" | "c++" => Cpp,
            "java" => Java,
            _ => return None,
        };
        Some(lang)
    }
}

/// Error classes reported through [`ExecutionResult::error`].
///
/// The error string always starts with `"<kind>: "`, which lets consumers of
/// the wire format classify a failure without a separate field.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::EnumIter,
)]
pub enum ErrorKind {
    UnsupportedLanguage,
    CompileError,
    RuntimeError,
    TimeoutError,
    ConnectionError,
    ResultParseError,
}

impl ErrorKind {
    pub fn describe(self, detail: impl AsRef<str>) -> String {
        let detail = detail.as_ref().trim();
        if detail.is_empty() {
            self.to_string()
        } else {
            format!("{}: {}", self, detail)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: Language,
    #[serde(default)]
    pub input: Value,
    #[serde(rename = "timeout")]
    pub timeout_seconds: NonZeroU64,
}

impl ExecutionRequest {
    /// A zero timeout is raised to one second.
    pub fn new(
        code: impl Into<String>,
        language: Language,
        input: Value,
        timeout_seconds: u64,
    ) -> Self {
        Self {
            code: code.into(),
            language,
            input,
            timeout_seconds: NonZeroU64::new(timeout_seconds).unwrap_or(NonZeroU64::MIN),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.get())
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_seconds.get().saturating_mul(1000)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub time_ms: u64,
}

impl ExecutionResult {
    pub fn success(
        output: Option<Value>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        time_ms: u64,
    ) -> Self {
        Self {
            output,
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: None,
            time_ms,
        }
    }

    /// `output` is always `None` on a failure.
    pub fn failure(
        error: impl Into<String>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
        time_ms: u64,
    ) -> Self {
        Self {
            output: None,
            stdout: stdout.into(),
            stderr: stderr.into(),
            error: Some(error.into()),
            time_ms,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Recover the error class from the `"<kind>: ..."` prefix.
    /// Errors relayed verbatim from the remote service may carry no kind.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        let error = self.error.as_deref()?;
        let head = error.split(':').next().unwrap_or(error).trim();
        ErrorKind::from_str(head).ok()
    }
}
