use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use polyrun_webclient::{ExecutionServiceClient, Language, Url};
use serde::Deserialize;

use crate::{
    assets,
    coordinator::Coordinator,
    executor::{LocalExecutor, RemoteExecutor},
    harness::Marker,
    lang::{CommandTemplate, LanguageTable},
    process::ProcessRunner,
};

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub local: LocalConfig,
    #[serde(default)]
    pub languages: BTreeMap<Language, LanguageOverride>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteConfig {
    pub url: Option<String>,
    #[serde(default = "RemoteConfig::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "RemoteConfig::default_extra_timeout_seconds")]
    pub extra_timeout_seconds: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalConfig {
    pub max_concurrent_processes: Option<usize>,
    #[serde(default = "LocalConfig::default_compile_timeout_seconds")]
    pub compile_timeout_seconds: u64,
    #[serde(default = "LocalConfig::default_capture_max_bytes")]
    pub stdout_capture_max_bytes: usize,
    #[serde(default = "LocalConfig::default_capture_max_bytes")]
    pub stderr_capture_max_bytes: usize,
    pub result_marker: Option<String>,
    pub scratch_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct LanguageOverride {
    /// An empty string turns compilation off.
    pub compile: Option<String>,
    pub run: Option<String>,
    pub enabled: Option<bool>,
}

/// `POLYRUN_*` environment variables.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    remote_url: Option<String>,
    max_concurrent_processes: Option<usize>,
    compile_timeout_seconds: Option<u64>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: None,
            connect_timeout_ms: Self::default_connect_timeout_ms(),
            extra_timeout_seconds: Self::default_extra_timeout_seconds(),
        }
    }
}

impl RemoteConfig {
    fn default_connect_timeout_ms() -> u64 {
        ExecutionServiceClient::DEFAULT_CONNECT_TIMEOUT.as_millis() as u64
    }

    fn default_extra_timeout_seconds() -> u64 {
        RemoteExecutor::DEFAULT_EXTRA_TIMEOUT.as_secs()
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            max_concurrent_processes: None,
            compile_timeout_seconds: Self::default_compile_timeout_seconds(),
            stdout_capture_max_bytes: Self::default_capture_max_bytes(),
            stderr_capture_max_bytes: Self::default_capture_max_bytes(),
            result_marker: None,
            scratch_dir: None,
        }
    }
}

impl LocalConfig {
    fn default_compile_timeout_seconds() -> u64 {
        LocalExecutor::DEFAULT_COMPILE_TIMEOUT.as_secs()
    }

    fn default_capture_max_bytes() -> usize {
        ProcessRunner::DEFAULT_CAPTURE_MAX_BYTES
    }
}

impl Config {
    pub const FILENAME: &str = "polyrun.toml";
    pub const APP_NAME: &str = "polyrun";

    pub fn example_toml() -> String {
        assets::text(Self::FILENAME).unwrap_or_default()
    }

    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = std::fs::read_to_string(&filepath)
            .with_context(|| format!("Cannot read config file {:?}", filepath))?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file in ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    pub fn user_config_file() -> Option<PathBuf> {
        let path = dirs::config_dir()?.join(Self::APP_NAME).join(Self::FILENAME);
        path.is_file().then_some(path)
    }

    /// Loads the first config found in `cur_dir`'s ancestors or the user
    /// config dir, else the defaults, then applies `POLYRUN_*` overrides.
    pub fn load(cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let found = Self::find_file_in_ancestors(cur_dir).or_else(Self::user_config_file);
        let cfg = match found {
            Some(path) => {
                log::info!("Using config {:?}", path);
                Self::from_toml_file(path)?
            }
            None => {
                log::info!("No {} found, using defaults", Self::FILENAME);
                Self::default()
            }
        };
        cfg.with_env()
    }

    pub fn load_file(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::from_toml_file(path.into())?.with_env()
    }

    pub fn with_env(self) -> anyhow::Result<Self> {
        let env = envy::prefixed("POLYRUN_")
            .from_env::<EnvOverrides>()
            .context("Invalid POLYRUN_* environment variable")?;
        Ok(self.with_overrides(env))
    }

    fn with_overrides(mut self, env: EnvOverrides) -> Self {
        if let Some(url) = env.remote_url {
            self.remote.url = Some(url).filter(|u| !u.trim().is_empty());
        }
        if let Some(n) = env.max_concurrent_processes {
            self.local.max_concurrent_processes = Some(n);
        }
        if let Some(secs) = env.compile_timeout_seconds {
            self.local.compile_timeout_seconds = secs;
        }
        self
    }

    /// The built-in capability table with `[languages.*]` applied.
    pub fn language_table(&self) -> anyhow::Result<LanguageTable> {
        let mut specs = Vec::new();
        for spec in LanguageTable::builtin().iter() {
            let mut spec = spec.clone();
            if let Some(o) = self.languages.get(&spec.language) {
                if o.enabled == Some(false) {
                    log::debug!("{} disabled by config", spec.language);
                    continue;
                }
                if let Some(compile) = &o.compile {
                    spec.compile = if compile.trim().is_empty() {
                        None
                    } else {
                        Some(CommandTemplate::parse(compile).with_context(|| {
                            format!("languages.{}.compile", spec.language)
                        })?)
                    };
                }
                if let Some(run) = &o.run {
                    spec.run = CommandTemplate::parse(run)
                        .with_context(|| format!("languages.{}.run", spec.language))?;
                }
            }
            specs.push(spec);
        }
        Ok(LanguageTable::from_specs(specs))
    }

    pub fn result_marker(&self) -> anyhow::Result<Option<Marker>> {
        self.local
            .result_marker
            .as_deref()
            .map(Marker::fixed)
            .transpose()
            .context("local.result_marker")
    }

    pub fn local_executor(&self) -> anyhow::Result<LocalExecutor> {
        let languages = Arc::new(self.language_table()?);
        let runner = ProcessRunner::new()
            .stdout_capture_max_bytes(self.local.stdout_capture_max_bytes)
            .stderr_capture_max_bytes(self.local.stderr_capture_max_bytes);

        let mut exec = LocalExecutor::new(languages)
            .process_runner(runner)
            .compile_timeout(Duration::from_secs(self.local.compile_timeout_seconds))
            .scratch_dir(self.local.scratch_dir.clone())
            .fixed_marker(self.result_marker()?);
        if let Some(n) = self.local.max_concurrent_processes {
            exec = exec.max_concurrent_processes(n);
        }
        Ok(exec)
    }

    pub fn remote_executor(&self) -> anyhow::Result<Option<RemoteExecutor>> {
        let Some(url) = &self.remote.url else {
            return Ok(None);
        };
        let url = Url::parse(url).with_context(|| format!("Invalid remote.url '{}'", url))?;
        let client = ExecutionServiceClient::new(
            url,
            Duration::from_millis(self.remote.connect_timeout_ms),
        )?;
        Ok(Some(RemoteExecutor::new(client).extra_timeout(
            Duration::from_secs(self.remote.extra_timeout_seconds),
        )))
    }

    pub fn coordinator(&self, local_only: bool) -> anyhow::Result<Coordinator> {
        let coord = Coordinator::new(self.local_executor()?);
        if local_only {
            return Ok(coord);
        }
        Ok(match self.remote_executor()? {
            Some(remote) => coord.with_remote(remote),
            None => coord,
        })
    }
}
