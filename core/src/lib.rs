pub mod action;
pub mod compare;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod executor;
pub mod harness;
pub mod lang;
pub mod process;
pub mod protocol;
pub mod str_interp;
pub mod style;

// internal modules
mod assets;

pub use crate::config::Config;
pub use crate::coordinator::{Coordinator, RunResult, Suite, SuiteCase, TestCaseResult, Verdict};
pub use crate::executor::{Executor, LocalExecutor, RemoteExecutor};
pub use crate::harness::{Harness, HarnessGenerator, Marker};
pub use crate::lang::{LanguageSpec, LanguageTable};
