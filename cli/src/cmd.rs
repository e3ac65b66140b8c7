pub mod harness;
pub mod init;
pub mod langs;
pub mod run;
pub mod test;

use std::path::PathBuf;

use anyhow::Context as _;
use polyrun_core::Config;

use crate::util;

#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct GlobalArgs {
    #[command(subcommand)]
    pub subcmd: Subcommand,

    /// Use this config file instead of searching for polyrun.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// More logs (-v: info, -vv: debug). RUST_LOG takes precedence
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, clap::Subcommand)]
pub enum Subcommand {
    #[command(alias("r"))]
    Run(run::Args),

    #[command(alias("t"))]
    Test(test::Args),

    Harness(harness::Args),
    Langs(langs::Args),
    Init(init::Args),
}

pub type SubcmdResult = anyhow::Result<()>;

impl GlobalArgs {
    pub async fn exec_subcmd(&self) -> SubcmdResult {
        use Subcommand::*;
        match &self.subcmd {
            Run(args) => run::exec(args, self).await,
            Test(args) => test::exec(args, self).await,
            Harness(args) => harness::exec(args, self),
            Langs(args) => langs::exec(args, self),
            Init(args) => init::exec(args, self),
        }
    }

    pub fn load_config(&self) -> anyhow::Result<Config> {
        let cfg = match &self.config {
            Some(path) => Config::load_file(path)
                .with_context(|| format!("Failed to load config {}", path.to_string_lossy()))?,
            None => Config::load(util::current_dir())?,
        };
        if let Some(path) = &cfg.source_config_file {
            log::info!(
                "Loaded {}",
                util::replace_homedir_to_tilde(path).to_string_lossy()
            );
        }
        Ok(cfg)
    }
}
