use std::path::PathBuf;

use polyrun_core::HarnessGenerator;
use polyrun_webclient::Language;

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg()] // positional argument
    pub file: PathBuf,

    #[arg(short, long)]
    pub language: Option<Language>,

    /// Input as JSON
    #[arg(short, long)]
    pub input: Option<String>,
}

/// Prints the generated harness source and the command-line input.
pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = global_args.load_config()?;
    let generator = HarnessGenerator::new(cfg.language_table()?.into())
        .fixed_marker(cfg.result_marker()?);

    let (code, lang) = util::read_source(&args.file, args.language)?;
    let input = util::read_input(args.input.as_deref(), None)?;

    let harness = generator.generate(&code, lang, &input)?;
    log::info!("Entry point: {:?}", harness.entry);
    log::info!("Marker: {}", harness.marker);
    log::info!("Argument: {}", harness.argv_input);
    print!("{}", harness.source);
    Ok(())
}
