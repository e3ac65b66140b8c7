use std::{io, path::PathBuf};

use anyhow::Context as _;
use colored::Colorize as _;
use polyrun_core::{action, style};
use polyrun_webclient::{ExecutionRequest, Language};

use super::{GlobalArgs, SubcmdResult};
use crate::util;

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg()] // positional argument
    pub file: PathBuf,

    #[arg(short, long)]
    pub language: Option<Language>,

    /// Input as JSON
    #[arg(short, long, conflicts_with = "input_file")]
    pub input: Option<String>,

    #[arg(long)]
    pub input_file: Option<PathBuf>,

    /// Run budget in seconds
    #[arg(short, long, default_value_t = 5)]
    pub timeout: u64,

    /// Judge the output against this JSON value
    #[arg(short, long)]
    pub expected: Option<String>,

    #[arg(long)]
    pub json: bool,

    /// Never contact the execution service
    #[arg(long)]
    pub local_only: bool,
}

pub async fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let timeout = util::check_timeout(args.timeout, "--timeout")?;
    let cfg = global_args.load_config()?;
    let coord = cfg.coordinator(args.local_only)?;

    let (code, lang) = util::read_source(&args.file, args.language)?;
    let input = util::read_input(args.input.as_deref(), args.input_file.as_deref())?;
    let req = ExecutionRequest::new(code, lang, input, timeout);

    let Some(expected) = &args.expected else {
        let res = action::execute(&coord, &req).await;
        if args.json {
            serde_json::to_writer_pretty(io::stdout(), &res)?;
            println!();
        } else {
            style::print_result(&res);
        }
        if !res.is_success() {
            std::process::exit(1);
        }
        return Ok(());
    };

    let expected = util::parse_json_arg(expected, "--expected")?;
    let case = coord
        .run_test_case(None, &req, &expected)
        .await
        .context("Failed to execute")?;

    if args.json {
        serde_json::to_writer_pretty(io::stdout(), &case)?;
        println!();
    } else {
        let name = args.file.to_string_lossy();
        style::print_case_detail(&name, &case);
        println!(
            "{} {}",
            style::verdict_icon(case.verdict()),
            format!("[{}ms]", case.result.time_ms).dimmed()
        );
    }
    if !case.passed {
        std::process::exit(1);
    }
    Ok(())
}
