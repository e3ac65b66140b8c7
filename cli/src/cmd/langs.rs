use std::io;

use colored::Colorize as _;
use serde::Serialize;

use super::{GlobalArgs, SubcmdResult};

#[derive(Debug, clap::Args)]
pub struct Args {
    #[arg(short, long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct LangRow {
    language: String,
    compile: Option<String>,
    run: String,
    source_file: String,
}

pub fn exec(args: &Args, global_args: &GlobalArgs) -> SubcmdResult {
    let cfg = global_args.load_config()?;
    let table = cfg.language_table()?;

    let rows: Vec<LangRow> = table
        .iter()
        .map(|spec| LangRow {
            language: spec.language.to_string(),
            compile: spec.compile.as_ref().map(|c| c.to_string()),
            run: spec.run.to_string(),
            source_file: spec.source_file_name(),
        })
        .collect();

    if args.json {
        serde_json::to_writer_pretty(io::stdout(), &rows)?;
        println!();
        return Ok(());
    }

    for row in rows {
        println!("{}", row.language.cyan().bold());
        if let Some(compile) = &row.compile {
            println!("  compile: {}", compile);
        }
        println!("  run:     {}", row.run);
    }
    Ok(())
}
