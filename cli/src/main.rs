use std::io::Write as _;

use clap::Parser;
use colored::Colorize as _;
use polyrun_cli::cmd::GlobalArgs;
use polyrun_core::style::ColorTheme as _;

fn init_logger(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| {
            let level = format!("[{}]", record.level()).color(record.level().color());
            writeln!(buf, "{} {}", level.bold(), record.args())
        })
        .init();
}

#[tokio::main]
async fn main() {
    let app = GlobalArgs::parse();
    init_logger(app.verbose);
    app.exec_subcmd().await.unwrap_or_else(|e| {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    });
}
