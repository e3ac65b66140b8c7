use std::collections::BTreeMap;

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;
use polyrun_webclient::{ExecutionResult, Value};

use crate::coordinator::{RunResult, TestCaseResult, Verdict};

#[macro_export]
macro_rules! print_success {
    ($fmt:literal, $($e:tt)*) => {
        use ::colored::Colorize as _;
        println!("{}", format!($fmt, $($e)*).green())
    }
}

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for log::Level {
    fn color(&self) -> Color {
        use log::Level::*;
        match self {
            Error => Color::BrightRed,
            Warn => Color::BrightYellow,
            Info => Color::Cyan,
            Debug => Color::Magenta,
            Trace => Color::Blue,
        }
    }
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                Accepted => Color::Green,
                WrongAnswer => Color::Yellow,
                TimeLimitExceeded => Color::Red,
                RuntimeError => Color::Magenta,
                CompileError => Color::Blue,
                Failed => Color::BrightBlack,
            };
        }

        let (r, g, b) = match self {
            Accepted => (30, 180, 40),
            WrongAnswer => (210, 138, 4),
            TimeLimitExceeded => (220, 42, 42),
            RuntimeError => (171, 40, 200),
            CompileError => (40, 110, 220),
            Failed => (110, 110, 110),
        };
        Color::TrueColor { r, g, b }
    }
}

pub fn verdict_icon(verdict: Verdict) -> ColoredString {
    let fg = if is_truecolor_supported() {
        Color::TrueColor {
            r: 255,
            g: 255,
            b: 255,
        }
    } else {
        Color::BrightBlack
    };
    format!(" {} ", verdict)
        .on_color(verdict.color())
        .bold()
        .color(fg)
}

/// Width-padded icon, so that case lines stay aligned.
pub fn verdict_label(verdict: Verdict) -> String {
    let pad = 3usize.saturating_sub(verdict.to_string().len());
    format!("{}{}", verdict_icon(verdict), " ".repeat(pad))
}

pub fn print_run_summary(res: &RunResult) {
    let bar = "-".repeat(5);
    print!("{} ", bar);

    let count: BTreeMap<Verdict, usize> = res.cases.iter().fold(BTreeMap::new(), |mut count, c| {
        *count.entry(c.verdict()).or_default() += 1;
        count
    });

    let num_total = res.cases.len();
    let num_passed = res.num_passed();
    let num_failed = num_total - num_passed;

    if res.all_passed {
        let msg = format!("All {} tests passed ✨", num_total);
        print!("{}", msg.green());
    } else {
        let summary_msg = if num_passed > 0 {
            format!("{}/{} tests failed 💣", num_failed, num_total)
        } else {
            format!("All {} tests failed 💀", num_total)
        };

        let detail_msg = count
            .iter()
            .filter(|(&verdict, _)| verdict != Verdict::Accepted)
            .map(|(&verdict, &cnt)| {
                format!(
                    "{}{}{}",
                    self::verdict_icon(verdict),
                    "x".dimmed(),
                    cnt.to_string().bold().bright_white(),
                )
            })
            .collect::<Vec<String>>()
            .join(", ");

        print!("{} ({})", summary_msg.bright_red(), detail_msg);
    }

    println!(" {} [{}ms total]", bar, res.total_time_ms);
}

const BOLD_LINE: &str = "━";
const THIN_LINE: &str = "─";

fn print_sub_title(s: &str, cols: usize) {
    println!(
        "{}{}",
        s.cyan().bold(),
        THIN_LINE
            .repeat(cols.saturating_sub(s.chars().count() + 1))
            .bright_black(),
    )
}

fn print_block(s: &str) {
    if s.is_empty() {
        println!("{}", "<EMPTY>".magenta().dimmed());
        return;
    }
    print!("{}", s);
    if !s.ends_with('\n') {
        println!();
    }
}

fn pretty_json(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}

pub fn print_case_detail(name: &str, case: &TestCaseResult) {
    let (cols, _) = terminal::size().unwrap_or((40, 40));
    let cols = cols as usize;
    let bold_bar = BOLD_LINE.repeat(cols).blue().bold();

    println!(
        "\n{}: {} [{}ms]\n{}",
        name.color(Color::BrightYellow).bold(),
        self::verdict_icon(case.verdict()),
        case.result.time_ms,
        bold_bar,
    );

    print_sub_title("[expected]", cols);
    print_block(&pretty_json(&case.expected));

    print_result_body(&case.result, cols);

    println!("{}", bold_bar);
}

/// Output or error, then the captured streams.
pub fn print_result(res: &ExecutionResult) {
    let (cols, _) = terminal::size().unwrap_or((40, 40));
    let cols = cols as usize;
    print_result_body(res, cols);
    println!("{}", format!("[{}ms]", res.time_ms).dimmed());
}

fn print_result_body(res: &ExecutionResult, cols: usize) {
    match &res.error {
        Some(error) => {
            print_sub_title("[error]", cols);
            println!("{}", error.bright_red());
        }
        None => {
            print_sub_title("[output]", cols);
            print_block(&pretty_json(res.output.as_ref().unwrap_or(&Value::Null)));
        }
    }

    if !res.stdout.is_empty() {
        print_sub_title("[stdout]", cols);
        print_block(&res.stdout);
    }
    if !res.stderr.is_empty() {
        print_sub_title("[stderr]", cols);
        print_block(&res.stderr);
    }
}
