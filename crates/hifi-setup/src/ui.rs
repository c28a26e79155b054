//! Terminal output for the setup binary.

use console::{Term, style};
use hifi_install::hooks::InstallHook;
use hifi_install::{Error, Stage, StepOutcome};
use std::io;

pub fn is_interactive() -> bool {
    Term::stdout().is_term() && Term::stderr().is_term()
}

pub fn heading(text: &str) {
    println!("{}", style(text).bold().cyan());
}

pub fn success(text: &str) {
    println!("{} {}", style("✓").green().bold(), text);
}

pub fn skipped(text: &str) {
    println!("{} {}", style("-").dim(), style(text).dim());
}

pub fn warn(text: &str) {
    eprintln!("{} {}", style("!").yellow().bold(), text);
}

pub fn failure(text: &str) {
    eprintln!("{} {}", style("✗").red().bold(), style(text).red());
}

/// Print one step result the same way for install and uninstall.
pub fn outcome(label: &str, outcome: &StepOutcome) {
    match outcome {
        StepOutcome::Done(detail) => success(&format!("{label}: {detail}")),
        StepOutcome::Ignored(detail) => skipped(&format!("{label}: {detail}")),
    }
}

/// Print a fatal install error with what to do next.
pub fn fatal(error: &Error) {
    failure(&error.to_string());
    let hint = error
        .remediation()
        .unwrap_or("Run again with --verbose to see every command and its output.");
    eprintln!("  {} {}", style("hint:").yellow(), hint);
}

/// Ask a yes/no question on the terminal; `default` on empty input.
pub fn confirm(question: &str, default: bool) -> io::Result<bool> {
    let term = Term::stderr();
    let choices = if default { "[Y/n]" } else { "[y/N]" };
    term.write_str(&format!("{} {} ", style(question).bold(), choices))?;
    let answer = term.read_line()?;
    Ok(parse_answer(&answer, default))
}

fn parse_answer(answer: &str, default: bool) -> bool {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => default,
        "y" | "yes" => true,
        _ => false,
    }
}

/// Shows each install stage as it starts and finishes.
pub struct ProgressHook;

impl InstallHook for ProgressHook {
    fn on_enter(&self, stage: Stage) {
        println!("{} {}", style("→").blue(), style(stage).bold());
    }

    fn on_complete(&self, stage: Stage, result: &StepOutcome) {
        outcome(&stage.to_string(), result);
    }

    fn on_failed(&self, stage: Stage, _error: &Error) {
        failure(&format!("{stage} failed"));
    }
}
