//! Terminal UI: spinners, stage lines, and captured command output.
//!
//! # Design goals
//!
//! - **Clean by default.** While restic runs the user sees only a spinner and a short label.  Raw
//!   output is captured; stdout is forwarded to the `debug` log once the stage finishes.
//! - **Informative on failure.** If a stage exits non-zero its captured stdout *and* stderr are
//!   printed in full so the operator can diagnose the problem without re-running manually.
//! - **Replaceable.** Commands talk to an [`Executor`], so tests can script outcomes instead of
//!   spawning restic.

use std::{process::Stdio, time::Duration};

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::runner::Invocation;

// ─── Icons ───────────────────────────────────────────────────────────────────

/// Braille spinner frames, same style as indicatif's default.
static SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

fn icon_ok() -> console::StyledObject<&'static str> {
    style("✓").green().bold()
}
fn icon_err() -> console::StyledObject<&'static str> {
    style("✗").red().bold()
}

// ─── Stage result ─────────────────────────────────────────────────────────────

/// The outcome of running one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutcome {
    /// Human-readable stage label, e.g. `"Backup"`.
    pub label: String,
    /// Whether the command exited zero.
    pub success: bool,
    /// Exit code; `None` if the process never started or died by signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    /// Set when the process could not be spawned at all.
    pub error: Option<String>,
}

impl StageOutcome {
    /// Print the one-line summary (✓/✗ + label).
    ///
    /// On failure, also replays captured stdout/stderr.
    pub fn print(&self) {
        if self.success {
            println!("  {}  {}", icon_ok(), style(&self.label).bold());
            return;
        }
        println!("  {}  {}", icon_err(), style(&self.label).bold());

        if let Some(ref msg) = self.error {
            eprintln!();
            eprintln!("  {} {}", style("Error:").red().bold(), msg);
        }
        if !self.stdout.is_empty() {
            eprintln!();
            eprintln!("  {} stdout:", style("►").dim());
            for line in self.stdout.lines() {
                eprintln!("    {line}");
            }
        }
        if !self.stderr.is_empty() {
            eprintln!();
            eprintln!("  {} stderr:", style("►").dim());
            for line in self.stderr.lines() {
                eprintln!("    {line}");
            }
        }
    }

    pub const fn failed(&self) -> bool {
        !self.success
    }
}

// ─── Executor ─────────────────────────────────────────────────────────────────

/// Runs invocations on behalf of the commands.
pub trait Executor {
    fn execute(&self, label: &str, invocation: &Invocation) -> StageOutcome;
}

/// The real executor: spinner while running, ✓/✗ line afterwards.
#[derive(Debug, Default, Clone, Copy)]
pub struct Terminal;

impl Executor for Terminal {
    fn execute(&self, label: &str, invocation: &Invocation) -> StageOutcome {
        let outcome = run_stage(label, invocation);
        outcome.print();
        outcome
    }
}

// ─── Spinner ──────────────────────────────────────────────────────────────────

fn make_spinner(label: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(s) = ProgressStyle::with_template("  {spinner:.cyan}  {msg}") {
        pb.set_style(s.tick_chars(SPINNER_CHARS));
    }
    pb.set_message(format!("{}", style(label).dim()));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

// ─── Captured execution ───────────────────────────────────────────────────────

/// Run `invocation` with stdout and stderr captured, stdin closed.
pub fn run_captured(label: &str, invocation: &Invocation) -> StageOutcome {
    tracing::debug!(
        command = %invocation.command_line(),
        env = ?invocation.env.names().collect::<Vec<_>>(),
        "spawning"
    );

    let output = invocation
        .command()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    match output {
        Ok(output) => StageOutcome {
            label: label.into(),
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            error: None,
        },
        Err(e) => StageOutcome {
            label: label.into(),
            success: false,
            code: None,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(format!("failed to spawn {}: {e}", invocation.program)),
        },
    }
}

/// [`run_captured`] behind a spinner.
pub fn run_stage(label: &str, invocation: &Invocation) -> StageOutcome {
    let spinner = make_spinner(label);
    let outcome = run_captured(label, invocation);
    spinner.finish_and_clear();

    for line in outcome.stdout.lines() {
        tracing::debug!(stage = label, "{line}");
    }
    outcome
}

// ─── Tests ────────────────────────────────────────────────────────────────────
