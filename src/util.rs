use anyhow::{Context, Result};
use chrono::Local;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::fs::OpenOptions;
use std::io::{IsTerminal, Write};
use std::path::Path;
use std::time::Duration;

use crate::error::FailReason;
use crate::transfer::{Outcome, PullOptions, PullSummary};

/// Try to enable ANSI escape sequence support on Windows consoles.
#[cfg(windows)]
fn try_enable_ansi_on_windows() -> bool {
    enable_ansi_support::enable_ansi_support().is_ok()
}

#[cfg(not(windows))]
fn try_enable_ansi_on_windows() -> bool {
    true
}

/// Whether console messages should be colored.
pub fn colors_enabled() -> bool {
    std::io::stdout().is_terminal() && try_enable_ansi_on_windows()
}

/// Wall-clock prefix used on progress lines.
pub fn now_hms() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Decides when a "N% done" line is due. Reports fire every `ceil(total/10)`
/// completed items; 100% is never reported from here (rounding could claim it
/// early), `finish` reports it once at the end.
#[derive(Debug)]
pub struct ProgressMilestones {
    total: usize,
    chunk: usize,
    last: Option<u32>,
}

impl ProgressMilestones {
    pub fn new(total: usize) -> Self {
        let chunk = std::cmp::max(1, total.div_ceil(10));
        Self { total, chunk, last: None }
    }

    /// Percentage to report after `done` items completed, if any.
    pub fn on_completed(&mut self, done: usize) -> Option<u32> {
        if self.total == 0 || done == 0 || done % self.chunk != 0 {
            return None;
        }
        let pct = (done.saturating_mul(100) / self.total) as u32;
        if pct >= 100 || self.last.is_some_and(|l| pct <= l) {
            return None;
        }
        self.last = Some(pct);
        Some(pct)
    }

    pub fn finish(&mut self) -> u32 {
        self.last = Some(100);
        100
    }
}

/// Item-count progress bar. Hidden when quiet or when stderr is not a terminal.
pub fn init_progress(total: u64, hidden: bool) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total);
    if hidden || !std::io::stderr().is_terminal() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
        return Ok(pb);
    }
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}",
    )
    .with_context(|| "invalid progress bar template")?
    .progress_chars("=> ");
    pb.set_style(style);
    Ok(pb)
}

/// Print a console line without tearing the progress bar.
pub fn report_line(pb: &ProgressBar, msg: &str) {
    if pb.is_hidden() {
        println!("{}", msg);
    } else {
        pb.println(msg);
    }
}

/// Append one line per path to an outcome log, creating it if needed.
/// A path that would break the one-path-per-line format is written as is
/// with a warning; losing the record is worse than an odd line.
pub fn append_to_output<S: AsRef<str>>(lines: &[S], output_file: &Path) -> Result<()> {
    if let Some(parent) = output_file.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(output_file)
        .with_context(|| format!("failed to open {}", output_file.display()))?;
    for line in lines {
        let line = line.as_ref();
        if line.contains(['\n', '\r']) {
            tracing::warn!(
                "path with a line break written as is to {}: {:?}",
                output_file.display(),
                line
            );
        }
        writeln!(f, "{}", line).with_context(|| format!("failed to write {}", output_file.display()))?;
    }
    Ok(())
}

/// Retry a pull while it fails with a retriable reason, sleeping
/// `backoff * attempt` between attempts. Returns the last outcome.
pub fn retry_outcome<F>(max_retries: usize, backoff: Duration, mut op: F) -> Outcome
where
    F: FnMut() -> Outcome,
{
    let mut attempt = 0usize;
    loop {
        let outcome = op();
        match &outcome {
            Outcome::Failed(reason) if attempt < max_retries && reason.is_retriable() => {
                attempt += 1;
                tracing::info!("attempt {} failed ({}), retrying", attempt, reason);
                std::thread::sleep(backoff.saturating_mul(attempt as u32));
            }
            _ => return outcome,
        }
    }
}

/// One-line failure notice for a single item.
pub fn failure_line(source: &str, reason: &FailReason) -> String {
    let msg = format!("failed {}: {}", source, reason);
    if colors_enabled() { msg.red().to_string() } else { msg }
}

/// Final console report. With `json` a single JSON object line is printed
/// instead of the human summary.
pub fn print_summary(summary: &PullSummary, opts: &PullOptions) {
    if opts.json {
        println!("{}", summary_json(summary, opts));
        return;
    }
    if opts.quiet || summary.nothing_to_do || summary.dry_run {
        return;
    }
    let secs = summary.elapsed_ms as f64 / 1000.0;
    println!(
        "Pulling done in {:.3} seconds: {} pulled, {} failed.",
        secs, summary.succeeded, summary.failed
    );
    if summary.failed > 0 {
        let where_ = opts.failed_log.display().to_string();
        let line = format!("Failed pulls are saved to '{}'", where_);
        if colors_enabled() { println!("{}", line.yellow()) } else { println!("{}", line) }
    }
}

fn summary_json(summary: &PullSummary, opts: &PullOptions) -> String {
    let obj = serde_json::json!({
        "total": summary.total,
        "succeeded": summary.succeeded,
        "failed": summary.failed,
        "elapsed_secs": summary.elapsed_ms as f64 / 1000.0,
        "nothing_to_do": summary.nothing_to_do,
        "dry_run": summary.dry_run,
        "pulled_log": opts.pulled_log.to_string_lossy(),
        "failed_log": opts.failed_log.to_string_lossy(),
    });
    obj.to_string()
}
