// transfer module: work-list construction and the sequential pull loop
mod bridge;
mod enumeration;
mod executor;
mod helpers;
mod resolve;
mod select;

use anyhow::Result;
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub use bridge::Bridge;
pub use enumeration::RemoteLister;
pub use executor::{AdbPuller, Puller, RunOutcome, run_bounded};
pub use helpers::normalize_path;
pub use resolve::{ResolveOptions, resolve_destinations};
pub use select::{FilterSet, filter_files, remove_duplicates, select};

use self::helpers::display_path;
use self::resolve::create_parent_dirs;
use crate::error::FailReason;
use crate::parse::read_filelist;
use crate::util::{
    ProgressMilestones, append_to_output, failure_line, init_progress, now_hms, report_line,
    retry_outcome,
};

/// One remote file and where it goes locally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferItem {
    pub source: String,
    pub destination: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    Succeeded,
    Failed(FailReason),
}

/// Where the remote paths of a run come from.
#[derive(Clone, Debug)]
pub enum SourceSpec {
    /// Roots enumerated live through the bridge (rooted resolution).
    Remote(Vec<String>),
    /// Files holding one remote path per line (flat resolution).
    ListFiles(Vec<PathBuf>),
}

/// What to pull. `skip` and `filters` are fixed for the whole run.
#[derive(Clone, Debug)]
pub struct PullRequest {
    pub sources: SourceSpec,
    pub skip: HashSet<String>,
    pub filters: FilterSet,
}

/// How to pull it.
#[derive(Clone, Debug)]
pub struct PullOptions {
    pub dest_root: PathBuf,
    pub skip_existing: bool,
    pub dry_run: bool,
    pub pulled_log: PathBuf,
    pub failed_log: PathBuf,
    pub max_retries: usize,
    pub retry_backoff: Duration,
    pub quiet: bool,
    pub json: bool,
}

impl PullOptions {
    /// Human-readable stdout output; `--json` keeps stdout for the summary line.
    pub fn console(&self) -> bool {
        !self.quiet && !self.json
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PullSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed_ms: u128,
    pub nothing_to_do: bool,
    pub dry_run: bool,
}

/// Build the full work list before anything is pulled: per source, list (or
/// read) paths, apply skip-set and filters, then resolve destinations.
/// Items are unique by destination: a later source mapping a file onto a
/// destination already queued is dropped. Parent directories are created
/// only for the final list.
pub fn build_work_list(
    req: &PullRequest,
    opts: &PullOptions,
    lister: &dyn RemoteLister,
) -> Result<Vec<TransferItem>> {
    let resolve_opts = ResolveOptions { skip_existing: opts.skip_existing, create_parents: false };
    let mut queued: HashSet<PathBuf> = HashSet::new();
    let mut work: Vec<TransferItem> = Vec::new();
    let mut push_batch = |items: Vec<TransferItem>| {
        for it in items {
            if queued.insert(it.destination.clone()) {
                work.push(it);
            } else {
                tracing::debug!("{} already queued for {}", it.source, it.destination.display());
            }
        }
    };

    match &req.sources {
        SourceSpec::ListFiles(files) => {
            for f in files {
                let paths = select(read_filelist(f)?, &req.skip, &req.filters);
                push_batch(resolve_destinations(&paths, &opts.dest_root, None, resolve_opts)?);
            }
        }
        SourceSpec::Remote(roots) => {
            for root in roots {
                let root = normalize_path(root, false);
                if opts.console() {
                    println!("Building file list of \"{}\"", root);
                }
                let paths = select(lister.list_files(&root)?, &req.skip, &req.filters);
                push_batch(resolve_destinations(
                    &paths,
                    &opts.dest_root,
                    Some(&root),
                    resolve_opts,
                )?);
            }
        }
    }
    if !opts.dry_run {
        create_parent_dirs(&work)?;
    }
    Ok(work)
}

/// Pull every item in order, one at a time, appending each source path to
/// the pulled or failed log as its outcome comes in.
pub fn execute_work_list(
    items: &[TransferItem],
    opts: &PullOptions,
    puller: &dyn Puller,
) -> Result<PullSummary> {
    let start = Instant::now();
    let total = items.len();
    let console = opts.console();
    let pb = init_progress(total as u64, !console)?;
    let mut milestones = ProgressMilestones::new(total);
    let mut summary = PullSummary { total, ..PullSummary::default() };

    if console {
        report_line(
            &pb,
            &format!("{} -> Pulling {} files... it may take some time...", now_hms(), total),
        );
    }

    for (index, item) in items.iter().enumerate() {
        tracing::debug!("pulling {} -> {}", item.source, item.destination.display());
        let outcome =
            retry_outcome(opts.max_retries, opts.retry_backoff, || puller.pull(item));
        match outcome {
            Outcome::Succeeded => {
                summary.succeeded += 1;
                append_to_output(&[item.source.as_str()], &opts.pulled_log)?;
            }
            Outcome::Failed(reason) => {
                summary.failed += 1;
                tracing::debug!("pull of {} failed: {}", item.source, reason);
                if console {
                    report_line(&pb, &failure_line(&item.source, &reason));
                }
                append_to_output(&[item.source.as_str()], &opts.failed_log)?;
            }
        }
        pb.inc(1);
        let done = index + 1;
        if let Some(pct) = milestones.on_completed(done)
            && console
        {
            report_line(&pb, &format!("{} -> #{}%  items pulled: {}", now_hms(), pct, done));
        }
    }

    let pct = milestones.finish();
    pb.finish_and_clear();
    if console {
        println!("{} -> #{}%  items pulled: {}", now_hms(), pct, total);
    }
    summary.elapsed_ms = start.elapsed().as_millis();
    Ok(summary)
}

/// Whole run: build the work list, then either print it (dry run) or pull it.
/// An empty work list is a normal, successful outcome with no log writes.
pub fn run_pull(
    req: &PullRequest,
    opts: &PullOptions,
    lister: &dyn RemoteLister,
    puller: &dyn Puller,
) -> Result<PullSummary> {
    let items = build_work_list(req, opts, lister)?;

    if items.is_empty() {
        if opts.console() {
            println!(
                "No files to pull! They were probably already pulled. To force the pulling and \
                 overwrite the existing files use the flag '--no-skip-existing'"
            );
        }
        return Ok(PullSummary { nothing_to_do: true, dry_run: opts.dry_run, ..PullSummary::default() });
    }

    if opts.dry_run {
        if opts.console() {
            for it in &items {
                println!("{}\t->  {}", it.source, display_path(&it.destination));
            }
            println!("{} files would be pulled", items.len());
        }
        return Ok(PullSummary { total: items.len(), dry_run: true, ..PullSummary::default() });
    }

    execute_work_list(&items, opts, puller)
}
