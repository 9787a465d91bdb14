use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use crate::config::Config;
use crate::parse::read_filelist;
use crate::transfer::{FilterSet, PullOptions, PullRequest, SourceSpec};

#[derive(Parser, Debug)]
#[clap(
    author,
    version,
    about = "Pull files with the adb driver. Files already pulled are skipped by default.",
    long_about = None
)]
pub struct Cli {
    #[clap(
        short,
        long,
        num_args = 1..,
        required_unless_present = "input",
        conflicts_with = "input",
        help = "Remote folder(s) or file(s) to pull"
    )]
    pub source: Vec<String>,
    #[clap(short, long, num_args = 1.., help = "File(s) listing the remote items to pull, one per line")]
    pub input: Vec<PathBuf>,
    #[clap(short, long, help = "The folder in which to save the pulled items")]
    pub dest: PathBuf,
    #[clap(long, help = "Remote path to skip (repeatable)")]
    pub skip: Vec<String>,
    #[clap(
        short = 'p',
        long = "skip-from-file",
        alias = "already-pulled",
        num_args = 1..,
        help = "File(s) of already pulled items to skip, e.g. a previous pulled.txt"
    )]
    pub skip_from_file: Vec<PathBuf>,
    #[clap(short, long, help = "Only pull paths matching this regex (repeatable, any may match)")]
    pub filter: Vec<String>,
    #[clap(long, overrides_with = "no_skip_existing", help = "Skip items already present locally (default)")]
    pub skip_existing: bool,
    #[clap(long, overrides_with = "skip_existing", help = "Pull and overwrite items already present locally")]
    pub no_skip_existing: bool,
    #[clap(long, overrides_with = "no_keep_metadata", help = "Pass -a to adb pull to keep timestamps (default)")]
    pub keep_metadata: bool,
    #[clap(long, overrides_with = "keep_metadata", help = "Do not pass -a to adb pull")]
    pub no_keep_metadata: bool,
    #[clap(
        short,
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds before a single pull is killed [config default: 60]"
    )]
    pub timeout: Option<u64>,
    #[clap(
        long,
        value_parser = clap::value_parser!(u64).range(1..),
        help = "Seconds before a remote listing is abandoned [config default: 300]"
    )]
    pub listing_timeout: Option<u64>,
    #[clap(long, help = "Extra attempts for a failed pull [config default: 0]")]
    pub retries: Option<usize>,
    #[clap(long, help = "Device serial passed to adb -s")]
    pub serial: Option<String>,
    #[clap(long, help = "Path of the adb executable")]
    pub adb: Option<PathBuf>,
    #[clap(long, help = "Log of successfully pulled items [config default: pulled.txt]")]
    pub pulled_log: Option<PathBuf>,
    #[clap(long, help = "Log of failed items [config default: failed.txt]")]
    pub failed_log: Option<PathBuf>,
    #[clap(long, help = "Config file [default: ~/.adbpull/config.json]")]
    pub config: Option<PathBuf>,
    #[clap(long, help = "Print the items that would be pulled and their destination, pull nothing")]
    pub dry_run: bool,
    #[clap(long, help = "Print a one-line JSON summary")]
    pub json: bool,
    #[clap(short, long, help = "Only print errors")]
    pub quiet: bool,
    #[clap(short, long, help = "Write debug logs to ~/.adbpull/logs")]
    pub verbose: bool,
}

impl Cli {
    pub fn keep_metadata(&self) -> bool {
        !self.no_keep_metadata
    }

    /// Validate paths and turn the arguments into a request plus options.
    /// Every check here is fatal and happens before any listing or pull.
    pub fn into_request(&self, config: &Config) -> Result<(PullRequest, PullOptions)> {
        for i in &self.input {
            if !i.is_file() {
                return Err(crate::PullError::InputFileMissing(i.display().to_string()).into());
            }
        }
        for s in &self.skip_from_file {
            if !s.is_file() {
                return Err(crate::PullError::SkipFileMissing(s.display().to_string()).into());
            }
        }
        let dest_root = match std::fs::canonicalize(&self.dest) {
            Ok(p) if p.is_dir() => p,
            _ => {
                return Err(
                    crate::PullError::DestinationMissing(self.dest.display().to_string()).into()
                );
            }
        };

        let mut skip: HashSet<String> = self.skip.iter().cloned().collect();
        for s in &self.skip_from_file {
            skip.extend(read_filelist(s)?);
        }
        let filters = FilterSet::compile(&self.filter)?;

        let sources = if self.input.is_empty() {
            SourceSpec::Remote(self.source.clone())
        } else {
            SourceSpec::ListFiles(self.input.clone())
        };

        let opts = PullOptions {
            dest_root,
            skip_existing: !self.no_skip_existing,
            dry_run: self.dry_run,
            pulled_log: self.pulled_log.clone().unwrap_or_else(|| config.pulled_log.clone()),
            failed_log: self.failed_log.clone().unwrap_or_else(|| config.failed_log.clone()),
            max_retries: self.retries.unwrap_or(config.max_retries),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            quiet: self.quiet,
            json: self.json,
        };
        Ok((PullRequest { sources, skip, filters }, opts))
    }

    pub fn timeout(&self, config: &Config) -> Duration {
        Duration::from_secs(self.timeout.unwrap_or(config.timeout_secs).max(1))
    }

    pub fn listing_timeout(&self, config: &Config) -> Duration {
        Duration::from_secs(self.listing_timeout.unwrap_or(config.listing_timeout_secs).max(1))
    }
}
