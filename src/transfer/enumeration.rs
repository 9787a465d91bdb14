use anyhow::Result;
use std::time::Duration;

use super::bridge::Bridge;
use super::executor::{RunOutcome, run_bounded};
use super::helpers::shell_quote;
use crate::parse::parse_listing;

/// Source of remote file lists for rooted (live) enumeration.
pub trait RemoteLister {
    /// All remote files under `root` (or `root` itself when it is a file).
    fn list_files(&self, root: &str) -> Result<Vec<String>>;
}

impl Bridge {
    /// Raw `ls -R` output for `root`, fetched through `<bridge> shell`.
    ///
    /// A non-zero exit from `ls` is not fatal: unreadable subdirectories make
    /// `ls -R` fail while the rest of the listing is still usable. Running past
    /// the listing timeout is.
    pub fn fetch_listing(&self, root: &str) -> Result<String> {
        let mut cmd = self.command();
        cmd.args(["shell", "ls", "-R"]).arg(shell_quote(root));
        let deadline = Some(self.listing_timeout());
        let outcome = run_bounded(cmd, deadline, Duration::from_millis(50)).map_err(|e| {
            anyhow::Error::from(crate::PullError::ListingFailed {
                root: root.to_string(),
                reason: e.to_string(),
            })
        })?;
        match outcome {
            RunOutcome::Exited { status, stdout, stderr } => {
                if !status.success() {
                    tracing::warn!(
                        "listing of '{}' exited with {:?}: {}",
                        root,
                        status.code(),
                        stderr.trim()
                    );
                }
                Ok(stdout)
            }
            RunOutcome::TimedOut { .. } => Err(crate::PullError::ListingFailed {
                root: root.to_string(),
                reason: format!("no answer within {}s", self.listing_timeout().as_secs_f64()),
            }
            .into()),
        }
    }
}

impl RemoteLister for Bridge {
    fn list_files(&self, root: &str) -> Result<Vec<String>> {
        let listing = self.fetch_listing(root)?;
        let files = parse_listing(&listing, root);
        tracing::info!(
            "listed '{}': {} lines, {} files",
            root,
            listing.lines().count(),
            files.len()
        );
        Ok(files)
    }
}
