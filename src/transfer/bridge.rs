use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// Upper bound on one `shell ls -R` unless configured otherwise.
pub const DEFAULT_LISTING_TIMEOUT: Duration = Duration::from_secs(300);

/// Handle on the device-bridge executable (`adb`). Every invocation is built
/// from here so device selection (`-s <serial>`) applies uniformly.
#[derive(Clone, Debug)]
pub struct Bridge {
    program: PathBuf,
    serial: Option<String>,
    listing_timeout: Duration,
}

impl Bridge {
    pub fn new(program: impl Into<PathBuf>, serial: Option<String>) -> Self {
        Self { program: program.into(), serial, listing_timeout: DEFAULT_LISTING_TIMEOUT }
    }

    /// Deadline for a remote listing; an unauthorized or absent device makes
    /// `adb shell` wait forever otherwise.
    pub fn with_listing_timeout(mut self, timeout: Duration) -> Self {
        self.listing_timeout = timeout;
        self
    }

    pub fn listing_timeout(&self) -> Duration {
        self.listing_timeout
    }

    /// Resolve `program` on `PATH` (or as given, when it contains a separator).
    pub fn locate(program: &Path, serial: Option<String>) -> anyhow::Result<Self> {
        match which::which(program) {
            Ok(resolved) => {
                tracing::debug!("using device bridge at {}", resolved.display());
                Ok(Self::new(resolved, serial))
            }
            Err(_) => {
                Err(crate::PullError::BridgeNotFound(program.display().to_string()).into())
            }
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// A fresh command with the global bridge options already applied.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        if let Some(serial) = &self.serial {
            cmd.arg("-s").arg(serial);
        }
        cmd
    }
}
