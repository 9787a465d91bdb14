/// Repository-wide structured errors. Everything in `PullError` is
/// configuration-class: it aborts the run before (or instead of) any pull.
#[derive(Debug, Clone)]
pub enum PullError {
    InputFileMissing(String),
    SkipFileMissing(String),
    DestinationMissing(String),
    /// A resolved path is not a descendant of the parent of its queried root.
    NotUnderQueriedRoot { path: String, root: String },
    InvalidFilter { pattern: String, reason: String },
    BridgeNotFound(String),
    ListingFailed { root: String, reason: String },
    CreateDirFailed { path: String, reason: String },
    ConfigInvalid { path: String, reason: String },
    OperationFailed(String),
}

impl std::fmt::Display for PullError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use PullError::*;
        match self {
            InputFileMissing(p) => write!(f, "the input file doesn't exist: '{}'", p),
            SkipFileMissing(p) => write!(f, "the skip file doesn't exist: '{}'", p),
            DestinationMissing(p) => {
                write!(f, "the destination folder does not exist: {}", p)
            }
            NotUnderQueriedRoot { path, root } => write!(
                f,
                "'{}' is not below the parent of the queried root '{}' (listing parser defect)",
                path, root
            ),
            InvalidFilter { pattern, reason } => {
                write!(f, "invalid filter pattern '{}': {}", pattern, reason)
            }
            BridgeNotFound(p) => write!(f, "device bridge executable not found: {}", p),
            ListingFailed { root, reason } => {
                write!(f, "failed to list remote path '{}': {}", root, reason)
            }
            CreateDirFailed { path, reason } => {
                write!(f, "failed to create local directory {}: {}", path, reason)
            }
            ConfigInvalid { path, reason } => {
                write!(f, "invalid config file {}: {}", path, reason)
            }
            OperationFailed(s) => write!(f, "operation failed: {}", s),
        }
    }
}

impl std::error::Error for PullError {}

/// Why a single pull did not succeed. Never escapes the executor as an error;
/// it is carried inside `Outcome::Failed` and written to the failure log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    Timeout,
    /// `code` is `None` when the process was terminated by a signal.
    ExitCode { code: Option<i32>, stderr: String },
    Spawn(String),
}

impl FailReason {
    /// Whether another attempt could plausibly succeed. A bridge that cannot
    /// be spawned at all will not start working on retry.
    pub fn is_retriable(&self) -> bool {
        !matches!(self, FailReason::Spawn(_))
    }
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailReason::Timeout => f.write_str("timeout"),
            FailReason::ExitCode { code, stderr } => {
                match code {
                    Some(c) => write!(f, "exit-code:{}", c)?,
                    None => f.write_str("exit-code:signal")?,
                }
                let detail = stderr.trim();
                if !detail.is_empty() {
                    write!(f, " ({})", detail)?;
                }
                Ok(())
            }
            FailReason::Spawn(msg) => write!(f, "spawn:{}", msg),
        }
    }
}
