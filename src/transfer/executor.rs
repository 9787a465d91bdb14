use std::io::Read;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};

use super::bridge::Bridge;
use super::{Outcome, TransferItem};
use crate::error::FailReason;

/// How long to keep draining a pipe after the process is gone. Bounds the
/// wait when a daemonized grandchild inherited the pipe and keeps it open.
const PIPE_DRAIN_GRACE: Duration = Duration::from_secs(2);

/// Seam between the orchestrator and the thing that actually copies a file,
/// so batches can be driven by a scripted puller in tests.
pub trait Puller {
    fn pull(&self, item: &TransferItem) -> Outcome;
}

/// Result of one bounded invocation.
#[derive(Debug)]
pub enum RunOutcome {
    Exited { status: ExitStatus, stdout: String, stderr: String },
    /// The deadline passed; the spawned process (`pid`) was killed and reaped.
    TimedOut { pid: u32 },
}

/// Message sent from a pipe reader thread to the collector
enum ReadMsg {
    Data(Vec<u8>),
    Err(String),
    Eof,
}

fn spawn_pipe_reader<R: Read + Send + 'static>(
    mut reader: R,
    tx: Sender<ReadMsg>,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut buf = vec![0u8; 16 * 1024];
        loop {
            match reader.read(&mut buf) {
                Ok(0) => {
                    let _ = tx.send(ReadMsg::Eof);
                    break;
                }
                Ok(n) => {
                    if tx.send(ReadMsg::Data(buf[..n].to_vec())).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    let _ = tx.send(ReadMsg::Err(format!("pipe read error: {}", e)));
                    break;
                }
            }
        }
    })
}

fn collect_pipe(rx: &Receiver<ReadMsg>) -> String {
    let mut collected = Vec::new();
    loop {
        match rx.recv_timeout(PIPE_DRAIN_GRACE) {
            Ok(ReadMsg::Data(v)) => collected.extend_from_slice(&v),
            Ok(ReadMsg::Err(e)) => {
                tracing::debug!("{}", e);
                break;
            }
            Ok(ReadMsg::Eof) => break,
            Err(_) => break,
        }
    }
    String::from_utf8_lossy(&collected).into_owned()
}

/// Spawn `cmd` directly (never through a shell) and wait for it, killing the
/// exact spawned process once `timeout` elapses.
///
/// Output pipes are drained by reader threads while the child runs so a
/// chatty process cannot block on a full pipe. With `timeout == None` the
/// call waits indefinitely.
pub fn run_bounded(
    mut cmd: Command,
    timeout: Option<Duration>,
    poll_interval: Duration,
) -> std::io::Result<RunOutcome> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());
    let mut child = cmd.spawn()?;
    let pid = child.id();
    tracing::debug!(pid, "spawned {:?}", cmd);

    let (out_tx, out_rx) = unbounded::<ReadMsg>();
    let (err_tx, err_rx) = unbounded::<ReadMsg>();
    if let Some(out) = child.stdout.take() {
        spawn_pipe_reader(out, out_tx);
    }
    if let Some(err) = child.stderr.take() {
        spawn_pipe_reader(err, err_tx);
    }

    let deadline = timeout.map(|t| Instant::now() + t);
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {}
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e);
            }
        }
        if let Some(d) = deadline
            && Instant::now() >= d
        {
            tracing::warn!(pid, "deadline reached, killing {:?}", cmd.get_program());
            if let Err(e) = child.kill() {
                // already exited between try_wait and kill
                tracing::debug!(pid, "kill failed: {}", e);
            }
            let _ = child.wait();
            return Ok(RunOutcome::TimedOut { pid });
        }
        std::thread::sleep(poll_interval);
    };

    let stdout = collect_pipe(&out_rx);
    let stderr = collect_pipe(&err_rx);
    Ok(RunOutcome::Exited { status, stdout, stderr })
}

/// Pulls one file per call with `<bridge> pull [-a] <source> <destination>`.
pub struct AdbPuller {
    bridge: Bridge,
    keep_metadata: bool,
    timeout: Duration,
    poll_interval: Duration,
}

impl AdbPuller {
    pub fn new(bridge: Bridge, keep_metadata: bool, timeout: Duration) -> Self {
        Self { bridge, keep_metadata, timeout, poll_interval: Duration::from_millis(50) }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn build_command(&self, item: &TransferItem) -> Command {
        let mut cmd = self.bridge.command();
        cmd.arg("pull");
        if self.keep_metadata {
            cmd.arg("-a");
        }
        cmd.arg(&item.source).arg(&item.destination);
        cmd
    }
}

impl Puller for AdbPuller {
    fn pull(&self, item: &TransferItem) -> Outcome {
        let cmd = self.build_command(item);
        match run_bounded(cmd, Some(self.timeout), self.poll_interval) {
            Ok(RunOutcome::Exited { status, .. }) if status.success() => Outcome::Succeeded,
            Ok(RunOutcome::Exited { status, stderr, .. }) => {
                Outcome::Failed(FailReason::ExitCode { code: status.code(), stderr })
            }
            Ok(RunOutcome::TimedOut { .. }) => {
                // a killed pull leaves a truncated file that skip-existing would trust
                discard_partial(&item.destination);
                Outcome::Failed(FailReason::Timeout)
            }
            Err(e) => Outcome::Failed(FailReason::Spawn(e.to_string())),
        }
    }
}

fn discard_partial(destination: &Path) {
    match std::fs::remove_file(destination) {
        Ok(()) => tracing::debug!("removed partial {}", destination.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!("cannot remove partial {}: {}", destination.display(), e),
    }
}
