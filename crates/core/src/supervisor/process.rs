//! Application process lifecycle management.
//!
//! The supervisor owns the at-most-one child process running the current
//! deployment. It forwards the child's output to a broadcast channel,
//! watches liveness after start, and drives the escalating stop sequence:
//! graceful signal, then force kill, then a delayed restart of the host
//! agent itself when the child survives both, since a process that
//! outlives a force kill means this host's process management can no
//! longer be trusted. The agent is expected to run under an external
//! supervisor (container runtime, init system) that relaunches it.

use crate::supervisor::error::SupervisorError;
use crate::supervisor::error::SupervisorResult;
use crate::supervisor::shell;
use dk_protocol::process_events::ProcessEvent;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::process::Child;
use tokio::process::Command;
use tokio::sync::broadcast;
use tokio::sync::Mutex;
use tracing::error;
use tracing::info;
use tracing::warn;

/// Window after start in which the child is expected to produce output.
const WATCHDOG_WINDOW: Duration = Duration::from_secs(10);

/// Delay before the host restarts itself after a stuck stop sequence.
const HOST_RESTART_DELAY: Duration = Duration::from_secs(3);

/// Poll interval while waiting for the child to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Broadcast capacity; a lagging observer misses events rather than
/// blocking the child's I/O.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Timeouts governing the escalating stop sequence.
#[derive(Debug, Clone, Copy)]
pub struct StopTimeouts {
    /// How long to wait for the process to exit after the graceful signal.
    pub graceful: Duration,
    /// Additional wait after escalating to a force kill.
    pub forced: Duration,
}

impl Default for StopTimeouts {
    fn default() -> Self {
        Self {
            graceful: Duration::from_secs(10),
            forced: Duration::from_secs(5),
        }
    }
}

/// Supervises the single application process.
///
/// State is Stopped (no child in the slot), Running (child in the slot),
/// or transiently Starting/Stopping inside the respective calls. The slot
/// mutex makes concurrent `start`/`stop` calls observe each other instead
/// of racing a shared global.
pub struct ProcessSupervisor {
    child: Arc<Mutex<Option<Child>>>,
    events_tx: broadcast::Sender<ProcessEvent>,
    timeouts: StopTimeouts,
    watchdog_window: Duration,
}

impl Default for ProcessSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessSupervisor {
    /// Create a supervisor with default stop timeouts and watchdog window.
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            child: Arc::new(Mutex::new(None)),
            events_tx,
            timeouts: StopTimeouts::default(),
            watchdog_window: WATCHDOG_WINDOW,
        }
    }

    /// Override the stop-sequence timeouts.
    pub fn with_stop_timeouts(mut self, timeouts: StopTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Override the liveness watchdog window.
    pub fn with_watchdog_window(mut self, window: Duration) -> Self {
        self.watchdog_window = window;
        self
    }

    /// Subscribe to the supervisor's event stream.
    ///
    /// Child output, supervisor diagnostics, and exit notifications arrive
    /// as [`ProcessEvent`]s. Subscribers that fall behind miss events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.events_tx.subscribe()
    }

    /// Whether a child process is currently active.
    pub async fn is_running(&self) -> bool {
        self.child.lock().await.is_some()
    }

    /// Start the application process.
    ///
    /// The command runs under a resolved shell with `working_dir` as its
    /// working directory and exactly the provided environment mapping.
    /// Stdout and stderr are forwarded to subscribers as raw bytes.
    ///
    /// A working directory that is configured but missing on disk is a
    /// soft failure: a diagnostic is emitted and the call returns Ok
    /// without spawning anything.
    ///
    /// # Errors
    ///
    /// - `SupervisorError::AlreadyRunning` when a process is active; the
    ///   running process is left untouched
    /// - `SupervisorError::ConfigMissing` when the command is empty or the
    ///   working directory is unset
    /// - `SupervisorError::SpawnFailed` when the shell cannot be spawned
    pub async fn start(
        &self,
        command: &str,
        working_dir: Option<&Path>,
        env: &HashMap<String, String>,
    ) -> SupervisorResult<()> {
        let mut slot = self.child.lock().await;
        if slot.is_some() {
            return Err(SupervisorError::AlreadyRunning);
        }
        if command.trim().is_empty() {
            return Err(SupervisorError::ConfigMissing { what: "command" });
        }
        let Some(working_dir) = working_dir else {
            return Err(SupervisorError::ConfigMissing {
                what: "working directory",
            });
        };
        if !working_dir.is_dir() {
            let message = format!(
                "working directory {} does not exist, not starting",
                working_dir.display()
            );
            error!("{message}");
            let _ = self.events_tx.send(ProcessEvent::Diagnostic { message });
            return Ok(());
        }

        let (shell_path, run_flag) = shell::resolve_shell();
        info!(
            command,
            working_dir = %working_dir.display(),
            shell = %shell_path.display(),
            "starting application process"
        );

        let mut cmd = Command::new(&shell_path);
        cmd.arg(run_flag);
        cmd.arg(command);
        cmd.current_dir(working_dir);
        cmd.env_clear();
        cmd.envs(env);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|source| SupervisorError::SpawnFailed {
            command: command.to_string(),
            source,
        })?;

        let output_seen = Arc::new(AtomicBool::new(false));
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_output(
                stdout,
                self.events_tx.clone(),
                Arc::clone(&output_seen),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_output(
                stderr,
                self.events_tx.clone(),
                Arc::clone(&output_seen),
            ));
        }

        let pid = child.id();
        *slot = Some(child);
        drop(slot);

        self.spawn_exit_watcher();
        self.spawn_watchdog(pid, output_seen);

        Ok(())
    }

    /// Stop the application process.
    ///
    /// Returns `false` when nothing is running. Otherwise the escalation
    /// sequence runs: graceful signal, wait; force kill, wait; and if the
    /// child is still alive after both windows, a critical diagnostic is
    /// emitted and a delayed restart of the host agent is scheduled.
    /// Returns `true` once a stop sequence was initiated for a previously
    /// running process, whether or not the child actually died.
    pub async fn stop(&self) -> bool {
        let graceful_sent = {
            let mut slot = self.child.lock().await;
            let Some(child) = slot.as_mut() else {
                return false;
            };
            info!("stopping application process");
            send_graceful(child)
        };

        if graceful_sent {
            if self.wait_for_exit(self.timeouts.graceful).await {
                return true;
            }
            warn!("graceful stop timed out, escalating to force kill");
        }

        {
            let mut slot = self.child.lock().await;
            match slot.as_mut() {
                // Exited while we were escalating.
                None => return true,
                Some(child) => {
                    if let Err(e) = child.start_kill() {
                        warn!(error = %e, "force kill failed");
                    }
                }
            }
        }

        if self.wait_for_exit(self.timeouts.forced).await {
            return true;
        }

        let message = format!(
            "application process survived graceful and forced termination; \
             restarting host agent in {}s",
            HOST_RESTART_DELAY.as_secs()
        );
        error!("{message}");
        let _ = self.events_tx.send(ProcessEvent::Diagnostic { message });
        schedule_host_restart(HOST_RESTART_DELAY);

        true
    }

    /// Poll the child slot until it empties or `window` elapses. Returns
    /// whether the process is gone.
    async fn wait_for_exit(&self, window: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            {
                let mut slot = self.child.lock().await;
                match slot.as_mut() {
                    None => return true,
                    Some(child) => {
                        if let Ok(Some(status)) = child.try_wait() {
                            let code = status.code();
                            *slot = None;
                            info!(?code, "application process exited");
                            let _ = self.events_tx.send(ProcessEvent::Exited { code });
                            return true;
                        }
                    }
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    /// Watch for the child exiting on its own and transition the slot back
    /// to Stopped when it does.
    fn spawn_exit_watcher(&self) {
        let child_slot = Arc::clone(&self.child);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(EXIT_POLL_INTERVAL).await;
                let mut slot = child_slot.lock().await;
                match slot.as_mut() {
                    // A stop sequence already reclaimed the slot.
                    None => break,
                    Some(child) => match child.try_wait() {
                        Ok(None) => {}
                        Ok(Some(status)) => {
                            let code = status.code();
                            *slot = None;
                            info!(?code, "application process exited");
                            let _ = events_tx.send(ProcessEvent::Exited { code });
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "failed to poll application process");
                            *slot = None;
                            let _ = events_tx.send(ProcessEvent::Exited { code: None });
                            break;
                        }
                    },
                }
            }
        });
    }

    /// Warn once if the child stays silent through the watchdog window.
    /// Purely observational; the process is never killed for silence.
    fn spawn_watchdog(&self, pid: Option<u32>, output_seen: Arc<AtomicBool>) {
        let child_slot = Arc::clone(&self.child);
        let events_tx = self.events_tx.clone();
        let window = self.watchdog_window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if output_seen.load(Ordering::Relaxed) {
                return;
            }
            let slot = child_slot.lock().await;
            let same_process = pid.is_some() && slot.as_ref().is_some_and(|c| c.id() == pid);
            if !same_process {
                return;
            }
            let message = format!(
                "no output observed from the application process within {}s",
                window.as_secs()
            );
            warn!("{message}");
            let _ = events_tx.send(ProcessEvent::Diagnostic { message });
        });
    }
}

/// Forward raw bytes from a child pipe to the broadcast channel.
async fn forward_output(
    mut reader: impl AsyncRead + Unpin,
    events_tx: broadcast::Sender<ProcessEvent>,
    output_seen: Arc<AtomicBool>,
) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                output_seen.store(true, Ordering::Relaxed);
                let _ = events_tx.send(ProcessEvent::Output {
                    bytes: buf[..n].to_vec(),
                });
            }
        }
    }
}

/// Send the graceful termination signal. Returns whether it was sent; when
/// it was not, the caller escalates straight to the force kill.
#[cfg(unix)]
fn send_graceful(child: &Child) -> bool {
    use nix::sys::signal::kill;
    use nix::sys::signal::Signal;
    use nix::unistd::Pid;

    match child.id() {
        Some(pid) => kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok(),
        None => false,
    }
}

/// No graceful signal on this platform.
#[cfg(not(unix))]
fn send_graceful(_child: &Child) -> bool {
    false
}

/// Last-resort recovery: exit the whole agent after a delay and rely on
/// the external supervisor to relaunch it.
fn schedule_host_restart(delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        std::process::exit(1);
    });
}
