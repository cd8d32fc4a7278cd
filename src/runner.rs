use std::collections::BTreeMap;
use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::error::ProcessError;
use crate::observability::MetricsCollector;
use crate::pipeline::Pipeline;

pub const GST_LAUNCH: &str = "gst-launch-1.0";
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Extra variables layered over the inherited environment of every launched
/// process. The tool's own environment is never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEnv {
    vars: BTreeMap<String, String>,
}

impl LaunchEnv {
    pub fn empty() -> Self {
        Self {
            vars: BTreeMap::new(),
        }
    }

    /// Exports needed to put a pipeline on the board's Wayland compositor.
    pub fn wayland() -> Self {
        Self::empty()
            .with("XDG_RUNTIME_DIR", "/var/run/user/0")
            .with("WESTON_DISABLE_GBM_MODIFIERS", "true")
            .with("WAYLAND_DISPLAY", "wayland-1")
            .with("QT_QPA_PLATFORM", "wayland")
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Default for LaunchEnv {
    fn default() -> Self {
        Self::wayland()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: LaunchEnv,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Success,
    Failed {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },
    /// The run was cut short by Ctrl-C; `forced` is set when the child
    /// ignored the polite request and had to be killed.
    Interrupted { forced: bool },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Success)
    }

    /// Text worth showing the user for a failed run.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            RunOutcome::Failed { stdout, stderr, .. } => {
                let stderr = stderr.trim();
                Some(if stderr.is_empty() { stdout.trim() } else { stderr })
            }
            _ => None,
        }
    }
}

pub trait ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutcome, ProcessError>;
}

/// Ctrl-C bookkeeping shared between the signal handler and the runner.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    inner: Arc<InterruptState>,
}

#[derive(Debug, Default)]
struct InterruptState {
    requested: AtomicBool,
    child_active: AtomicBool,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an interrupt. Returns true when a child process is running and
    /// will be shut down by its runner; false means nobody is waiting on it.
    pub fn trigger(&self) -> bool {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.child_active.load(Ordering::SeqCst)
    }

    pub fn take(&self) -> bool {
        self.inner.requested.swap(false, Ordering::SeqCst)
    }

    pub fn child_active(&self) -> bool {
        self.inner.child_active.load(Ordering::SeqCst)
    }

    /// A request left pending from before the spawn stays pending, so the
    /// new child is shut down straight away instead of the Ctrl-C being lost.
    fn track_child(&self) -> ChildGuard<'_> {
        self.inner.child_active.store(true, Ordering::SeqCst);
        ChildGuard { interrupt: self }
    }
}

struct ChildGuard<'a> {
    interrupt: &'a Interrupt,
}

impl Drop for ChildGuard<'_> {
    fn drop(&mut self) {
        self.interrupt
            .inner
            .child_active
            .store(false, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone)]
pub struct SystemRunner {
    interrupt: Interrupt,
    shutdown_timeout: Duration,
}

impl SystemRunner {
    pub fn new(interrupt: Interrupt, shutdown_timeout: Duration) -> Self {
        Self {
            interrupt,
            shutdown_timeout,
        }
    }

    fn shutdown(&self, child: &mut Child, program: &str) -> Result<bool, ProcessError> {
        info!("Shutting down pipeline...");
        terminate(child);
        let deadline = Instant::now() + self.shutdown_timeout;
        while Instant::now() < deadline {
            if try_wait(child, program)?.is_some() {
                return Ok(false);
            }
            thread::sleep(POLL_INTERVAL);
        }
        warn!("Shutdown failed, forcefully killing pipeline...");
        if let Err(err) = child.kill() {
            debug!("kill after timeout failed: {err}");
        }
        child.wait().map_err(|source| ProcessError::Wait {
            program: program.to_string(),
            source,
        })?;
        Ok(true)
    }
}

impl ProcessRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> Result<RunOutcome, ProcessError> {
        let program = invocation.program.as_str();
        debug!(program, args = ?invocation.args, "Spawning process");

        let mut command = Command::new(program);
        command
            .args(&invocation.args)
            .envs(invocation.env.iter())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        detach_from_terminal(&mut command);
        let mut child = command
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: program.to_string(),
                source,
            })?;
        let _guard = self.interrupt.track_child();

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = loop {
            let status = try_wait(&mut child, program)?;
            // An exit seen while a request is pending still counts as interrupted.
            if self.interrupt.take() {
                let forced = match status {
                    Some(_) => false,
                    None => self.shutdown(&mut child, program)?,
                };
                return Ok(RunOutcome::Interrupted { forced });
            }
            if let Some(status) = status {
                break status;
            }
            thread::sleep(POLL_INTERVAL);
        };

        let stdout = collect(stdout);
        let stderr = collect(stderr);
        debug!(program, code = ?status.code(), "Process exited");
        if status.success() {
            Ok(RunOutcome::Success)
        } else {
            Ok(RunOutcome::Failed {
                code: status.code(),
                stdout,
                stderr,
            })
        }
    }
}

fn try_wait(child: &mut Child, program: &str) -> Result<Option<ExitStatus>, ProcessError> {
    match child.try_wait() {
        Ok(status) => Ok(status),
        Err(source) => Err(abandon(child, program, source)),
    }
}

/// Kills and reaps a child we can no longer poll.
fn abandon(child: &mut Child, program: &str, source: std::io::Error) -> ProcessError {
    if let Err(err) = child.kill() {
        debug!("kill after failed poll: {err}");
    }
    let _ = child.wait();
    ProcessError::Wait {
        program: program.to_string(),
        source,
    }
}

/// Runs the child in its own process group so a terminal Ctrl-C reaches only
/// this tool; the runner then shuts the child down itself.
#[cfg(unix)]
fn detach_from_terminal(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    command.process_group(0);
}

#[cfg(not(unix))]
fn detach_from_terminal(_command: &mut Command) {}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pid) = i32::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    // The child leads its own group; helpers it started get the signal too.
    if let Err(err) = killpg(Pid::from_raw(pid), Signal::SIGTERM) {
        debug!("SIGTERM delivery failed: {err}");
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<Vec<u8>>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            buf
        })
    })
}

fn collect(handle: Option<JoinHandle<Vec<u8>>>) -> String {
    handle
        .and_then(|h| h.join().ok())
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .unwrap_or_default()
}

/// Hands rendered pipelines to `gst-launch-1.0`.
pub struct GstLauncher<'a> {
    runner: &'a dyn ProcessRunner,
    program: String,
    env: LaunchEnv,
}

impl<'a> GstLauncher<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, env: LaunchEnv) -> Self {
        Self {
            runner,
            program: GST_LAUNCH.to_string(),
            env,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn invocation(&self, pipeline: &Pipeline) -> Invocation {
        Invocation {
            program: self.program.clone(),
            args: pipeline.tokens(),
            env: self.env.clone(),
        }
    }

    pub fn launch(&self, pipeline: &Pipeline) -> Result<RunOutcome, ProcessError> {
        self.runner.run(&self.invocation(pipeline))
    }

    /// Runs the demo pipeline to completion, reporting a failure's captured
    /// stderr unless `report_errors` is off. Interrupts are a normal ending.
    pub fn run_pipeline(
        &self,
        pipeline: &Pipeline,
        report_errors: bool,
    ) -> Result<RunOutcome, ProcessError> {
        info!("Running pipeline...");
        let _timer = MetricsCollector::global().start_step("pipeline");
        let outcome = self.launch(pipeline)?;
        match &outcome {
            RunOutcome::Success => info!("Pipeline finished"),
            RunOutcome::Failed { code, .. } => {
                if report_errors {
                    tracing::error!(
                        code = ?code,
                        "Pipeline failed with error: {}",
                        outcome.diagnostic().unwrap_or_default()
                    );
                }
            }
            RunOutcome::Interrupted { forced } => {
                info!(forced = *forced, "Pipeline stopped");
            }
        }
        Ok(outcome)
    }
}
