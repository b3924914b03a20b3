//! Supervisor Process
//!
//! Runs benchmark executables as child processes and enforces per-command
//! timeouts. Commands are distributed over a rayon pool; results come back in
//! command order.

use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::io::Read;
use std::process::{Child, Command as ProcessCommand, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use sweepbench_core::Command;
use thiserror::Error;
use tracing::{debug, warn};

/// Grace period between SIGTERM and SIGKILL
const TERMINATE_GRACE: Duration = Duration::from_millis(500);
/// Interval between liveness checks while waiting on a child
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Why a single command produced no usable output
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    NonZeroExit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("{program} timed out after {timeout:?}")]
    Timeout { program: String, timeout: Duration },

    /// The process exited but something it spawned kept its output pipe open
    #[error("{program} exited but its output stayed open past {timeout:?}")]
    OutputNotClosed { program: String, timeout: Duration },

    #[error("I/O error while running {program}: {source}")]
    Io {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to build worker pool: {0}")]
    PoolBuild(String),
}

/// Executes one command and returns its standard output
pub trait CommandRunner: Sync {
    /// Run `command`, giving up after `timeout`.
    fn run(&self, command: &Command, timeout: Duration) -> Result<String, ExecutionError>;
}

/// Send SIGTERM to a process. Returns `Err` if the signal could not be delivered.
fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Check if the child process is still running
fn is_alive(child: &mut Child) -> bool {
    match child.try_wait() {
        Ok(Some(_)) => false,
        Ok(None) => true,
        Err(_) => false,
    }
}

/// Graceful stop: SIGTERM, wait for the grace period, then SIGKILL.
fn terminate(child: &mut Child) {
    // Ignore error: the child may already be gone
    let _ = send_sigterm(child.id());

    let deadline = Instant::now() + TERMINATE_GRACE;
    while Instant::now() < deadline {
        if !is_alive(child) {
            return;
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    if is_alive(child) {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Drain a pipe on a separate thread so a chatty child never blocks on a full pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<std::io::Result<Vec<u8>>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

/// Collect a drained pipe, giving up at `deadline`.
///
/// A background grandchild that inherited the pipe keeps it open after the
/// command exits. The reader thread is then left behind and finishes once the
/// pipe closes.
fn join_output(
    handle: JoinHandle<std::io::Result<Vec<u8>>>,
    program: &str,
    deadline: Option<Instant>,
    timeout: Duration,
) -> Result<String, ExecutionError> {
    while !handle.is_finished() {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(ExecutionError::OutputNotClosed {
                program: program.to_string(),
                timeout,
            });
        }
        std::thread::sleep(POLL_INTERVAL);
    }

    let bytes = handle
        .join()
        .map_err(|_| ExecutionError::Io {
            program: program.to_string(),
            source: std::io::Error::other("output reader panicked"),
        })?
        .map_err(|source| ExecutionError::Io {
            program: program.to_string(),
            source,
        })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Runs commands as real child processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run(&self, command: &Command, timeout: Duration) -> Result<String, ExecutionError> {
        let program = command.program().to_string();
        let mut child = ProcessCommand::new(command.program())
            .args(command.args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecutionError::SpawnFailed {
                program: program.clone(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let start = Instant::now();
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    if start.elapsed() >= timeout {
                        warn!(command = %command, "Command timed out, terminating");
                        terminate(&mut child);
                        return Err(ExecutionError::Timeout { program, timeout });
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(source) => {
                    terminate(&mut child);
                    return Err(ExecutionError::Io { program, source });
                }
            }
        };

        let deadline = start.checked_add(timeout);
        let stdout = join_output(stdout, &program, deadline, timeout)?;
        let stderr = join_output(stderr, &program, deadline, timeout)?;

        if !status.success() {
            return Err(ExecutionError::NonZeroExit {
                program,
                status: status.to_string(),
                stderr: stderr.trim().to_string(),
            });
        }
        Ok(stdout)
    }
}

/// Supervisor that distributes commands over a worker pool
pub struct Supervisor {
    timeout: Duration,
    num_workers: usize,
}

impl Supervisor {
    /// Create a new supervisor
    pub fn new(timeout: Duration, num_workers: usize) -> Self {
        Self {
            timeout,
            num_workers: num_workers.max(1),
        }
    }

    /// Per-command timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run every command; `result[i]` belongs to `commands[i]`.
    pub fn run_all<R: CommandRunner>(
        &self,
        runner: &R,
        commands: &[Command],
    ) -> Result<Vec<Result<String, ExecutionError>>, SupervisorError> {
        if commands.is_empty() {
            return Ok(Vec::new());
        }

        if self.num_workers == 1 || commands.len() == 1 {
            return Ok(commands.iter().map(|cmd| self.run_one(runner, cmd)).collect());
        }

        let worker_count = self.num_workers.min(commands.len());
        let pool = ThreadPoolBuilder::new()
            .num_threads(worker_count)
            .build()
            .map_err(|e| SupervisorError::PoolBuild(e.to_string()))?;

        Ok(pool.install(|| {
            commands
                .par_iter()
                .map(|cmd| self.run_one(runner, cmd))
                .collect()
        }))
    }

    fn run_one<R: CommandRunner>(
        &self,
        runner: &R,
        command: &Command,
    ) -> Result<String, ExecutionError> {
        debug!(command = %command, "Running");
        let result = runner.run(command, self.timeout);
        if let Err(e) = &result {
            warn!(command = %command, error = %e, "Command failed");
        }
        result
    }
}
