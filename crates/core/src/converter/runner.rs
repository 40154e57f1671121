//! Engine process execution.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tracing::debug;

use super::config::ConverterConfig;
use super::error::ConverterError;
use super::types::{ArgumentVector, EngineExit, EngineInfo, ExecutionResult};

/// How long to keep reading stderr after killing the engine.
const STDERR_GRACE: Duration = Duration::from_millis(500);

/// Shared flag that asks a running engine process to be killed.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. The run ends with `EngineExit::Killed`.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run controls: cancellation and an optional deadline.
#[derive(Debug, Clone, Default)]
pub struct RunControl {
    cancel: Option<CancelToken>,
    deadline: Option<Duration>,
}

impl RunControl {
    /// No cancellation and no deadline; the run waits for the engine to exit.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Kills the engine once it has run for `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Whether the attached token, if any, has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    fn is_unbounded(&self) -> bool {
        self.cancel.is_none() && self.deadline.is_none()
    }

    fn should_stop(&self, started: Instant) -> bool {
        self.is_cancelled()
            || self.deadline.is_some_and(|d| started.elapsed() >= d)
    }
}

/// Executes argument vectors as child processes.
///
/// Implementations block the calling thread until the process ends.
pub trait ProcessRunner: Send + Sync {
    /// Runs `args` under `control`.
    fn run_with(
        &self,
        args: ArgumentVector,
        control: &RunControl,
    ) -> Result<ExecutionResult, ConverterError>;

    /// Runs `args` to completion.
    fn run(&self, args: ArgumentVector) -> Result<ExecutionResult, ConverterError> {
        self.run_with(args, &RunControl::none())
    }
}

impl<R: ProcessRunner + ?Sized> ProcessRunner for Arc<R> {
    fn run_with(
        &self,
        args: ArgumentVector,
        control: &RunControl,
    ) -> Result<ExecutionResult, ConverterError> {
        (**self).run_with(args, control)
    }
}

/// Runs the engine as a real child process, without a shell.
#[derive(Debug, Clone)]
pub struct EngineRunner {
    poll_interval: Duration,
}

impl Default for EngineRunner {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl EngineRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runner using the configured poll interval.
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new().with_poll_interval(Duration::from_millis(config.poll_interval_ms))
    }

    /// Sets how often a cancellable run checks whether to stop.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Waits for the engine to exit. Returns the status and whether the
    /// engine was killed because the run was cancelled or timed out.
    fn wait(
        &self,
        child: &mut Child,
        control: &RunControl,
    ) -> Result<(ExitStatus, bool), ConverterError> {
        if control.is_unbounded() {
            return Ok((child.wait()?, false));
        }

        let started = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok((status, false));
            }
            if control.should_stop(started) {
                // The child may exit on its own between try_wait and kill.
                if let Err(e) = kill_engine(child) {
                    debug!("Kill failed, engine already exited: {}", e);
                    return Ok((child.wait()?, false));
                }
                return Ok((child.wait()?, true));
            }
            thread::sleep(self.poll_interval);
        }
    }
}

impl ProcessRunner for EngineRunner {
    fn run_with(
        &self,
        args: ArgumentVector,
        control: &RunControl,
    ) -> Result<ExecutionResult, ConverterError> {
        let program = args
            .program()
            .ok_or_else(|| ConverterError::invalid_parameter("argument vector is empty"))?;

        debug!("Running engine: {}", args);
        let start = Instant::now();

        let mut command = Command::new(program);
        command
            .args(args.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group, so a kill also reaches anything the engine forks.
            command.process_group(0);
        }
        let mut child = command.spawn().map_err(|e| spawn_error(program, e))?;

        // Drain stderr on its own thread so a chatty engine never blocks on a
        // full pipe while we wait.
        let stderr_buf = Arc::new(Mutex::new(Vec::new()));
        let (eof_tx, eof_rx) = mpsc::channel();
        if let Some(mut stderr) = child.stderr.take() {
            let buf = Arc::clone(&stderr_buf);
            thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match stderr.read(&mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => lock(&buf).extend_from_slice(&chunk[..n]),
                    }
                }
                let _ = eof_tx.send(());
            });
        }

        let waited = self.wait(&mut child, control);
        let killed = match &waited {
            Ok((_, killed)) => *killed,
            Err(_) => {
                // The stderr pipe stays open while the child lives.
                let _ = kill_engine(&mut child);
                let _ = child.wait();
                true
            }
        };

        // A killed engine may leave descendants holding the pipe open; keep
        // whatever arrived within the grace period.
        if killed {
            let _ = eof_rx.recv_timeout(STDERR_GRACE);
        } else {
            let _ = eof_rx.recv();
        }
        let stderr_bytes = std::mem::take(&mut *lock(&stderr_buf));
        let stderr_output = String::from_utf8_lossy(&stderr_bytes).trim_end().to_string();

        let (status, killed) = waited?;
        let exit = if killed {
            EngineExit::Killed
        } else {
            EngineExit::from_status(status)
        };
        let duration_ms = start.elapsed().as_millis() as u64;

        match exit {
            EngineExit::Code(0) => Ok(ExecutionResult {
                succeeded: true,
                exit_code: 0,
                stderr_output,
                duration_ms,
            }),
            exit => Err(ConverterError::execution(exit, stderr_output)),
        }
    }
}

fn lock(buf: &Mutex<Vec<u8>>) -> MutexGuard<'_, Vec<u8>> {
    buf.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Kills the engine and, on unix, every process in its group.
fn kill_engine(child: &mut Child) -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let pgid = child.id() as libc::pid_t;
        // SAFETY: killpg takes plain integers and touches no memory.
        if unsafe { libc::killpg(pgid, libc::SIGKILL) } == 0 {
            return Ok(());
        }
    }
    child.kill()
}

fn spawn_error(program: &str, e: std::io::Error) -> ConverterError {
    match e.kind() {
        std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
            ConverterError::EngineNotFound {
                path: program.into(),
                reason: e.to_string(),
            }
        }
        _ => ConverterError::Io(e),
    }
}

/// Checks that the engine can be executed and reads its version banner.
pub fn detect_engine(path: &Path) -> Result<EngineInfo, ConverterError> {
    let output = Command::new(path)
        .arg("-version")
        .stdin(Stdio::null())
        .output()
        .map_err(|e| spawn_error(&path.to_string_lossy(), e))?;

    if !output.status.success() {
        return Err(ConverterError::execution(
            EngineExit::from_status(output.status),
            String::from_utf8_lossy(&output.stderr).trim_end(),
        ));
    }

    let version = String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty());

    Ok(EngineInfo {
        path: path.to_path_buf(),
        version,
    })
}
