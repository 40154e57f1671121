//! Mock process runner for testing.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use crate::converter::{
    ArgumentVector, ConverterError, EngineExit, ExecutionResult, ProcessRunner, RunControl,
};

/// A recorded engine run for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    /// The argument vector that would have been executed.
    pub args: ArgumentVector,
    /// Deadline the caller asked for.
    pub deadline: Option<Duration>,
    /// Whether the run was cancelled before its duration elapsed.
    pub cancelled: bool,
}

/// Scripted outcome of one run.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    /// Exit code 0 with the given stderr.
    Success { stderr_output: String },
    /// The engine ran and failed.
    Failure {
        exit: EngineExit,
        stderr_output: String,
    },
    /// The engine binary could not be spawned.
    EngineNotFound,
}

#[derive(Debug, Default)]
struct MockState {
    runs: Vec<RecordedRun>,
    outcomes: VecDeque<MockOutcome>,
    run_duration: Duration,
}

/// Mock implementation of the [`ProcessRunner`] trait.
///
/// Never spawns anything. Records every argument vector it receives and
/// replays queued outcomes in order; once the queue is empty every run
/// succeeds.
///
/// # Example
///
/// ```rust,ignore
/// use soundshift_core::testing::MockRunner;
///
/// let runner = MockRunner::new();
/// runner.push_failure(EngineExit::Code(1), "Invalid data");
///
/// let converter = AudioConverter::new(&ConverterConfig::default(), runner.clone());
/// assert!(converter.convert("a.wav", "b.mp3", "mp3").is_err());
/// assert_eq!(runner.recorded_runs().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    state: Arc<Mutex<MockState>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Queues an outcome for the next unscripted run.
    pub fn push_outcome(&self, outcome: MockOutcome) {
        self.state().outcomes.push_back(outcome);
    }

    pub fn push_success(&self, stderr_output: impl Into<String>) {
        self.push_outcome(MockOutcome::Success {
            stderr_output: stderr_output.into(),
        });
    }

    pub fn push_failure(&self, exit: EngineExit, stderr_output: impl Into<String>) {
        self.push_outcome(MockOutcome::Failure {
            exit,
            stderr_output: stderr_output.into(),
        });
    }

    pub fn push_engine_not_found(&self) {
        self.push_outcome(MockOutcome::EngineNotFound);
    }

    /// Makes every run block for `duration` before returning.
    ///
    /// A run cancelled through its [`RunControl`] stops early and fails with
    /// `EngineExit::Killed`, like a killed engine.
    pub fn set_run_duration(&self, duration: Duration) {
        self.state().run_duration = duration;
    }

    /// Every run seen so far, oldest first.
    pub fn recorded_runs(&self) -> Vec<RecordedRun> {
        self.state().runs.clone()
    }

    pub fn clear(&self) {
        let mut state = self.state();
        state.runs.clear();
        state.outcomes.clear();
    }
}

impl ProcessRunner for MockRunner {
    fn run_with(
        &self,
        args: ArgumentVector,
        control: &RunControl,
    ) -> Result<ExecutionResult, ConverterError> {
        let (index, outcome, run_duration) = {
            let mut state = self.state();
            let program = args.program().map(PathBuf::from);
            state.runs.push(RecordedRun {
                args,
                deadline: control.deadline(),
                cancelled: false,
            });
            let outcome = state.outcomes.pop_front();
            (
                state.runs.len() - 1,
                outcome.map(|o| (o, program)),
                state.run_duration,
            )
        };

        if !run_duration.is_zero() && !sleep_unless_cancelled(run_duration, control) {
            if let Some(run) = self.state().runs.get_mut(index) {
                run.cancelled = true;
            }
            return Err(ConverterError::execution(EngineExit::Killed, ""));
        }

        match outcome {
            None => Ok(ExecutionResult {
                succeeded: true,
                exit_code: 0,
                stderr_output: String::new(),
                duration_ms: run_duration.as_millis() as u64,
            }),
            Some((MockOutcome::Success { stderr_output }, _)) => Ok(ExecutionResult {
                succeeded: true,
                exit_code: 0,
                stderr_output,
                duration_ms: run_duration.as_millis() as u64,
            }),
            Some((
                MockOutcome::Failure {
                    exit,
                    stderr_output,
                },
                _,
            )) => Err(ConverterError::execution(exit, stderr_output)),
            Some((MockOutcome::EngineNotFound, program)) => Err(ConverterError::EngineNotFound {
                path: program.unwrap_or_default(),
                reason: "No such file or directory (os error 2)".to_string(),
            }),
        }
    }
}

/// Sleeps for `duration` in short steps. Returns false if `control` was
/// cancelled first.
fn sleep_unless_cancelled(duration: Duration, control: &RunControl) -> bool {
    const STEP: Duration = Duration::from_millis(5);

    let started = Instant::now();
    loop {
        if control.is_cancelled() {
            return false;
        }
        let elapsed = started.elapsed();
        if elapsed >= duration {
            return true;
        }
        thread::sleep(STEP.min(duration - elapsed));
    }
}
