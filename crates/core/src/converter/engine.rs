//! Caller-facing converter that ties the builder and the runner together.

use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, warn};

use super::builder::CommandBuilder;
use super::config::ConverterConfig;
use super::error::ConverterError;
use super::runner::{detect_engine, EngineRunner, ProcessRunner, RunControl};
use super::types::{ConversionRequest, EditRequest, EngineInfo, ExecutionResult};
use crate::metrics::{result_label, JOBS_TOTAL, JOB_DURATION};

/// Converts and edits audio files by driving the external engine.
///
/// Holds no per-request state; one instance can serve any number of
/// concurrent callers, each blocking on its own engine process.
pub struct AudioConverter<R = EngineRunner> {
    builder: CommandBuilder,
    engine_path: PathBuf,
    runner: R,
}

impl AudioConverter<EngineRunner> {
    /// Creates a converter using `ffmpeg` from `PATH`.
    pub fn with_defaults() -> Self {
        let config = ConverterConfig::default();
        Self::new(&config, EngineRunner::from_config(&config))
    }
}

impl<R: ProcessRunner> AudioConverter<R> {
    /// Creates a converter with the given configuration and runner.
    pub fn new(config: &ConverterConfig, runner: R) -> Self {
        Self {
            builder: CommandBuilder::from_config(config),
            engine_path: config.path.clone(),
            runner,
        }
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Converts `input_path` into `output_path`.
    pub fn convert(
        &self,
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        output_format: impl Into<String>,
    ) -> Result<ExecutionResult, ConverterError> {
        let req = ConversionRequest::new(input_path, output_path, output_format);
        self.convert_request(&req)
    }

    /// Runs a conversion request to completion.
    pub fn convert_request(
        &self,
        req: &ConversionRequest,
    ) -> Result<ExecutionResult, ConverterError> {
        self.convert_with(req, &RunControl::none())
    }

    /// Runs a conversion request under `control`.
    pub fn convert_with(
        &self,
        req: &ConversionRequest,
        control: &RunControl,
    ) -> Result<ExecutionResult, ConverterError> {
        let start = Instant::now();
        let result = self
            .builder
            .build_convert_args(req)
            .and_then(|args| self.runner.run_with(args, control));
        record("convert", &result, start);

        match &result {
            Ok(_) => info!(
                "Audio file converted to {} format and saved at {:?}",
                req.output_format, req.output_path
            ),
            Err(e) => warn!("Conversion of {:?} failed: {}", req.input_path, e),
        }
        result
    }

    /// Runs an edit request to completion.
    pub fn edit(&self, req: &EditRequest) -> Result<ExecutionResult, ConverterError> {
        self.edit_with(req, &RunControl::none())
    }

    /// Runs an edit request under `control`.
    pub fn edit_with(
        &self,
        req: &EditRequest,
        control: &RunControl,
    ) -> Result<ExecutionResult, ConverterError> {
        let start = Instant::now();
        let result = self
            .builder
            .build_edit_args(req)
            .and_then(|args| self.runner.run_with(args, control));
        record("edit", &result, start);

        match &result {
            Ok(_) => info!("Edited audio saved at {:?}", req.output_path),
            Err(e) => warn!("Edit of {:?} failed: {}", req.input_path, e),
        }
        result
    }

    /// Checks that the configured engine can be executed.
    pub fn validate(&self) -> Result<EngineInfo, ConverterError> {
        detect_engine(&self.engine_path)
    }
}

fn record(operation: &str, result: &Result<ExecutionResult, ConverterError>, start: Instant) {
    JOBS_TOTAL
        .with_label_values(&[operation, result_label(result)])
        .inc();
    JOB_DURATION
        .with_label_values(&[operation])
        .observe(start.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::EngineExit;
    use crate::testing::MockRunner;
    use std::time::Duration;

    fn converter(runner: MockRunner) -> AudioConverter<MockRunner> {
        AudioConverter::new(&ConverterConfig::default(), runner)
    }

    #[test]
    fn test_convert_passes_built_args_to_runner() {
        let runner = MockRunner::new();
        let converter = converter(runner.clone());

        let result = converter
            .convert("input.wav", "output.mp3", "mp3")
            .unwrap();
        assert!(result.succeeded);
        assert_eq!(result.exit_code, 0);

        let runs = runner.recorded_runs();
        assert_eq!(runs.len(), 1);
        assert_eq!(
            runs[0].args.as_slice(),
            ["ffmpeg", "-i", "input.wav", "output.mp3"]
        );
    }

    #[test]
    fn test_edit_propagates_execution_error() {
        let runner = MockRunner::new();
        runner.push_failure(EngineExit::Code(1), "Invalid data");
        let converter = converter(runner.clone());

        let err = converter
            .edit(&EditRequest::new("in.mp3", "out.wav").with_bitrate("192k"))
            .unwrap_err();
        match err {
            ConverterError::Execution {
                exit,
                stderr_output,
            } => {
                assert_eq!(exit, EngineExit::Code(1));
                assert_eq!(stderr_output, "Invalid data");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_request_never_reaches_runner() {
        let runner = MockRunner::new();
        let converter = converter(runner.clone());

        let err = converter
            .edit(&EditRequest::new("in.mp3", "out.wav").with_sample_rate(0))
            .unwrap_err();
        assert!(matches!(err, ConverterError::InvalidParameter { .. }));
        assert!(runner.recorded_runs().is_empty());
    }

    #[test]
    fn test_edit_with_forwards_control() {
        let runner = MockRunner::new();
        let converter = converter(runner.clone());
        let control = RunControl::none().with_deadline(Duration::from_secs(5));

        converter
            .edit_with(&EditRequest::new("in.mp3", "out.wav"), &control)
            .unwrap();
        assert_eq!(
            runner.recorded_runs()[0].deadline,
            Some(Duration::from_secs(5))
        );
    }
}
