//! Testing utilities and mock implementations.
//!
//! The mock runner lets callers exercise the converter and anything built on
//! top of it without an engine binary installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use soundshift_core::testing::MockRunner;
//!
//! let runner = MockRunner::new();
//! runner.push_failure(EngineExit::Code(1), "Invalid data");
//!
//! // Use in AudioConverter::new(&config, runner.clone())...
//! ```

mod mock_runner;

pub use mock_runner::{MockOutcome, MockRunner, RecordedRun};
