//! Converter module for driving the external audio engine.
//!
//! This module turns conversion and edit requests into explicit argument
//! vectors and runs them as child processes, never through a shell.
//!
//! # Features
//!
//! - Format conversion (the engine follows the output extension)
//! - Volume, sample rate, codec and bitrate edits
//! - Typed failures: invalid parameters, missing engine, engine errors
//! - Cancellation and deadlines for running jobs
//!
//! # Example
//!
//! ```ignore
//! use soundshift_core::converter::{AudioConverter, EditRequest};
//!
//! let converter = AudioConverter::with_defaults();
//!
//! // Validate the engine is available
//! converter.validate()?;
//!
//! // Convert WAV to MP3
//! converter.convert("input.wav", "output.mp3", "mp3")?;
//!
//! // Resample and re-encode
//! let edit = EditRequest::new("input.mp3", "output_edited.wav")
//!     .with_sample_rate(48000)
//!     .with_encoding("pcm_u8");
//! let result = converter.edit(&edit)?;
//! println!("Edited in {} ms", result.duration_ms);
//! ```

mod builder;
mod config;
mod engine;
mod error;
mod runner;
mod types;

pub use builder::{label_matches_extension, CommandBuilder};
pub use config::{ConverterConfig, FormatPolicy};
pub use engine::AudioConverter;
pub use error::ConverterError;
pub use runner::{detect_engine, CancelToken, EngineRunner, ProcessRunner, RunControl};
pub use types::{
    ArgumentVector, Codec, ConversionRequest, EditRequest, EngineExit, EngineInfo,
    ExecutionResult,
};
