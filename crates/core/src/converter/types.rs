//! Types for the converter module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Audio codec and container identifiers understood by the engine.
///
/// These are pass-through labels: the engine decides whether it can actually
/// encode them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Codec {
    /// Signed 16-bit PCM
    PcmS16le,
    /// Unsigned 8-bit PCM
    PcmU8,
    /// Signed 24-bit PCM
    PcmS24le,
    /// Signed 32-bit PCM
    PcmS32le,
    /// Advanced Audio Coding
    Aac,
    /// MPEG Audio Layer III
    Mp3,
    /// Vorbis (usually in Ogg)
    Vorbis,
    /// Free Lossless Audio Codec
    Flac,
    /// Opus
    Opus,
    /// Apple Lossless
    Alac,
    /// Waveform Audio File Format
    Wav,
    /// Dolby Digital
    Ac3,
    /// Dolby Digital Plus
    Eac3,
    /// Digital Theater Systems
    Dts,
    /// Adaptive Multi-Rate narrowband
    AmrNb,
    /// Adaptive Multi-Rate wideband
    AmrWb,
    /// Windows Media Audio
    Wma,
    /// GSM 06.10 full rate
    Gsm,
}

impl Codec {
    /// Every supported identifier, in documentation order.
    pub const ALL: [Codec; 18] = [
        Self::PcmS16le,
        Self::PcmU8,
        Self::PcmS24le,
        Self::PcmS32le,
        Self::Aac,
        Self::Mp3,
        Self::Vorbis,
        Self::Flac,
        Self::Opus,
        Self::Alac,
        Self::Wav,
        Self::Ac3,
        Self::Eac3,
        Self::Dts,
        Self::AmrNb,
        Self::AmrWb,
        Self::Wma,
        Self::Gsm,
    ];

    /// Returns the identifier as passed to the engine.
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::PcmS16le => "pcm_s16le",
            Self::PcmU8 => "pcm_u8",
            Self::PcmS24le => "pcm_s24le",
            Self::PcmS32le => "pcm_s32le",
            Self::Aac => "aac",
            Self::Mp3 => "mp3",
            Self::Vorbis => "vorbis",
            Self::Flac => "flac",
            Self::Opus => "opus",
            Self::Alac => "alac",
            Self::Wav => "wav",
            Self::Ac3 => "ac3",
            Self::Eac3 => "eac3",
            Self::Dts => "dts",
            Self::AmrNb => "amr_nb",
            Self::AmrWb => "amr_wb",
            Self::Wma => "wma",
            Self::Gsm => "gsm",
        }
    }

    /// Human readable name.
    pub fn description(&self) -> &'static str {
        match self {
            Self::PcmS16le => "Signed 16-bit PCM",
            Self::PcmU8 => "Unsigned 8-bit PCM",
            Self::PcmS24le => "Signed 24-bit PCM",
            Self::PcmS32le => "Signed 32-bit PCM",
            Self::Aac => "Advanced Audio Codec",
            Self::Mp3 => "MPEG Layer 3",
            Self::Vorbis => "Vorbis",
            Self::Flac => "Free Lossless Audio Codec",
            Self::Opus => "Opus",
            Self::Alac => "Apple Lossless Audio Codec",
            Self::Wav => "Waveform Audio File Format",
            Self::Ac3 => "Dolby Digital",
            Self::Eac3 => "Enhanced AC-3",
            Self::Dts => "Digital Theater Systems",
            Self::AmrNb => "Adaptive Multi-Rate (Narrowband)",
            Self::AmrWb => "Adaptive Multi-Rate (Wideband)",
            Self::Wma => "Windows Media Audio",
            Self::Gsm => "GSM Full Rate",
        }
    }

    /// File extensions whose containers normally carry this codec.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::PcmS16le | Self::PcmU8 | Self::PcmS24le | Self::PcmS32le | Self::Wav => {
                &["wav"]
            }
            Self::Aac => &["aac", "m4a", "mp4"],
            Self::Mp3 => &["mp3"],
            Self::Vorbis => &["ogg", "oga"],
            Self::Flac => &["flac"],
            Self::Opus => &["opus", "ogg"],
            Self::Alac => &["m4a", "caf"],
            Self::Ac3 => &["ac3"],
            Self::Eac3 => &["eac3", "ec3"],
            Self::Dts => &["dts"],
            Self::AmrNb => &["amr"],
            Self::AmrWb => &["amr", "awb"],
            Self::Wma => &["wma", "asf"],
            Self::Gsm => &["gsm", "wav"],
        }
    }

    /// Looks up a codec by identifier, ignoring ASCII case.
    pub fn from_identifier(identifier: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|codec| codec.identifier().eq_ignore_ascii_case(identifier))
    }
}

impl fmt::Display for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.identifier())
    }
}

/// A request to convert a file into another format.
///
/// The engine picks the output format from the output file extension;
/// `output_format` is the caller's label for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRequest {
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path.
    pub output_path: PathBuf,
    /// Desired output format label (e.g. "mp3", "wav").
    pub output_format: String,
}

impl ConversionRequest {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        output_format: impl Into<String>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            output_format: output_format.into(),
        }
    }
}

/// A request to re-encode a file while adjusting its audio properties.
///
/// Every optional field left as `None` keeps whatever the engine would pick
/// on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditRequest {
    /// Input file path.
    pub input_path: PathBuf,
    /// Output file path. Overwritten if it exists.
    pub output_path: PathBuf,
    /// Gain in decibels. `None` or `0.0` leaves the volume untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_change_db: Option<f64>,
    /// Target bitrate (e.g. "192k"). `None` or empty keeps the encoder default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    /// Target sample rate in Hz. `None` keeps the source rate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
    /// Target codec identifier (e.g. "pcm_s16le"). `None` or empty lets the
    /// engine choose from the output extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

impl EditRequest {
    /// Creates an edit request that changes nothing but the container.
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            volume_change_db: None,
            bitrate: None,
            sample_rate: None,
            encoding: None,
        }
    }

    pub fn with_volume_change_db(mut self, db: f64) -> Self {
        self.volume_change_db = Some(db);
        self
    }

    pub fn with_bitrate(mut self, bitrate: impl Into<String>) -> Self {
        self.bitrate = Some(bitrate.into());
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = Some(sample_rate);
        self
    }

    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }
}

/// Ordered program + arguments for one engine invocation.
///
/// Built by [`CommandBuilder`](super::CommandBuilder) and consumed by a
/// [`ProcessRunner`](super::ProcessRunner). Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentVector(Vec<String>);

impl ArgumentVector {
    /// Wraps an explicit argument list. The first element is the program.
    pub fn new(args: Vec<String>) -> Self {
        Self(args)
    }

    /// The program to execute.
    pub fn program(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    /// Everything after the program.
    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of times `flag` appears as a whole argument.
    pub fn count(&self, flag: &str) -> usize {
        self.0.iter().filter(|arg| *arg == flag).count()
    }

    /// The argument following the first occurrence of `flag`.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        let idx = self.0.iter().position(|arg| arg == flag)?;
        self.0.get(idx + 1).map(String::as_str)
    }

    pub fn into_inner(self) -> Vec<String> {
        self.0
    }
}

impl fmt::Display for ArgumentVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, arg) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                write!(f, "{:?}", arg)?;
            } else {
                f.write_str(arg)?;
            }
        }
        Ok(())
    }
}

/// How the engine process ended when it did not exit cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "code", rename_all = "snake_case")]
pub enum EngineExit {
    /// Process exited with this status code.
    Code(i32),
    /// Process was terminated by a signal, a cancellation or a deadline.
    Killed,
}

impl EngineExit {
    /// Maps a finished process status.
    pub fn from_status(status: std::process::ExitStatus) -> Self {
        match status.code() {
            Some(code) => Self::Code(code),
            None => Self::Killed,
        }
    }

    /// Numeric exit code, if the process exited on its own.
    pub fn code(&self) -> Option<i32> {
        match self {
            Self::Code(code) => Some(*code),
            Self::Killed => None,
        }
    }
}

impl fmt::Display for EngineExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Code(code) => write!(f, "exit code {}", code),
            Self::Killed => f.write_str("killed"),
        }
    }
}

/// Result of a successful engine run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Always true; failures are reported as errors.
    pub succeeded: bool,
    /// Process exit code (0).
    pub exit_code: i32,
    /// Whatever the engine wrote to stderr, trailing whitespace trimmed.
    pub stderr_output: String,
    /// Wall time of the run in milliseconds.
    pub duration_ms: u64,
}

/// Information about the engine binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineInfo {
    /// Path or name the engine was invoked with.
    pub path: PathBuf,
    /// First line of the engine's version banner.
    pub version: Option<String>,
}

/// Lowercased extension of `path`, if any.
pub(crate) fn extension_of(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}
