//! Engine argument construction.

use std::path::Path;
use tracing::warn;

use super::config::{ConverterConfig, FormatPolicy};
use super::error::ConverterError;
use super::types::{extension_of, ArgumentVector, Codec, ConversionRequest, EditRequest};

/// Builds argument vectors for the engine.
///
/// Arguments are always separate argv elements; nothing here is ever parsed
/// by a shell, so paths and values need no quoting.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    engine_path: String,
    global_args: Vec<String>,
    format_policy: FormatPolicy,
}

impl CommandBuilder {
    /// Creates a builder for the engine at `engine_path`.
    pub fn new(engine_path: impl AsRef<Path>) -> Self {
        Self {
            engine_path: engine_path.as_ref().to_string_lossy().to_string(),
            global_args: Vec::new(),
            format_policy: FormatPolicy::default(),
        }
    }

    /// Creates a builder from converter configuration.
    pub fn from_config(config: &ConverterConfig) -> Self {
        Self::new(&config.path)
            .with_global_args(config.global_args.clone())
            .with_format_policy(config.format_policy)
    }

    /// Sets arguments placed right after the engine path.
    pub fn with_global_args(mut self, args: Vec<String>) -> Self {
        self.global_args = args;
        self
    }

    /// Sets the format label policy.
    pub fn with_format_policy(mut self, policy: FormatPolicy) -> Self {
        self.format_policy = policy;
        self
    }

    pub fn engine_path(&self) -> &str {
        &self.engine_path
    }

    /// Builds `<engine> -i <input> <output>`.
    ///
    /// The engine picks the output format from the output extension, so
    /// `output_format` only takes part in the label check.
    pub fn build_convert_args(
        &self,
        req: &ConversionRequest,
    ) -> Result<ArgumentVector, ConverterError> {
        let (input, output) = validate_paths(&req.input_path, &req.output_path)?;
        self.check_format_label(&req.output_format, &req.output_path)?;

        let mut args = self.base_args();
        args.extend(["-i".to_string(), input.to_string()]);
        args.push(output.to_string());

        Ok(ArgumentVector::new(args))
    }

    /// Builds `<engine> -y -i <input> [edits...] <output>`.
    ///
    /// Optional edits are appended as filter, sample rate, codec, bitrate,
    /// always in that order.
    pub fn build_edit_args(&self, req: &EditRequest) -> Result<ArgumentVector, ConverterError> {
        let (input, output) = validate_paths(&req.input_path, &req.output_path)?;

        if req.sample_rate == Some(0) {
            return Err(ConverterError::invalid_parameter(
                "sample_rate must be a positive number of Hz",
            ));
        }

        let mut args = self.base_args();
        args.extend([
            "-y".to_string(), // Overwrite output
            "-i".to_string(),
            input.to_string(),
        ]);

        // Volume filter
        if let Some(db) = req.volume_change_db {
            if !db.is_finite() {
                return Err(ConverterError::invalid_parameter(format!(
                    "volume_change_db must be finite, got {}",
                    db
                )));
            }
            if db != 0.0 {
                args.extend(["-filter:a".to_string(), format!("volume={}dB", db)]);
            }
        }

        // Sample rate
        if let Some(rate) = req.sample_rate {
            args.extend(["-ar".to_string(), rate.to_string()]);
        }

        // Audio codec
        if let Some(encoding) = non_empty(&req.encoding) {
            args.extend(["-c:a".to_string(), encoding.to_string()]);
        }

        // Bitrate
        if let Some(bitrate) = non_empty(&req.bitrate) {
            args.extend(["-b:a".to_string(), bitrate.to_string()]);
        }

        // Output
        args.push(output.to_string());

        Ok(ArgumentVector::new(args))
    }

    fn base_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(self.global_args.len() + 8);
        args.push(self.engine_path.clone());
        args.extend(self.global_args.iter().cloned());
        args
    }

    fn check_format_label(&self, label: &str, output_path: &Path) -> Result<(), ConverterError> {
        if label_matches_extension(label, output_path) {
            return Ok(());
        }

        let extension = extension_of(output_path).unwrap_or_default();
        match self.format_policy {
            FormatPolicy::Permissive => {
                warn!(
                    "Output format label {:?} does not match extension {:?} of {:?}; the engine will follow the extension",
                    label, extension, output_path
                );
                Ok(())
            }
            FormatPolicy::Strict => Err(ConverterError::invalid_parameter(format!(
                "output format {:?} does not match output extension {:?}",
                label, extension
            ))),
        }
    }
}

/// Whether `label` names the format implied by the extension of `output_path`.
pub fn label_matches_extension(label: &str, output_path: &Path) -> bool {
    let Some(extension) = extension_of(output_path) else {
        return false;
    };

    if label.eq_ignore_ascii_case(&extension) {
        return true;
    }

    Codec::from_identifier(label)
        .map(|codec| codec.extensions().contains(&extension.as_str()))
        .unwrap_or(false)
}

fn validate_paths<'a>(
    input: &'a Path,
    output: &'a Path,
) -> Result<(&'a str, &'a str), ConverterError> {
    let input_str = path_str(input, "input_path")?;
    let output_str = path_str(output, "output_path")?;

    // The output is positional, so the engine would parse it as an option.
    if output_str.starts_with('-') {
        return Err(ConverterError::invalid_parameter(format!(
            "output_path must not start with '-', got {:?}",
            output_str
        )));
    }

    if input == output {
        return Err(ConverterError::invalid_parameter(format!(
            "input_path and output_path must differ, both are {:?}",
            input_str
        )));
    }

    Ok((input_str, output_str))
}

fn path_str<'a>(path: &'a Path, name: &str) -> Result<&'a str, ConverterError> {
    let s = path
        .to_str()
        .ok_or_else(|| ConverterError::invalid_parameter(format!("{} is not valid UTF-8", name)))?;
    if s.is_empty() {
        return Err(ConverterError::invalid_parameter(format!(
            "{} must not be empty",
            name
        )));
    }
    Ok(s)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> CommandBuilder {
        CommandBuilder::new("ffmpeg")
    }

    fn strings(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_convert_args() {
        let req = ConversionRequest::new("input.wav", "output.mp3", "mp3");
        let args = builder().build_convert_args(&req).unwrap();
        assert_eq!(
            args.into_inner(),
            strings(&["ffmpeg", "-i", "input.wav", "output.mp3"])
        );
    }

    #[test]
    fn test_build_convert_args_keeps_metacharacters_literal() {
        let req = ConversionRequest::new("in; rm -rf ~.wav", "$(whoami) `id`.mp3", "mp3");
        let args = builder().build_convert_args(&req).unwrap();
        assert_eq!(args.program(), Some("ffmpeg"));
        assert_eq!(args.len(), 4);
        assert_eq!(args.value_of("-i"), Some("in; rm -rf ~.wav"));
        assert_eq!(args.as_slice()[3], "$(whoami) `id`.mp3");
    }

    #[test]
    fn test_build_convert_args_with_global_args() {
        let builder = builder().with_global_args(strings(&["-hide_banner", "-nostdin"]));
        let req = ConversionRequest::new("a.flac", "b.ogg", "vorbis");
        let args = builder.build_convert_args(&req).unwrap();
        assert_eq!(
            args.into_inner(),
            strings(&["ffmpeg", "-hide_banner", "-nostdin", "-i", "a.flac", "b.ogg"])
        );
    }

    #[test]
    fn test_build_edit_args_sample_rate_and_encoding() {
        let req = EditRequest::new("in.mp3", "out.wav")
            .with_sample_rate(48000)
            .with_encoding("pcm_u8");
        let args = builder().build_edit_args(&req).unwrap();
        assert_eq!(
            args.into_inner(),
            strings(&[
                "ffmpeg", "-y", "-i", "in.mp3", "-ar", "48000", "-c:a", "pcm_u8", "out.wav"
            ])
        );
    }

    #[test]
    fn test_build_edit_args_all_options_ordered() {
        let req = EditRequest::new("in.flac", "out.m4a")
            .with_bitrate("192k")
            .with_encoding("aac")
            .with_sample_rate(44100)
            .with_volume_change_db(-3.5);
        let args = builder().build_edit_args(&req).unwrap();
        assert_eq!(
            args.into_inner(),
            strings(&[
                "ffmpeg",
                "-y",
                "-i",
                "in.flac",
                "-filter:a",
                "volume=-3.5dB",
                "-ar",
                "44100",
                "-c:a",
                "aac",
                "-b:a",
                "192k",
                "out.m4a"
            ])
        );
    }

    #[test]
    fn test_build_edit_args_zero_volume_has_no_filter() {
        let req = EditRequest::new("in.mp3", "out.wav").with_volume_change_db(0.0);
        let args = builder().build_edit_args(&req).unwrap();
        assert_eq!(args.count("-filter:a"), 0);

        let req = EditRequest::new("in.mp3", "out.wav").with_volume_change_db(-0.0);
        let args = builder().build_edit_args(&req).unwrap();
        assert_eq!(args.count("-filter:a"), 0);
    }

    #[test]
    fn test_build_edit_args_volume_formatting() {
        let req = EditRequest::new("in.mp3", "out.wav").with_volume_change_db(6.0);
        let args = builder().build_edit_args(&req).unwrap();
        assert_eq!(args.count("-filter:a"), 1);
        assert_eq!(args.value_of("-filter:a"), Some("volume=6dB"));
    }

    #[test]
    fn test_build_edit_args_minimal() {
        let req = EditRequest::new("in.mp3", "out.ogg");
        let args = builder().build_edit_args(&req).unwrap();
        assert_eq!(
            args.into_inner(),
            strings(&["ffmpeg", "-y", "-i", "in.mp3", "out.ogg"])
        );
    }

    #[test]
    fn test_build_edit_args_empty_strings_are_absent() {
        let req = EditRequest::new("in.mp3", "out.ogg")
            .with_bitrate("")
            .with_encoding("");
        let args = builder().build_edit_args(&req).unwrap();
        assert_eq!(args.count("-b:a"), 0);
        assert_eq!(args.count("-c:a"), 0);
    }

    #[test]
    fn test_build_edit_args_zero_sample_rate_rejected() {
        let req = EditRequest::new("in.mp3", "out.wav").with_sample_rate(0);
        let err = builder().build_edit_args(&req).unwrap_err();
        assert!(matches!(err, ConverterError::InvalidParameter { .. }));
    }

    #[test]
    fn test_build_edit_args_non_finite_volume_rejected() {
        for db in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let req = EditRequest::new("in.mp3", "out.wav").with_volume_change_db(db);
            let err = builder().build_edit_args(&req).unwrap_err();
            assert!(matches!(err, ConverterError::InvalidParameter { .. }));
        }
    }

    #[test]
    fn test_paths_validation() {
        let empty_input = ConversionRequest::new("", "out.mp3", "mp3");
        assert!(matches!(
            builder().build_convert_args(&empty_input),
            Err(ConverterError::InvalidParameter { .. })
        ));

        let empty_output = EditRequest::new("in.mp3", "");
        assert!(matches!(
            builder().build_edit_args(&empty_output),
            Err(ConverterError::InvalidParameter { .. })
        ));

        let same = EditRequest::new("song.mp3", "song.mp3");
        assert!(matches!(
            builder().build_edit_args(&same),
            Err(ConverterError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_output_path_with_leading_dash_rejected() {
        for output in ["-f", "-y", "--", "-filter_complex"] {
            let convert = ConversionRequest::new("in.wav", output, "mp3");
            assert!(matches!(
                builder().build_convert_args(&convert),
                Err(ConverterError::InvalidParameter { .. })
            ));

            let edit = EditRequest::new("in.wav", output);
            assert!(matches!(
                builder().build_edit_args(&edit),
                Err(ConverterError::InvalidParameter { .. })
            ));
        }

        // Dashes inside the path, or a relative path, stay allowed.
        let ok = ConversionRequest::new("in.wav", "./-take2.mp3", "mp3");
        assert_eq!(
            builder().build_convert_args(&ok).unwrap().into_inner(),
            strings(&["ffmpeg", "-i", "in.wav", "./-take2.mp3"])
        );
    }

    #[test]
    fn test_input_path_with_leading_dash_stays_after_input_flag() {
        let req = ConversionRequest::new("-rec.wav", "out.mp3", "mp3");
        assert_eq!(
            builder().build_convert_args(&req).unwrap().into_inner(),
            strings(&["ffmpeg", "-i", "-rec.wav", "out.mp3"])
        );
    }

    #[test]
    fn test_permissive_policy_allows_mismatched_label() {
        let req = ConversionRequest::new("input.wav", "output.mp3", "flac");
        let args = builder().build_convert_args(&req).unwrap();
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_strict_policy_rejects_mismatched_label() {
        let strict = builder().with_format_policy(FormatPolicy::Strict);

        let mismatch = ConversionRequest::new("input.wav", "output.mp3", "flac");
        assert!(matches!(
            strict.build_convert_args(&mismatch),
            Err(ConverterError::InvalidParameter { .. })
        ));

        let codec_label = ConversionRequest::new("input.flac", "output.ogg", "vorbis");
        assert!(strict.build_convert_args(&codec_label).is_ok());

        let container_label = ConversionRequest::new("input.flac", "output.M4A", "m4a");
        assert!(strict.build_convert_args(&container_label).is_ok());

        let no_extension = ConversionRequest::new("input.flac", "output", "mp3");
        assert!(strict.build_convert_args(&no_extension).is_err());
    }

    #[test]
    fn test_label_matches_extension() {
        assert!(label_matches_extension("mp3", Path::new("a.mp3")));
        assert!(label_matches_extension("pcm_s16le", Path::new("a.wav")));
        assert!(label_matches_extension("AAC", Path::new("a.m4a")));
        assert!(!label_matches_extension("opus", Path::new("a.flac")));
        assert!(!label_matches_extension("mp3", Path::new("noext")));
    }

    #[test]
    fn test_from_config() {
        let config = ConverterConfig::with_path("/opt/ffmpeg/bin/ffmpeg")
            .with_global_args(["-loglevel", "error"]);
        let builder = CommandBuilder::from_config(&config);
        assert_eq!(builder.engine_path(), "/opt/ffmpeg/bin/ffmpeg");

        let req = ConversionRequest::new("a.wav", "b.flac", "flac");
        let args = builder.build_convert_args(&req).unwrap();
        assert_eq!(
            args.into_inner(),
            strings(&["/opt/ffmpeg/bin/ffmpeg", "-loglevel", "error", "-i", "a.wav", "b.flac"])
        );
    }
}
