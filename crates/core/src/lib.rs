pub mod config;
pub mod converter;
pub mod metrics;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, ServerConfig,
};
pub use converter::{
    detect_engine, label_matches_extension, ArgumentVector, AudioConverter, CancelToken, Codec,
    CommandBuilder, ConversionRequest, ConverterConfig, ConverterError, EditRequest, EngineExit,
    EngineInfo, EngineRunner, ExecutionResult, FormatPolicy, ProcessRunner, RunControl,
};
