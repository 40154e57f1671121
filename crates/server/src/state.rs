use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use soundshift_core::{AudioConverter, Config, EngineRunner, ProcessRunner, RunControl};

/// Converter type shared by all handlers.
pub type SharedConverter = AudioConverter<Arc<dyn ProcessRunner>>;

/// Shared application state
pub struct AppState {
    config: Config,
    converter: Arc<SharedConverter>,
    job_slots: Arc<Semaphore>,
}

impl AppState {
    pub fn new(config: Config, runner: Arc<dyn ProcessRunner>) -> Self {
        let converter = AudioConverter::new(&config.engine, runner);
        let job_slots = Arc::new(Semaphore::new(config.engine.max_parallel_jobs.max(1)));
        Self {
            config,
            converter: Arc::new(converter),
            job_slots,
        }
    }

    /// State backed by the real engine runner.
    pub fn with_engine(config: Config) -> Self {
        let runner: Arc<dyn ProcessRunner> = Arc::new(EngineRunner::from_config(&config.engine));
        Self::new(config, runner)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn converter(&self) -> Arc<SharedConverter> {
        Arc::clone(&self.converter)
    }

    /// Limits how many engine processes run at once.
    pub fn job_slots(&self) -> Arc<Semaphore> {
        Arc::clone(&self.job_slots)
    }

    /// Run control applied to every job started through the API.
    pub fn run_control(&self) -> RunControl {
        match self.config.engine.timeout_secs {
            Some(secs) => RunControl::none().with_deadline(Duration::from_secs(secs)),
            None => RunControl::none(),
        }
    }
}
