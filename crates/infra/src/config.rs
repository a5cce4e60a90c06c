//! Engine configuration from the environment.

use tracing::warn;
use tracing_subscriber::EnvFilter;

use batchrun_core::{BatchError, BatchResult};

pub const CHUNK_SIZE_VAR: &str = "BATCHRUN_CHUNK_SIZE";
pub const LOG_VAR: &str = "BATCHRUN_LOG";

pub const DEFAULT_CHUNK_SIZE: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Default chunk size for pipelines built by registered factories.
    pub chunk_size: usize,
    /// `tracing` filter directive.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            log_filter: batchrun_observability::DEFAULT_FILTER.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> BatchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys take their defaults.
    pub fn from_lookup<F>(lookup: F) -> BatchResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        match lookup(CHUNK_SIZE_VAR) {
            Some(raw) => config.chunk_size = parse_chunk_size(&raw)?,
            None => warn!(default = DEFAULT_CHUNK_SIZE, "{CHUNK_SIZE_VAR} not set, using default"),
        }

        if let Some(raw) = lookup(LOG_VAR) {
            let directive = raw.trim();
            EnvFilter::try_new(directive).map_err(|err| {
                BatchError::configuration(format!("{LOG_VAR}: invalid filter `{directive}`")).with_source(err)
            })?;
            config.log_filter = directive.to_string();
        }

        Ok(config)
    }

    /// Install the process-wide subscriber with this config's filter.
    pub fn init_tracing(&self) {
        batchrun_observability::init_with_filter(&self.log_filter);
    }
}

fn parse_chunk_size(raw: &str) -> BatchResult<usize> {
    let size: usize = raw.trim().parse().map_err(|err| {
        BatchError::configuration(format!("{CHUNK_SIZE_VAR}: `{raw}` is not a positive integer")).with_source(err)
    })?;
    if size == 0 {
        return Err(BatchError::configuration(format!("{CHUNK_SIZE_VAR} must be at least 1")));
    }
    Ok(size)
}
