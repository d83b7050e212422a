//! Buffer pool configuration.

use config::ConfigError;
use serde::Deserialize;

const DEFAULT_POOL_SIZE: usize = 1024;

/// Configuration for the buffer pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BufferPoolConfig {
    /// Number of frames in the buffer pool.
    ///
    /// Fixed for the lifetime of the pool. Common values:
    /// - 128 frames = 1MB (for testing)
    /// - 1024 frames = 8MB (small database)
    /// - 131072 frames = 1GB
    pub pool_size: usize,
}

impl Default for BufferPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl BufferPoolConfig {
    /// Builds a configuration from defaults, an optional config file and
    /// `CLOCKPOOL_*` environment variables, later sources winning.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or parsed, or if `pool_size` is 0.
    pub fn load(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder =
            config::Config::builder().set_default("pool_size", DEFAULT_POOL_SIZE as i64)?;
        if let Some(file) = file {
            builder = builder.add_source(config::File::with_name(file));
        }
        builder = builder.add_source(config::Environment::with_prefix("CLOCKPOOL"));

        let cfg: Self = builder.build()?.try_deserialize()?;
        if cfg.pool_size == 0 {
            return Err(ConfigError::Message("pool_size must be > 0".to_string()));
        }
        Ok(cfg)
    }
}
