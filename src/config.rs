use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub auth: AuthConfig,
    pub node: NodeConfig,
    pub storage: StorageConfig,
    pub uploads: UploadConfig,
}

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub bind_address: String,
    /// Directory holding the redb metadata file
    pub data_dir: String,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub admin_username: String,
    pub admin_password: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Directory for finalized media files
    pub media_dir: String,
    /// Directory for in-progress upload parts. Must share a filesystem with
    /// `media_dir` so finalization is a plain rename.
    pub tmp_dir: String,
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Maximum size of a single chunk request body in bytes
    pub max_chunk_size: u64,
    /// Upper bound for one append or finish, lock wait included
    pub op_timeout: Duration,
    /// Sessions older than this are swept. `None` disables the sweeper.
    pub session_ttl: Option<Duration>,
    pub sweep_interval: Duration,
}

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_dir: "./uploads/animations".to_string(),
            tmp_dir: "./uploads/tmp".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 8 * 1024 * 1024,
            op_timeout: Duration::from_secs(30),
            session_ttl: Some(Duration::from_secs(24 * 60 * 60)),
            sweep_interval: Duration::from_secs(60 * 60),
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

        let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "./data".to_string());

        let defaults = StorageConfig::default();
        let media_dir = std::env::var("MEDIA_DIR").unwrap_or(defaults.media_dir);
        let tmp_dir = std::env::var("TMP_DIR").unwrap_or(defaults.tmp_dir);

        let admin_username = std::env::var("ADMIN_USERNAME")
            .unwrap_or_else(|_| DEFAULT_ADMIN_USERNAME.to_string());
        let admin_password = std::env::var("ADMIN_PASSWORD")
            .unwrap_or_else(|_| DEFAULT_ADMIN_PASSWORD.to_string());

        let upload_defaults = UploadConfig::default();
        let max_chunk_size = env_u64("MAX_CHUNK_SIZE").unwrap_or(upload_defaults.max_chunk_size);
        let op_timeout = env_u64("UPLOAD_OP_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(upload_defaults.op_timeout);

        // 0 turns the sweeper off
        let session_ttl = match env_u64("SESSION_TTL_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => upload_defaults.session_ttl,
        };
        let sweep_interval = env_u64("SESSION_SWEEP_INTERVAL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(upload_defaults.sweep_interval);

        let config = Config {
            auth: AuthConfig {
                admin_username,
                admin_password,
            },
            node: NodeConfig {
                bind_address,
                data_dir,
            },
            storage: StorageConfig { media_dir, tmp_dir },
            uploads: UploadConfig {
                max_chunk_size,
                op_timeout,
                session_ttl,
                sweep_interval,
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.admin_username.is_empty() || self.auth.admin_password.is_empty() {
            return Err(ConfigError::ValidationError(
                "ADMIN_USERNAME and ADMIN_PASSWORD cannot be empty".to_string(),
            ));
        }

        if self.uploads.max_chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "MAX_CHUNK_SIZE must be greater than 0".to_string(),
            ));
        }

        if self.uploads.op_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "UPLOAD_OP_TIMEOUT_SECS must be greater than 0".to_string(),
            ));
        }

        if self.uploads.session_ttl.is_some() && self.uploads.sweep_interval.is_zero() {
            return Err(ConfigError::ValidationError(
                "SESSION_SWEEP_INTERVAL_SECS must be greater than 0".to_string(),
            ));
        }

        if self.auth.admin_password == DEFAULT_ADMIN_PASSWORD {
            tracing::warn!(
                "ADMIN_PASSWORD is the built-in default. Set it before exposing this service."
            );
        }

        Ok(())
    }
}
