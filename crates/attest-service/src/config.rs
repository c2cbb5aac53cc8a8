use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("ATTEST_SESSION_SECRET is not set — generate one with `attest secret`")]
    MissingSecret,
    #[error("ATTEST_SESSION_SECRET is not valid hex: {0}")]
    InvalidSecret(#[from] hex::FromHexError),
}

/// Service configuration, loaded from environment variables.
pub struct Config {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Cosine similarity threshold for a positive match.
    pub similarity_threshold: f32,
    /// Session token lifetime in seconds.
    pub session_lifetime_secs: i64,
    /// HMAC key for session token signing.
    pub session_secret: Vec<u8>,
    /// External command that turns an image on stdin into an embedding
    /// JSON array on stdout.
    pub extractor_cmd: String,
    /// Timeout in seconds for a single extraction call.
    pub extract_timeout_secs: u64,
    /// Expected number of captures per enrollment.
    pub samples_per_enroll: usize,
}

impl Config {
    /// Load configuration from `ATTEST_*` environment variables with
    /// defaults. The session secret has no default: tokens signed with
    /// a guessable key are worthless.
    pub fn from_env() -> Result<Self, ConfigError> {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("attest");

        let db_path = std::env::var("ATTEST_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("attest.db"));

        let session_secret = std::env::var("ATTEST_SESSION_SECRET")
            .map_err(|_| ConfigError::MissingSecret)
            .and_then(|hex_key| parse_secret(&hex_key))?;

        Ok(Self {
            db_path,
            similarity_threshold: env_f32(
                "ATTEST_SIMILARITY_THRESHOLD",
                attest_core::MatchPolicy::DEFAULT_THRESHOLD,
            ),
            session_lifetime_secs: env_i64(
                "ATTEST_SESSION_LIFETIME_SECS",
                attest_core::SessionConfig::DEFAULT_LIFETIME_SECS,
            ),
            session_secret,
            extractor_cmd: std::env::var("ATTEST_EXTRACTOR_CMD")
                .unwrap_or_else(|_| "attest-extract".to_string()),
            extract_timeout_secs: env_u64("ATTEST_EXTRACT_TIMEOUT_SECS", 10),
            samples_per_enroll: env_usize("ATTEST_SAMPLES_PER_ENROLL", 3),
        })
    }
}

/// Decode a hex-encoded HMAC key.
pub fn parse_secret(hex_key: &str) -> Result<Vec<u8>, ConfigError> {
    let secret = hex::decode(hex_key.trim())?;
    if secret.is_empty() {
        return Err(ConfigError::MissingSecret);
    }
    Ok(secret)
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
