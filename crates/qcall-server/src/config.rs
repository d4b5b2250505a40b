//! Server settings loaded from the environment

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::application::{PrintDispatcherConfig, ResolverConfig, SequencerConfig};
use crate::services::retention::RetentionConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Everything the server reads from the environment
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub audio_public_path: String,
    pub print_spool_dir: PathBuf,
    pub printer_name: Option<String>,
    pub tts_language: String,
    pub tts_http_timeout: Duration,
    pub tts_process_timeout: Duration,
    pub print_timeout: Duration,
    pub sequencer: SequencerConfig,
    pub resolver: ResolverConfig,
    pub print: PrintDispatcherConfig,
    pub retention: RetentionConfig,
}

/// Source of raw values, so parsing can be tested without touching the
/// process environment
trait Source {
    fn get(&self, name: &str) -> Option<String>;
}

struct ProcessEnv;

impl Source for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

fn parse_or<T: FromStr>(
    source: &dyn Source,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match source.get(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}

fn millis(source: &dyn Source, name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    parse_or(source, name, default).map(Duration::from_millis)
}

fn secs(source: &dyn Source, name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    parse_or(source, name, default).map(Duration::from_secs)
}

impl Settings {
    /// Read settings from the process environment (and `.env`, if loaded)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(&ProcessEnv)
    }

    fn from_source(source: &dyn Source) -> Result<Self, ConfigError> {
        let database_url = source
            .get("DATABASE_URL")
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let bind_addr = parse_or(source, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8000)))?;

        let audio_dir = source
            .get("AUDIO_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./public/audio"));
        let audio_public_path = source
            .get("AUDIO_PUBLIC_PATH")
            .unwrap_or_else(|| "/audio".to_string());
        let audio_public_path = format!("/{}", audio_public_path.trim_matches('/'));

        let sequencer_defaults = SequencerConfig::default();
        let sequencer = SequencerConfig {
            poll_interval: millis(source, "CALL_POLL_INTERVAL_MS", 2000)?,
            settle_delay: millis(source, "CALL_SETTLE_DELAY_MS", 3000)?,
            duplicate_window: secs(source, "CALL_DUPLICATE_WINDOW_SECS", 120)?,
            history_retention: secs(source, "CALL_HISTORY_RETENTION_SECS", 300)?,
            failure_threshold: parse_or(source, "CALL_FAILURE_THRESHOLD", 3)?,
            store_timeout: millis(source, "CALL_STORE_TIMEOUT_MS", 5000)?,
            announce_timeout: millis(source, "CALL_ANNOUNCE_TIMEOUT_MS", 30000)?,
            ..sequencer_defaults
        };

        let resolver = ResolverConfig {
            audio_dir,
            public_path: audio_public_path.clone(),
            min_clip_bytes: parse_or(source, "AUDIO_MIN_CLIP_BYTES", 1000)?,
        };

        let print = PrintDispatcherConfig {
            max_queue: parse_or(source, "PRINT_MAX_QUEUE", 50)?,
            retain_on_overflow: parse_or(source, "PRINT_RETAIN_ON_OVERFLOW", 10)?,
            max_retries: parse_or(source, "PRINT_MAX_RETRIES", 3)?,
            job_delay: millis(source, "PRINT_JOB_DELAY_MS", 1000)?,
            cleanup_interval: secs(source, "PRINT_CLEANUP_INTERVAL_SECS", 10)?,
            max_job_age: secs(source, "PRINT_MAX_JOB_AGE_SECS", 300)?,
            recovery_interval: secs(source, "PRINT_RECOVERY_INTERVAL_SECS", 15)?,
            stuck_timeout: secs(source, "PRINT_STUCK_TIMEOUT_SECS", 30)?,
        };

        let retention_hours: u64 = parse_or(source, "REQUEST_RETENTION_HOURS", 24)?;
        let retention = RetentionConfig {
            retention: Duration::from_secs(retention_hours * 3600),
            ..RetentionConfig::default()
        };

        Ok(Self {
            database_url,
            bind_addr,
            audio_public_path,
            print_spool_dir: source
                .get("PRINT_SPOOL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            printer_name: source.get("PRINTER_NAME"),
            tts_language: source.get("TTS_LANGUAGE").unwrap_or_else(|| "ur".to_string()),
            tts_http_timeout: millis(source, "TTS_HTTP_TIMEOUT_MS", 10000)?,
            tts_process_timeout: millis(source, "TTS_PROCESS_TIMEOUT_MS", 15000)?,
            print_timeout: millis(source, "PRINT_TIMEOUT_MS", 10000)?,
            sequencer,
            resolver,
            print,
            retention,
        })
    }
}
