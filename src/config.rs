use crate::error::AppError;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_REFRESH_SECS: u64 = 30;
pub const MIN_REFRESH_SECS: u64 = 5;
pub const MAX_REFRESH_SECS: u64 = 300;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_FALLBACK_API_BASE: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_PRIMARY_API_BASE: &str =
    "https://coingecko-api-without-rate-limit.p.rapidapi.com";
pub const DEFAULT_PRIMARY_API_HOST: &str = "coingecko-api-without-rate-limit.p.rapidapi.com";

pub const PRIMARY_BASE_ENV: &str = "HYPENAX_PRIMARY_API_BASE";
pub const PRIMARY_HOST_ENV: &str = "HYPENAX_PRIMARY_API_HOST";
pub const PRIMARY_KEY_ENV: &str = "HYPENAX_PRIMARY_API_KEY";
pub const FALLBACK_BASE_ENV: &str = "HYPENAX_FALLBACK_API_BASE";

#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Run against deterministic synthetic market data (no network)
    #[arg(long)]
    pub mock: bool,

    /// Market list refresh cadence in seconds
    #[arg(long)]
    pub refresh_secs: Option<u64>,

    /// Append diagnostics to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    pub debug: bool,
}

#[derive(Debug, Clone)]
pub struct PrimarySourceConfig {
    pub base_url: String,
    pub host_header: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub mock_mode: bool,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    pub log_file: Option<PathBuf>,
    pub debug: bool,
    pub primary: Option<PrimarySourceConfig>,
    pub fallback_base_url: String,
}

// API credentials come from the environment, never from source constants.
#[derive(Debug, Clone, Default)]
pub struct SourceEnv {
    pub primary_base_url: Option<String>,
    pub primary_host_header: Option<String>,
    pub primary_api_key: Option<String>,
    pub fallback_base_url: Option<String>,
}

impl SourceEnv {
    pub fn from_process_env() -> Self {
        Self {
            primary_base_url: read_env(PRIMARY_BASE_ENV),
            primary_host_header: read_env(PRIMARY_HOST_ENV),
            primary_api_key: read_env(PRIMARY_KEY_ENV),
            fallback_base_url: read_env(FALLBACK_BASE_ENV),
        }
    }

    pub fn normalize(self) -> Result<(Option<PrimarySourceConfig>, String), AppError> {
        let fallback_base_url = self
            .fallback_base_url
            .unwrap_or_else(|| DEFAULT_FALLBACK_API_BASE.to_string());
        validate_base_url(&fallback_base_url)?;

        // Without a key the primary would fail every cycle; skip it and let
        // the chain start at the public fallback.
        let primary = match self.primary_api_key {
            Some(api_key) => {
                let base_url = self
                    .primary_base_url
                    .unwrap_or_else(|| DEFAULT_PRIMARY_API_BASE.to_string());
                validate_base_url(&base_url)?;
                let host_header = self
                    .primary_host_header
                    .unwrap_or_else(|| DEFAULT_PRIMARY_API_HOST.to_string());
                Some(PrimarySourceConfig {
                    base_url,
                    host_header,
                    api_key,
                })
            }
            None => None,
        };

        Ok((primary, fallback_base_url))
    }
}

impl Cli {
    pub fn normalize(self, sources: SourceEnv) -> Result<AppConfig, AppError> {
        let refresh_secs = self.refresh_secs.unwrap_or(DEFAULT_REFRESH_SECS);
        if !(MIN_REFRESH_SECS..=MAX_REFRESH_SECS).contains(&refresh_secs) {
            return Err(AppError::InvalidArgument(format!(
                "refresh-secs must be between {MIN_REFRESH_SECS} and {MAX_REFRESH_SECS}"
            )));
        }

        let (primary, fallback_base_url) = sources.normalize()?;

        Ok(AppConfig {
            mock_mode: self.mock,
            refresh_interval: Duration::from_secs(refresh_secs),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            log_file: self.log_file,
            debug: self.debug,
            primary,
            fallback_base_url,
        })
    }
}

fn read_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn validate_base_url(base_url: &str) -> Result<(), AppError> {
    if base_url.starts_with("http://") || base_url.starts_with("https://") {
        Ok(())
    } else {
        Err(AppError::InvalidArgument(format!(
            "base url '{base_url}' must start with http:// or https://"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_cli_defaults() {
        let config = Cli::default()
            .normalize(SourceEnv::default())
            .expect("defaults should be valid");

        assert!(!config.mock_mode);
        assert_eq!(config.refresh_interval, Duration::from_secs(DEFAULT_REFRESH_SECS));
        assert_eq!(
            config.request_timeout,
            Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS)
        );
        assert!(config.primary.is_none());
        assert_eq!(config.fallback_base_url, DEFAULT_FALLBACK_API_BASE);
    }

    #[test]
    fn validates_refresh_secs_range() {
        let cli = Cli {
            refresh_secs: Some(1),
            ..Cli::default()
        };
        assert!(cli.normalize(SourceEnv::default()).is_err());

        let cli = Cli {
            refresh_secs: Some(100_000),
            ..Cli::default()
        };
        assert!(cli.normalize(SourceEnv::default()).is_err());
    }

    #[test]
    fn primary_source_requires_an_api_key() {
        let (primary, _) = SourceEnv {
            primary_base_url: Some("https://example.test/api/v3".to_string()),
            ..SourceEnv::default()
        }
        .normalize()
        .expect("sources should normalize");

        assert!(primary.is_none());
    }

    #[test]
    fn primary_source_fills_base_and_host_defaults() {
        let (primary, fallback) = SourceEnv {
            primary_api_key: Some("test-key".to_string()),
            ..SourceEnv::default()
        }
        .normalize()
        .expect("sources should normalize");

        let primary = primary.expect("key should enable the primary source");
        assert_eq!(primary.base_url, DEFAULT_PRIMARY_API_BASE);
        assert_eq!(primary.host_header, DEFAULT_PRIMARY_API_HOST);
        assert_eq!(primary.api_key, "test-key");
        assert_eq!(fallback, DEFAULT_FALLBACK_API_BASE);
    }

    #[test]
    fn rejects_malformed_base_urls() {
        let result = SourceEnv {
            fallback_base_url: Some("ftp://mirror.test".to_string()),
            ..SourceEnv::default()
        }
        .normalize();

        assert!(result.is_err());
    }
}
