use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use snafu::{ensure, OptionExt, ResultExt, Snafu};
use url::Url;
use crate::bitrate::{self, DEFAULT_SIZE_LIMIT};

#[cfg(target_os = "windows")]
const FFMPEG_EXE: &str = "ffmpeg.exe";
#[cfg(not(target_os = "windows"))]
const FFMPEG_EXE: &str = "ffmpeg";

pub const API_KEY: &str = "API_KEY";
pub const BASE_URL: &str = "BASE_URL";
pub const SIZE_LIMIT: &str = "SIZE_LIMIT";
pub const FFMPEG: &str = "FFMPEG";

/// Settings read once at startup and passed down explicitly.
#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: Url,
    /// Byte ceiling used by size-capped mode.
    pub size_limit_bytes: u64,
    /// The transcoding engine to invoke.
    pub ffmpeg: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_key = lookup(API_KEY).context(MissingVariableSnafu { name: API_KEY })?;
        let raw_url = lookup(BASE_URL).context(MissingVariableSnafu { name: BASE_URL })?;
        let base_url = Url::parse(raw_url.trim()).context(InvalidBaseUrlSnafu { url: raw_url.as_str() })?;
        ensure!(!base_url.cannot_be_a_base(), NotABaseUrlSnafu { url: raw_url.as_str() });

        let size_limit_bytes = match lookup(SIZE_LIMIT) {
            Some(value) => parse_size_limit(value.trim())?,
            None => DEFAULT_SIZE_LIMIT,
        };

        let ffmpeg = lookup(FFMPEG).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(FFMPEG_EXE));

        Ok(Config {
            api_key,
            base_url,
            size_limit_bytes,
            ffmpeg,
        })
    }

    /// The header the media server expects on every streaming request.
    pub fn authorization_header(&self) -> String {
        format!("Authorization: MediaBrowser Token=\"{}\"", self.api_key)
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .field("size_limit_bytes", &self.size_limit_bytes)
            .field("ffmpeg", &self.ffmpeg)
            .finish()
    }
}

/// Parses a byte ceiling for size-capped mode, with optional `k`/`M` suffix.
pub fn parse_size_limit(value: &str) -> Result<u64, Error> {
    let limit = bitrate::parse_scaled(value).context(InvalidSizeLimitSnafu)?;
    ensure!(limit > 0, ZeroSizeLimitSnafu);

    Ok(limit)
}

/// Loads variables from `path`, or from `.env` in the working directory if it exists.
///
/// Variables already present in the process environment win.
pub fn load_env_file(path: Option<&Path>) -> Result<(), Error> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).context(EnvFileSnafu { path })?;
            tracing::debug!(path = %path.display(), "loaded environment file");
        }
        None => {
            if let Ok(path) = dotenvy::dotenv() {
                tracing::debug!(path = %path.display(), "loaded environment file");
            }
        }
    }

    Ok(())
}

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Could not load environment file {}: {}", path.display(), source))]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[snafu(display("{} is not set. Put it in the environment or in a .env file", name))]
    MissingVariable {
        name: &'static str,
    },
    #[snafu(display("Invalid {} '{}': {}", BASE_URL, url, source))]
    InvalidBaseUrl {
        url: String,
        source: url::ParseError,
    },
    #[snafu(display("Invalid {} '{}': not a base URL", BASE_URL, url))]
    NotABaseUrl {
        url: String,
    },
    #[snafu(display("Invalid size limit: {}", source))]
    InvalidSizeLimit {
        source: bitrate::Error,
    },
    #[snafu(display("The size limit must be greater than zero"))]
    ZeroSizeLimit,
}
