//! Configuration for the QRsona server.
//!
//! Every setting comes from an environment variable with a built-in default,
//! except `JWT_SECRET`, which must be provided. Storage selection:
//! 1. Cloudinary when `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY` and
//!    `CLOUDINARY_API_SECRET` are all set
//! 2. local disk under `QRSONA_UPLOAD_DIR` otherwise
//!
//! The bind address is `QRSONA_BIND_ADDR`, else `0.0.0.0:$PORT`, else
//! `0.0.0.0:8080`. Command-line flags in `main.rs` override both.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATABASE_PATH: &str = "./data/qrsona.db";
const DEFAULT_UPLOAD_DIR: &str = "./uploads";
const DEFAULT_ICON_PATH: &str = "./assets/default-icon.png";
const DEFAULT_PUBLIC_URL: &str = "http://localhost:8080";
const DEFAULT_ALLOWED_ORIGINS: &[&str] = &["http://localhost:3000", "https://qrsona.vercel.app"];
const DEFAULT_TOKEN_TTL_HOURS: u64 = 24;
const MAX_TOKEN_TTL_HOURS: u64 = 24 * 366 * 100;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 5;
const DEFAULT_CASCADE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub allowed_origins: Vec<String>,
    pub upload_dir: PathBuf,
    pub default_icon_path: PathBuf,
    pub public_url: String,
    pub db_timeout: Duration,
    pub cascade_timeout: Duration,
    pub max_image_bytes: usize,
    pub log_dir: Option<PathBuf>,
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = match var("QRSONA_BIND_ADDR") {
            Some(addr) => parse("QRSONA_BIND_ADDR", addr)?,
            None => {
                let port = match var("PORT") {
                    Some(port) => parse::<u16>("PORT", port)?,
                    None => DEFAULT_PORT,
                };
                SocketAddr::from(([0, 0, 0, 0], port))
            }
        };

        let jwt_secret = var("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let ttl_hours = parse_or(
            "QRSONA_TOKEN_TTL_HOURS",
            var("QRSONA_TOKEN_TTL_HOURS"),
            DEFAULT_TOKEN_TTL_HOURS,
        )?;
        if ttl_hours > MAX_TOKEN_TTL_HOURS {
            return Err(ConfigError::Invalid {
                name: "QRSONA_TOKEN_TTL_HOURS",
                value: ttl_hours.to_string(),
            });
        }

        let allowed_origins = match var("QRSONA_ALLOWED_ORIGINS") {
            Some(list) => list
                .split(',')
                .map(|o| o.trim().trim_end_matches('/').to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            None => DEFAULT_ALLOWED_ORIGINS
                .iter()
                .map(|o| o.to_string())
                .collect(),
        };

        let cloudinary = match (
            var("CLOUDINARY_CLOUD_NAME"),
            var("CLOUDINARY_API_KEY"),
            var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            _ => None,
        };

        Ok(Self {
            bind_addr,
            database_path: var("QRSONA_DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string())
                .into(),
            jwt_secret,
            token_ttl: Duration::from_secs(ttl_hours * 3600),
            allowed_origins,
            upload_dir: var("QRSONA_UPLOAD_DIR")
                .unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string())
                .into(),
            default_icon_path: var("QRSONA_DEFAULT_ICON")
                .unwrap_or_else(|| DEFAULT_ICON_PATH.to_string())
                .into(),
            public_url: var("QRSONA_PUBLIC_URL")
                .unwrap_or_else(|| DEFAULT_PUBLIC_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            db_timeout: Duration::from_secs(parse_or(
                "QRSONA_DB_TIMEOUT_SECS",
                var("QRSONA_DB_TIMEOUT_SECS"),
                DEFAULT_DB_TIMEOUT_SECS,
            )?),
            cascade_timeout: Duration::from_secs(parse_or(
                "QRSONA_CASCADE_TIMEOUT_SECS",
                var("QRSONA_CASCADE_TIMEOUT_SECS"),
                DEFAULT_CASCADE_TIMEOUT_SECS,
            )?),
            max_image_bytes: parse_or(
                "QRSONA_MAX_IMAGE_BYTES",
                var("QRSONA_MAX_IMAGE_BYTES"),
                DEFAULT_MAX_IMAGE_BYTES,
            )?,
            log_dir: var("QRSONA_LOG_DIR").map(PathBuf::from),
            cloudinary,
        })
    }
}

fn parse<T: FromStr>(name: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid { name, value })
}

fn parse_or<T: FromStr>(
    name: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(value) => parse(name, value),
        None => Ok(default),
    }
}
