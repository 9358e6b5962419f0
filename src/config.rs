use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

/// Default JPEG quality for cropped images (matches the browser canvas default)
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

/// Runtime configuration, loaded from the environment
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: PathBuf,
    pub limits: ImageLimits,
}

/// Bounds on in-memory image handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLimits {
    /// Largest accepted source file or upload, in bytes
    pub max_upload_bytes: u64,
    /// Largest accepted bitmap width or height, in pixels
    pub max_dimension: u32,
    /// JPEG quality for cropped output (1-100)
    pub jpeg_quality: u8,
}

impl Default for ImageLimits {
    fn default() -> Self {
        Self {
            max_upload_bytes: 10 * 1024 * 1024,
            max_dimension: 8192,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let defaults = ImageLimits::default();

        let jpeg_quality: u8 = try_load("PORTFOLIO_JPEG_QUALITY", defaults.jpeg_quality)?;
        if !(1..=100).contains(&jpeg_quality) {
            return Err(ConfigError {
                key: "PORTFOLIO_JPEG_QUALITY",
                message: format!("{jpeg_quality} is not within 1..=100"),
            });
        }

        Ok(Self {
            port: try_load("PORTFOLIO_PORT", 3000)?,
            database_path: match var("PORTFOLIO_DB") {
                Some(path) => PathBuf::from(path),
                None => default_database_path(),
            },
            limits: ImageLimits {
                max_upload_bytes: try_load("PORTFOLIO_MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
                max_dimension: try_load("PORTFOLIO_MAX_IMAGE_DIMENSION", defaults.max_dimension)?,
                jpeg_quality,
            },
        })
    }

    /// Request body cap for the HTTP layer.
    ///
    /// Base64 inflates payloads by 4/3; the remaining slack covers the
    /// other JSON fields.
    pub fn body_limit(&self) -> usize {
        let encoded = self.limits.max_upload_bytes.saturating_mul(4) / 3;
        usize::try_from(encoded)
            .unwrap_or(usize::MAX)
            .saturating_add(64 * 1024)
    }
}

/// Get the path where the database should be stored
///
/// - Linux: ~/.local/share/portfolio-admin/portfolio.db
/// - macOS: ~/Library/Application Support/portfolio-admin/portfolio.db
/// - Windows: %APPDATA%\portfolio-admin\portfolio.db
fn default_database_path() -> PathBuf {
    let mut path = dirs::data_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."));

    path.push("portfolio-admin");
    path.push("portfolio.db");
    path
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match var(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError {
                key,
                message: e.to_string(),
            }
        }),
        None => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}
