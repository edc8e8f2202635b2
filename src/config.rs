use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::crypto::{PassphraseScheme, DEFAULT_PBKDF2_ITERATIONS, MIN_PBKDF2_ITERATIONS};

/// Application-level constants
pub const APP_NAME: &str = "Labdesk";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_RETENTION_DAYS: u32 = 60;
const ENV_PREFIX: &str = "LABDESK_";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDirectory,

    #[error("Invalid {var}: {reason}")]
    Invalid { var: String, reason: String },
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        var: format!("{ENV_PREFIX}{var}"),
        reason: reason.into(),
    }
}

/// Laboratory configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct LabConfig {
    pub data_dir: PathBuf,
    pub db_path: PathBuf,
    pub artifact_dir: PathBuf,
    pub pbkdf2_iterations: u32,
    pub passphrase_scheme: PassphraseScheme,
    /// Days a signed report stays downloadable by the patient.
    pub retention_days: u32,
    /// Letterhead printed at the top of every report.
    pub lab_lines: Vec<String>,
}

/// ~/Labdesk/ on all platforms
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDirectory)?;
    Ok(home.join(APP_NAME))
}

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "labdesk_lib=info,warn"
}

impl LabConfig {
    /// Defaults rooted at `data_dir`.
    pub fn with_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            db_path: data_dir.join("labdesk.db"),
            artifact_dir: data_dir.join("artifacts"),
            data_dir,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            passphrase_scheme: PassphraseScheme::default(),
            retention_days: DEFAULT_RETENTION_DAYS,
            lab_lines: Vec::new(),
        }
    }

    /// Read `LABDESK_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LabConfig::from_env`] with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| {
            lookup(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_dir = match var("DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => app_data_dir()?,
        };
        let mut config = Self::with_data_dir(data_dir);

        if let Some(path) = var("DB_PATH") {
            config.db_path = PathBuf::from(path);
        }
        if let Some(dir) = var("ARTIFACT_DIR") {
            config.artifact_dir = PathBuf::from(dir);
        }
        if let Some(raw) = var("PBKDF2_ITERATIONS") {
            let iterations: u32 = raw
                .parse()
                .map_err(|_| invalid("PBKDF2_ITERATIONS", "not a positive integer"))?;
            if iterations < MIN_PBKDF2_ITERATIONS {
                return Err(invalid(
                    "PBKDF2_ITERATIONS",
                    format!("must be at least {MIN_PBKDF2_ITERATIONS}"),
                ));
            }
            config.pbkdf2_iterations = iterations;
        }
        if let Some(raw) = var("RETENTION_DAYS") {
            config.retention_days = raw
                .parse()
                .map_err(|_| invalid("RETENTION_DAYS", "not a non-negative integer"))?;
        }
        if let Some(raw) = var("LAB_HEADER") {
            config.lab_lines = raw
                .split('|')
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect();
        }
        config.passphrase_scheme = match var("PASSPHRASE_SCHEME").as_deref() {
            None | Some("fiscal_code") => PassphraseScheme::FiscalCode,
            Some("fiscal_code_with_pepper") => {
                let pepper = var("PASSPHRASE_PEPPER")
                    .ok_or_else(|| invalid("PASSPHRASE_PEPPER", "required by fiscal_code_with_pepper"))?;
                PassphraseScheme::FiscalCodeWithPepper { pepper }
            }
            Some(other) => return Err(invalid("PASSPHRASE_SCHEME", format!("unknown scheme '{other}'"))),
        };

        Ok(config)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }
}
