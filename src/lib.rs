pub mod config;
pub mod crypto;
pub mod db;
pub mod models;
pub mod orders;
pub mod pricing;
pub mod report;
pub mod user_error;

#[cfg(test)]
pub(crate) mod test_support;

use rusqlite::Connection;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use config::{ConfigError, LabConfig};
use report::{FsDocumentStore, ReportOrchestrator, ReportSettings};

#[derive(Error, Debug)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] db::DatabaseError),

    #[error("Artifact storage unavailable: {0}")]
    Storage(#[from] std::io::Error),
}

/// Install the global fmt subscriber. `RUST_LOG` wins over the default
/// filter; a second call is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}

/// An opened laboratory: database connection plus report pipeline.
pub struct Lab {
    pub config: LabConfig,
    pub conn: Connection,
    pub reports: ReportOrchestrator<FsDocumentStore>,
}

impl Lab {
    pub fn open(config: LabConfig) -> Result<Self, StartupError> {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

        std::fs::create_dir_all(&config.data_dir)?;
        let conn = db::open_database(config.db_path())?;

        // Staging files left by an interrupted write
        crypto::cleanup_orphaned_staging(config.artifact_dir());
        let store = FsDocumentStore::new(config.artifact_dir())?;
        let reports = ReportOrchestrator::new(store, ReportSettings::from(&config));

        Ok(Self {
            config,
            conn,
            reports,
        })
    }

    /// Open with configuration from `LABDESK_*` environment variables.
    pub fn from_env() -> Result<Self, StartupError> {
        Self::open(LabConfig::from_env()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_database_and_cleans_staging() {
        let dir = tempfile::tempdir().unwrap();
        let config = LabConfig::with_data_dir(dir.path().join("lab"));
        std::fs::create_dir_all(config.artifact_dir()).unwrap();
        let leftover = config.artifact_dir().join("GEN-20260301-0001-20260302T101500000Z.pdf.enc.part");
        std::fs::write(&leftover, b"half written").unwrap();

        let lab = Lab::open(config).unwrap();

        assert!(lab.config.db_path().exists());
        assert!(!leftover.exists());
        assert!(db::count_tables(&lab.conn).unwrap() > 0);
    }

    #[test]
    fn init_tracing_twice_is_harmless() {
        init_tracing();
        init_tracing();
    }
}
