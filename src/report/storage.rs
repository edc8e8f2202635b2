//! Artifact file storage.
//!
//! File names are `<order code>-<UTC timestamp>[-<variant>].<ext>`. A name
//! is claimed with a hard link from a staging file, which fails instead of
//! overwriting, so two writers can never clobber each other; on collision
//! a numeric suffix is tried.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::crypto::secure_delete::{secure_delete_file, STAGING_SUFFIX};

const MAX_NAME_ATTEMPTS: u32 = 16;

/// What a stored file holds; decides suffix and extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredKind {
    /// Encrypted report container.
    Report,
    /// Signed envelope around the encrypted report.
    Signed,
    /// Document uploaded from outside the lab.
    External,
}

impl StoredKind {
    fn suffix(&self) -> &'static str {
        match self {
            Self::Report => "",
            Self::Signed => "-signed",
            Self::External => "-external",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            Self::Report => "pdf.enc",
            Self::Signed => "json",
            Self::External => "bin",
        }
    }
}

/// Storage for artifact files. Keys are opaque names returned by `put`.
pub trait DocumentStore: Send + Sync {
    fn put(
        &self,
        order_code: &str,
        at: &DateTime<Utc>,
        kind: StoredKind,
        bytes: &[u8],
    ) -> io::Result<String>;

    fn get(&self, key: &str) -> io::Result<Vec<u8>>;

    /// Remove a stored file. Missing files are not an error.
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Flat directory of artifact files.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys are bare file names; anything that could leave the root is refused.
    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.contains(|c: char| c == '/' || c == '\\')
            && key != "."
            && key != ".."
            && !key.ends_with(STAGING_SUFFIX);
        if !valid {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "invalid document key"));
        }
        Ok(self.root.join(key))
    }
}

pub(crate) fn artifact_name(order_code: &str, at: &DateTime<Utc>, kind: StoredKind, attempt: u32) -> String {
    let stamp = at.format("%Y%m%dT%H%M%S%3fZ");
    let retry = if attempt == 0 {
        String::new()
    } else {
        format!("-{attempt}")
    };
    format!(
        "{order_code}-{stamp}{}{retry}.{}",
        kind.suffix(),
        kind.extension()
    )
}

impl DocumentStore for FsDocumentStore {
    fn put(
        &self,
        order_code: &str,
        at: &DateTime<Utc>,
        kind: StoredKind,
        bytes: &[u8],
    ) -> io::Result<String> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = artifact_name(order_code, at, kind, attempt);
            let target = self.resolve(&name)?;
            let staging = self.root.join(format!("{name}{STAGING_SUFFIX}"));

            let mut file = match fs::OpenOptions::new().write(true).create_new(true).open(&staging) {
                Ok(f) => f,
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            };
            let written = file.write_all(bytes).and_then(|()| file.sync_all());
            drop(file);
            if let Err(e) = written {
                let _ = fs::remove_file(&staging);
                return Err(e);
            }

            let claimed = fs::hard_link(&staging, &target);
            fs::remove_file(&staging)?;
            match claimed {
                Ok(()) => {
                    tracing::debug!(order_code = %order_code, attempt, "Document stored");
                    return Ok(name);
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e),
            }
        }
        Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "no free artifact name after retries",
        ))
    }

    fn get(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(key)?)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        secure_delete_file(&self.resolve(key)?)
    }
}
