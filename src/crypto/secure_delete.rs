// Secure file deletion and cleanup of half-written artifact files.
// Overwrites file content with random bytes before removing the filesystem entry.

use std::fs;
use std::io::Write;
use std::path::Path;

use aes_gcm::aead::rand_core::{OsRng, RngCore};

/// Suffix of artifact files still being written.
pub const STAGING_SUFFIX: &str = ".part";

/// Securely delete a file: overwrite with random bytes, sync to disk, then remove.
///
/// Returns Ok even if the file doesn't exist (idempotent).
pub fn secure_delete_file(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        return Ok(());
    }

    let file_size = fs::metadata(path)?.len() as usize;

    if file_size > 0 {
        let mut random_buf = vec![0u8; file_size.min(64 * 1024)]; // Cap at 64KB chunks
        let mut file = fs::OpenOptions::new().write(true).open(path)?;

        let mut remaining = file_size;
        while remaining > 0 {
            let chunk_size = remaining.min(random_buf.len());
            OsRng.fill_bytes(&mut random_buf[..chunk_size]);
            if let Err(e) = file.write_all(&random_buf[..chunk_size]) {
                tracing::warn!("Secure overwrite failed: {e}");
                break;
            }
            remaining -= chunk_size;
        }

        if let Err(e) = file.sync_all() {
            tracing::warn!("Sync after overwrite failed: {e}");
        }
    }

    fs::remove_file(path)
}

/// Remove staging files left in the artifact directory by an interrupted
/// write. Returns the number of files removed.
pub fn cleanup_orphaned_staging(artifact_dir: &Path) -> usize {
    let entries = match fs::read_dir(artifact_dir) {
        Ok(e) => e,
        Err(_) => return 0, // Directory may not exist yet
    };

    let mut count = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_staging = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(STAGING_SUFFIX));
        if !path.is_file() || !is_staging {
            continue;
        }
        match secure_delete_file(&path) {
            Ok(()) => count += 1,
            Err(e) => tracing::warn!("Failed to clean staging file: {e}"),
        }
    }

    if count > 0 {
        tracing::info!(files_cleaned = count, "Cleaned orphaned staging files");
    }
    count
}
