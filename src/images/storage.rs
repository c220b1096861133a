//! Content-addressed attachment blobs on the local filesystem.
//!
//! Blobs live under `{base_dir}/{hh}/{hash}` where `hash` is the first 32 hex
//! characters of the SHA-256 digest and `hh` its first two characters.
//! Identical uploads share one blob.
//!
//! A blob written by [`AttachmentStore::store`] is pinned until the returned
//! [`BlobPin`] drops, and [`AttachmentStore::purge`] never removes a pinned
//! blob. Callers hold the pin until the row referencing the blob is written.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context, Result};
use fairway_db::models::Attachment;
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

type Pins = Arc<Mutex<HashMap<String, usize>>>;

fn lock(pins: &Pins) -> MutexGuard<'_, HashMap<String, usize>> {
    pins.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Filesystem store for attachment blobs.
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    base_dir: PathBuf,
    pins: Pins,
}

/// Keeps a freshly stored blob from being purged.
#[derive(Debug)]
#[must_use = "the blob may be purged once the pin drops"]
pub struct BlobPin {
    key: String,
    pins: Pins,
}

impl Drop for BlobPin {
    fn drop(&mut self) {
        let mut pins = lock(&self.pins);
        if let Some(count) = pins.get_mut(&self.key) {
            *count -= 1;
            if *count == 0 {
                pins.remove(&self.key);
            }
        }
    }
}

impl AttachmentStore {
    /// Create a store rooted at `base_dir`. The directory is created lazily.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            pins: Pins::default(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Write `data` and describe it as an attachment.
    ///
    /// Writing the same bytes twice is a no-op on disk. The blob stays pinned
    /// until the returned [`BlobPin`] drops.
    pub fn store(
        &self,
        data: &[u8],
        content_type: &str,
        filename: &str,
    ) -> Result<(Attachment, BlobPin)> {
        let key = blob_key(data);
        let path = self.path(&key)?;

        {
            let mut pins = lock(&self.pins);
            if !path.exists() {
                write_blob(&path, data)?;
            }
            *pins.entry(key.clone()).or_insert(0) += 1;
        }

        let pin = BlobPin {
            key: key.clone(),
            pins: Arc::clone(&self.pins),
        };
        let attachment = Attachment {
            key,
            content_type: content_type.to_string(),
            byte_size: data.len() as i64,
            filename: filename.to_string(),
        };
        Ok((attachment, pin))
    }

    /// Remove a blob unless it is pinned or `in_use` reports a reference.
    ///
    /// Returns whether the blob was removed. `in_use` runs under the same lock
    /// as [`store`](Self::store), so a concurrent identical upload either pins
    /// the key first or rewrites the blob after the removal.
    pub fn purge(&self, key: &str, in_use: impl FnOnce() -> Result<bool>) -> Result<bool> {
        let pins = lock(&self.pins);
        if pins.contains_key(key) || in_use()? {
            return Ok(false);
        }
        self.delete(key)?;
        Ok(true)
    }

    /// Read a blob's bytes.
    pub fn read(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path(key)?;
        std::fs::read(&path).with_context(|| format!("Failed to read attachment: {}", path.display()))
    }

    /// Filesystem path for a key.
    ///
    /// Rejects keys that are not of the `{hh}/{hash}` shape this store writes,
    /// so a key can never escape `base_dir`.
    pub fn path(&self, key: &str) -> Result<PathBuf> {
        let (prefix, hash) = key
            .split_once('/')
            .with_context(|| format!("Malformed attachment key: {key}"))?;
        let well_formed = prefix.len() == 2
            && hash.starts_with(prefix)
            && hash.chars().all(|c| c.is_ascii_hexdigit());
        if !well_formed {
            anyhow::bail!("Malformed attachment key: {key}");
        }
        Ok(self.base_dir.join(prefix).join(hash))
    }

    /// Remove a blob. Missing blobs are not an error.
    pub fn delete(&self, key: &str) -> Result<()> {
        let path = self.path(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to delete attachment: {}", path.display())),
        }
    }
}

/// Write then rename so readers never see a partial blob.
fn write_blob(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("Attachment path has no parent: {}", path.display()))?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("Failed to create attachment directory: {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    tmp.write_all(data)
        .with_context(|| format!("Failed to write attachment: {}", path.display()))?;
    match tmp.persist(path) {
        Ok(_) => Ok(()),
        // Another writer of the same content got there first.
        Err(_) if path.exists() => Ok(()),
        Err(e) => Err(e.error)
            .with_context(|| format!("Failed to move attachment into place: {}", path.display())),
    }
}

fn compute_hash(data: &[u8]) -> String {
    let digest = Sha256::digest(data);
    hex::encode(&digest[..16])
}

fn blob_key(data: &[u8]) -> String {
    let hash = compute_hash(data);
    format!("{}/{}", &hash[..2], hash)
}
