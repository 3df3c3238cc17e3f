//! Persisted metadata cache format.
//!
//! ```text
//! ┌──────────────────────────────────────┐
//! │ HEADER (64 bytes, fixed)             │
//! │  magic: [u8; 8] = b"EMLDIGST"        │
//! │  version: u32                        │
//! │  flags: u32                          │
//! │  message_count: u64                  │
//! │  (padding to 64 bytes)               │
//! ├──────────────────────────────────────┤
//! │ PAYLOAD (variable)                   │
//! │  bincode-serialized CachePayload     │
//! └──────────────────────────────────────┘
//! ```
//!
//! The cache lives next to the archive as `.emldigest.cache`; when that
//! location is not writable it falls back to the user cache directory,
//! keyed by a SHA-256 hash of the archive path.

use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::DigestError;
use crate::model::metadata::Metadata;

/// Magic bytes identifying an emldigest cache file.
pub const MAGIC: &[u8; 8] = b"EMLDIGST";

/// Current cache format version.
pub const VERSION: u32 = 1;

/// Fixed header size in bytes.
pub const HEADER_SIZE: usize = 64;

/// Serializable cache header.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct CacheHeader {
    magic: [u8; 8],
    version: u32,
    flags: u32,
    message_count: u64,
}

impl CacheHeader {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.magic != *MAGIC {
            return Err("Invalid magic bytes".into());
        }
        if self.version != VERSION {
            return Err(format!(
                "Incompatible version: expected {VERSION}, found {}",
                self.version
            ));
        }
        Ok(())
    }
}

/// Everything the store persists between runs.
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct CachePayload {
    /// Computed metadata, keyed by message id.
    pub metadata: HashMap<String, Metadata>,
    /// Per-message encoding overrides (only non-default encodings).
    pub encodings: HashMap<String, String>,
}

/// Attempt to load the cache for an archive. Returns `None` when the cache
/// is missing, corrupt, or written by an incompatible version — callers
/// rebuild from scratch in all three cases.
pub fn load(archive: &Path) -> anyhow::Result<Option<CachePayload>> {
    let primary = cache_path_for(archive);
    if primary.exists() {
        return load_from_file(&primary);
    }
    let fallback = fallback_cache_path_for(archive);
    if fallback.exists() {
        return load_from_file(&fallback);
    }
    Ok(None)
}

fn load_from_file(path: &Path) -> anyhow::Result<Option<CachePayload>> {
    let data = std::fs::read(path).map_err(|e| DigestError::io(path, e))?;

    if data.len() < HEADER_SIZE {
        debug!(path = %path.display(), "Cache file too small");
        return Ok(None);
    }

    let header: CacheHeader =
        bincode::deserialize(&data[..HEADER_SIZE]).map_err(|e| DigestError::InvalidCache {
            path: path.to_path_buf(),
            reason: format!("Header deserialization failed: {e}"),
        })?;

    if let Err(reason) = header.validate() {
        debug!(path = %path.display(), reason = %reason, "Cache header invalid");
        return Ok(None);
    }

    let payload: CachePayload =
        bincode::deserialize(&data[HEADER_SIZE..]).map_err(|e| DigestError::InvalidCache {
            path: path.to_path_buf(),
            reason: format!("Payload deserialization failed: {e}"),
        })?;

    if payload.metadata.len() as u64 != header.message_count {
        debug!(path = %path.display(), "Cache message count mismatch");
        return Ok(None);
    }

    debug!(
        path = %path.display(),
        count = payload.metadata.len(),
        "Loaded metadata cache"
    );
    Ok(Some(payload))
}

/// Write the cache, preferring the location next to the archive and
/// falling back to the user cache directory.
pub fn save(archive: &Path, payload: &CachePayload) -> anyhow::Result<()> {
    let header = CacheHeader {
        magic: *MAGIC,
        version: VERSION,
        flags: 0,
        message_count: payload.metadata.len() as u64,
    };

    let header_bytes = bincode::serialize(&header)?;
    let payload_bytes = bincode::serialize(payload)?;

    // Pad header to HEADER_SIZE
    let mut padded_header = vec![0u8; HEADER_SIZE];
    let copy_len = header_bytes.len().min(HEADER_SIZE);
    padded_header[..copy_len].copy_from_slice(&header_bytes[..copy_len]);

    let primary = cache_path_for(archive);
    match write_cache_file(&primary, &padded_header, &payload_bytes) {
        Ok(()) => {
            info!(path = %primary.display(), "Metadata cache written");
            return Ok(());
        }
        Err(e) => {
            debug!(error = %e, "Cannot write cache next to archive, trying cache dir");
        }
    }

    let fallback = fallback_cache_path_for(archive);
    if let Some(parent) = fallback.parent() {
        std::fs::create_dir_all(parent)?;
    }
    write_cache_file(&fallback, &padded_header, &payload_bytes)?;
    info!(path = %fallback.display(), "Metadata cache written to cache dir");
    Ok(())
}

/// Delete any existing cache for an archive (explicit invalidation).
pub fn invalidate(archive: &Path) {
    for path in [cache_path_for(archive), fallback_cache_path_for(archive)] {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                debug!(path = %path.display(), error = %e, "Could not remove cache file");
            }
        }
    }
}

fn write_cache_file(path: &Path, header: &[u8], payload: &[u8]) -> anyhow::Result<()> {
    let mut file = File::create(path).map_err(|e| DigestError::io(path, e))?;
    file.write_all(header).map_err(|e| DigestError::io(path, e))?;
    file.write_all(payload)
        .map_err(|e| DigestError::io(path, e))?;
    file.flush().map_err(|e| DigestError::io(path, e))?;
    Ok(())
}

/// Primary cache path: hidden file inside the archive directory.
pub fn cache_path_for(archive: &Path) -> PathBuf {
    archive.join(".emldigest.cache")
}

/// Fallback cache path inside the user cache directory.
///
/// Example: `~/.cache/emldigest/<sha256_of_path>.cache`
pub fn fallback_cache_path_for(archive: &Path) -> PathBuf {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("emldigest");

    let mut hasher = Sha256::new();
    hasher.update(archive.to_string_lossy().as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    cache_dir.join(format!("{hash}.cache"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::address::EmailAddress;
    use chrono::{TimeZone, Utc};

    fn payload_with_one_message() -> CachePayload {
        let mut payload = CachePayload::default();
        payload.metadata.insert(
            "a.eml".to_string(),
            Metadata {
                id: "a.eml".to_string(),
                sender: EmailAddress::parse("alice@x.com"),
                recipients: vec![],
                subject: "Hi".to_string(),
                date: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
                references: vec![],
                preview: String::new(),
                sentences: vec![],
            },
        );
        payload
            .encodings
            .insert("a.eml".to_string(), "windows-1252".to_string());
        payload
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let payload = payload_with_one_message();

        save(dir.path(), &payload).unwrap();
        let loaded = load(dir.path()).unwrap().expect("cache present");

        assert_eq!(loaded.metadata.len(), 1);
        assert_eq!(loaded.metadata["a.eml"].subject, "Hi");
        assert_eq!(loaded.encodings["a.eml"], "windows-1252");
    }

    #[test]
    fn test_load_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_load_rejects_bad_magic() {
        let dir = tempfile::tempdir().unwrap();
        let path = cache_path_for(dir.path());
        std::fs::write(&path, vec![0u8; HEADER_SIZE + 10]).unwrap();
        // Zeroed magic bytes fail validation; caller rebuilds
        assert!(load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalidate_removes_cache() {
        let dir = tempfile::tempdir().unwrap();
        save(dir.path(), &payload_with_one_message()).unwrap();
        assert!(cache_path_for(dir.path()).exists());

        invalidate(dir.path());
        assert!(!cache_path_for(dir.path()).exists());
        assert!(load(dir.path()).unwrap().is_none());
    }
}
