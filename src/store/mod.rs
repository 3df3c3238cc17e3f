//! The `.eml` archive store.
//!
//! A store is a directory of `.eml` files. It owns the two caching layers
//! around raw messages: an in-process LRU of parsed views and the
//! persisted metadata cache. Once a message's metadata is cached it is
//! never recomputed, even across runs, until the cache is explicitly
//! invalidated.

pub mod cache;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use lru::LruCache;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{DigestError, Result};
use crate::extract;
use crate::model::metadata::Metadata;
use crate::normalize::Normalizer;
use crate::parser::eml::{parse_eml, ParsedEml};

/// Random-access store over a directory of `.eml` messages.
#[derive(Debug)]
pub struct Store {
    root: PathBuf,
    /// Ordered charset candidates for the fallback reader.
    encodings: Vec<String>,
    /// Per-message encoding overrides (only non-default encodings).
    encoding_overrides: HashMap<String, String>,
    metadata: HashMap<String, Metadata>,
    parsed: LruCache<String, ParsedEml>,
    normalizer: Normalizer,
}

impl Store {
    /// Open an archive directory, loading the persisted metadata cache
    /// unless `force_rebuild` is set (which deletes it).
    pub fn open(root: impl AsRef<Path>, config: &Config, force_rebuild: bool) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(DigestError::StoreNotFound(root));
        }

        let payload = if force_rebuild {
            cache::invalidate(&root);
            cache::CachePayload::default()
        } else {
            match cache::load(&root) {
                Ok(Some(p)) => p,
                Ok(None) => cache::CachePayload::default(),
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable metadata cache");
                    cache::CachePayload::default()
                }
            }
        };

        let cache_size = NonZeroUsize::new(config.store.parsed_cache_size.max(1))
            .expect("cache size clamped to at least 1");

        Ok(Self {
            root,
            encodings: config.store.encodings.clone(),
            encoding_overrides: payload.encodings,
            metadata: payload.metadata,
            parsed: LruCache::new(cache_size),
            normalizer: Normalizer::new(&config.classify.stopword_languages),
        })
    }

    /// List all message ids (`.eml` filenames) in the archive.
    ///
    /// Sorted for stable iteration; grouping results do not depend on
    /// the order.
    pub fn message_ids(&self) -> Result<Vec<String>> {
        let entries = std::fs::read_dir(&self.root).map_err(|e| DigestError::io(&self.root, e))?;

        let mut ids: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| DigestError::io(&self.root, e))?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".eml") {
                ids.push(name);
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Read a message's decoded text via the encoding fallback chain.
    ///
    /// The per-message cached encoding is tried first, then the configured
    /// candidates in order; the first strict (lossless) decode wins.
    /// Exhausting every candidate is a fatal decode error for the message.
    pub fn read_message(&mut self, id: &str) -> Result<String> {
        let path = self.root.join(id);
        let bytes = std::fs::read(&path).map_err(|e| DigestError::io(&path, e))?;

        let candidates: Vec<String> = match self.encoding_overrides.get(id) {
            Some(enc) => vec![enc.clone()],
            None => self.encodings.clone(),
        };

        for label in &candidates {
            let Some(encoding) = encoding_rs::Encoding::for_label(label.as_bytes()) else {
                warn!(encoding = %label, "Unknown encoding label in configuration");
                continue;
            };
            if let Some(decoded) =
                encoding.decode_without_bom_handling_and_without_replacement(&bytes)
            {
                self.remember_encoding(id, label);
                return Ok(decoded.into_owned());
            }
        }

        Err(DigestError::DecodeFailed {
            path,
            tried: candidates,
        })
    }

    /// Record which encoding decoded a message, mirroring the archive
    /// convention: only non-default encodings are remembered, and a
    /// message that decodes with the default again drops its override.
    fn remember_encoding(&mut self, id: &str, label: &str) {
        let is_default = self.encodings.first().map(String::as_str) == Some(label);
        if is_default {
            self.encoding_overrides.remove(id);
        } else {
            self.encoding_overrides
                .insert(id.to_string(), label.to_string());
        }
    }

    /// Parsed view of a message, cached in the in-process LRU.
    pub fn parsed(&mut self, id: &str) -> Result<&ParsedEml> {
        if !self.parsed.contains(id) {
            let content = self.read_message(id)?;
            let view = parse_eml(&content);
            self.parsed.put(id.to_string(), view);
        }
        // Safe: we just inserted if missing
        Ok(self.parsed.get(id).expect("just inserted"))
    }

    /// The message's metadata, computed on first access and cached
    /// indefinitely (persisted via [`Store::save`]).
    pub fn metadata(&mut self, id: &str) -> Result<&Metadata> {
        if !self.metadata.contains_key(id) {
            let view = self.parsed(id)?.clone();
            let meta = extract::extract(id, &view, &self.normalizer)?;
            debug!(id = %id, "Extracted metadata");
            self.metadata.insert(id.to_string(), meta);
        }
        Ok(self.metadata.get(id).expect("just inserted"))
    }

    /// Whether metadata for a message is already cached.
    pub fn has_metadata(&self, id: &str) -> bool {
        self.metadata.contains_key(id)
    }

    /// Extract metadata for every message in the archive.
    ///
    /// Per-message failures (undecodable body, missing date) are logged
    /// and skipped; the rest of the corpus is still processed. Returns
    /// the successfully extracted records. The `progress` callback
    /// receives `(processed, total)`.
    pub fn extract_all(&mut self, progress: Option<&dyn Fn(u64, u64)>) -> Result<Vec<Metadata>> {
        let ids = self.message_ids()?;
        let total = ids.len() as u64;
        let mut out: Vec<Metadata> = Vec::with_capacity(ids.len());

        for (i, id) in ids.iter().enumerate() {
            match self.metadata(id) {
                Ok(meta) => out.push(meta.clone()),
                Err(e) => {
                    warn!(id = %id, error = %e, "Skipping message");
                }
            }
            if let Some(cb) = progress {
                cb(i as u64 + 1, total);
            }
        }

        Ok(out)
    }

    /// Persist the metadata cache and encoding overrides.
    pub fn save(&self) -> anyhow::Result<()> {
        let payload = cache::CachePayload {
            metadata: self.metadata.clone(),
            encodings: self.encoding_overrides.clone(),
        };
        cache::save(&self.root, &payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_eml(dir: &Path, name: &str, body: &[u8]) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    fn simple_eml(from: &str, to: &str, subject: &str, msgid: &str, body: &str) -> String {
        format!(
            "From: {from}\r\nTo: {to}\r\nSubject: {subject}\r\n\
             Date: Mon, 01 Jan 2024 10:00:00 +0000\r\nMessage-ID: <{msgid}>\r\n\
             Content-Type: text/plain\r\n\r\n{body}\r\n"
        )
    }

    #[test]
    fn test_open_missing_dir() {
        let err = Store::open("/no/such/dir", &Config::default(), false).unwrap_err();
        assert!(matches!(err, DigestError::StoreNotFound(_)));
    }

    #[test]
    fn test_message_ids_filters_eml() {
        let dir = tempfile::tempdir().unwrap();
        write_eml(dir.path(), "a.eml", b"x");
        write_eml(dir.path(), "b.eml", b"y");
        write_eml(dir.path(), "notes.txt", b"z");

        let store = Store::open(dir.path(), &Config::default(), false).unwrap();
        assert_eq!(store.message_ids().unwrap(), vec!["a.eml", "b.eml"]);
    }

    #[test]
    fn test_read_message_encoding_fallback() {
        let dir = tempfile::tempdir().unwrap();
        // "café" in windows-1252: é = 0xE9, invalid as UTF-8
        write_eml(dir.path(), "latin.eml", b"Subject: caf\xe9\r\n\r\ncaf\xe9\r\n");

        let mut store = Store::open(dir.path(), &Config::default(), false).unwrap();
        let content = store.read_message("latin.eml").unwrap();
        assert!(content.contains("café"));
        // Non-default encoding is remembered
        assert_eq!(
            store.encoding_overrides.get("latin.eml").map(String::as_str),
            Some("windows-1252")
        );
    }

    #[test]
    fn test_read_message_utf8_no_override() {
        let dir = tempfile::tempdir().unwrap();
        write_eml(dir.path(), "plain.eml", "Subject: café\r\n\r\ncafé\r\n".as_bytes());

        let mut store = Store::open(dir.path(), &Config::default(), false).unwrap();
        store.read_message("plain.eml").unwrap();
        assert!(store.encoding_overrides.is_empty());
    }

    #[test]
    fn test_read_message_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        write_eml(dir.path(), "bad.eml", b"\xff\xfe\x00broken");

        let mut cfg = Config::default();
        cfg.store.encodings = vec!["utf-8".to_string()];
        let mut store = Store::open(dir.path(), &cfg, false).unwrap();
        let err = store.read_message("bad.eml").unwrap_err();
        assert!(matches!(err, DigestError::DecodeFailed { .. }));
    }

    #[test]
    fn test_metadata_cached_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        write_eml(
            dir.path(),
            "a.eml",
            simple_eml("alice@x.com", "bob@y.com", "Hi", "a@x.com", "hello there").as_bytes(),
        );

        let mut store = Store::open(dir.path(), &Config::default(), false).unwrap();
        store.metadata("a.eml").unwrap();
        store.save().unwrap();

        // Delete the raw message: a reopened store must still serve the
        // cached metadata without touching the file.
        std::fs::remove_file(dir.path().join("a.eml")).unwrap();
        let mut reopened = Store::open(dir.path(), &Config::default(), false).unwrap();
        assert!(reopened.has_metadata("a.eml"));
        let meta = reopened.metadata("a.eml").unwrap();
        assert_eq!(meta.subject, "Hi");
    }

    #[test]
    fn test_force_rebuild_invalidates_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_eml(
            dir.path(),
            "a.eml",
            simple_eml("alice@x.com", "bob@y.com", "Hi", "a@x.com", "hello").as_bytes(),
        );

        let mut store = Store::open(dir.path(), &Config::default(), false).unwrap();
        store.metadata("a.eml").unwrap();
        store.save().unwrap();

        let rebuilt = Store::open(dir.path(), &Config::default(), true).unwrap();
        assert!(!rebuilt.has_metadata("a.eml"));
    }

    #[test]
    fn test_extract_all_skips_broken_messages() {
        let dir = tempfile::tempdir().unwrap();
        write_eml(
            dir.path(),
            "good.eml",
            simple_eml("alice@x.com", "bob@y.com", "Hi", "a@x.com", "hello").as_bytes(),
        );
        // No Date header: extraction must fail for this one only
        write_eml(dir.path(), "nodate.eml", b"From: x@y.com\r\nSubject: broken\r\n\r\nbody\r\n");

        let mut store = Store::open(dir.path(), &Config::default(), false).unwrap();
        let all = store.extract_all(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "good.eml");
    }
}
