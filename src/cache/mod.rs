//! Content-addressed reply cache
//!
//! Replies are stored one file per prompt under `~/.llm-checks-cache/`,
//! named by the SHA-256 hex digest of the exact prompt text. A changed
//! prompt, even a one-line shift in the numbered source, is a new key.
//!
//! # Error Handling
//!
//! Cache operations are best-effort. A read failure is reported as a miss
//! and a write failure leaves the reply unpersisted; both log a warning and
//! never reach the caller as errors.
//!
//! There is no cross-process locking: two runs over the same prompt may both
//! miss and both write the key. The content is identical, and writes land
//! through a rename, so readers never observe a partial entry.

use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const CACHE_DIR: &str = ".llm-checks-cache";
const ENTRY_EXTENSION: &str = "json";

/// SHA-256 hex digest of the prompt bytes
pub fn prompt_key(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Default cache root under the user's home directory
pub fn default_cache_root() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CACHE_DIR))
}

/// Cache statistics for reporting
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub writes: usize,
}

/// Reply cache rooted at a directory
#[derive(Debug, Clone)]
pub struct ResponseCache {
    root: PathBuf,
    stats: CacheStats,
}

impl ResponseCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            stats: CacheStats::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    /// Cached reply for `key`, or `None` on a miss or unreadable entry
    pub fn get(&mut self, key: &str) -> Option<String> {
        let path = self.entry_path(key);
        match fs::read_to_string(&path) {
            Ok(reply) => {
                self.stats.hits += 1;
                log::debug!("cache hit {}", key);
                Some(reply)
            }
            Err(err) => {
                self.stats.misses += 1;
                if err.kind() != ErrorKind::NotFound {
                    log::warn!("Failed to read cache entry {}: {}", path.display(), err);
                }
                None
            }
        }
    }

    /// Persist `reply` under `key`. Failures are logged, not returned.
    pub fn put(&mut self, key: &str, reply: &str) {
        match self.write_entry(key, reply) {
            Ok(()) => {
                self.stats.writes += 1;
                log::debug!("cache write {}", key);
            }
            Err(err) => {
                log::warn!("Failed to write cache entry {}: {}", key, err);
            }
        }
    }

    fn write_entry(&self, key: &str, reply: &str) -> std::io::Result<()> {
        fs::create_dir_all(&self.root)?;
        let path = self.entry_path(key);
        let tmp_path = self.root.join(format!(".{}.{}.tmp", key, Uuid::new_v4()));
        fs::write(&tmp_path, reply)?;
        if let Err(err) = fs::rename(&tmp_path, &path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_prompt_key_is_sha256_hex() {
        assert_eq!(
            prompt_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            prompt_key("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_one_character_changes_key() {
        let a = prompt_key("Code:\n1.class A {}\n");
        let b = prompt_key("Code:\n2.class A {}\n");
        assert_ne!(a, b);
        assert_eq!(a, prompt_key("Code:\n1.class A {}\n"));
    }

    #[test]
    fn test_put_then_get_returns_reply() {
        let dir = tempdir().unwrap();
        let mut cache = ResponseCache::new(dir.path().join("nested").join("cache"));
        let key = prompt_key("prompt");
        let reply = "[ERROR] Name 'x' (2.5.1) (3)\n";

        assert_eq!(cache.get(&key), None);
        cache.put(&key, reply);
        assert_eq!(cache.get(&key).as_deref(), Some(reply));
        assert!(cache.entry_path(&key).ends_with(format!("{}.json", key)));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                writes: 1
            }
        );
    }

    #[test]
    fn test_overwrite_with_same_content() {
        let dir = tempdir().unwrap();
        let mut cache = ResponseCache::new(dir.path());
        let key = prompt_key("p");
        cache.put(&key, "reply");
        cache.put(&key, "reply");
        assert_eq!(cache.get(&key).as_deref(), Some("reply"));
        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_unwritable_root_is_not_fatal() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let mut cache = ResponseCache::new(blocker.join("cache"));
        cache.put("k", "reply");
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.stats().writes, 0);
    }
}
