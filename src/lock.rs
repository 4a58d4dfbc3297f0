//! Per-name lock file guarding concurrent crawls of the same name
//! (spec.md §6.2), grounded on the original `file_lock` context manager.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Result};

pub struct CrawlLock {
    path: PathBuf,
}

impl CrawlLock {
    /// Acquires `<tmpdir>/<name>.lock`, failing if it already exists.
    pub fn acquire(name: &str) -> Result<Self> {
        let path = std::env::temp_dir().join(format!("{name}.lock"));
        if path.exists() {
            bail!(
                "lock file {} exists: another crawl named {name} is already in flight",
                path.display()
            );
        }
        fs::write(&path, std::process::id().to_string())?;
        Ok(CrawlLock { path })
    }
}

impl Drop for CrawlLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_of_same_name_fails() {
        let name = "sitecrawler-lock-test-unique-name";
        let _guard = CrawlLock::acquire(name).unwrap();
        assert!(CrawlLock::acquire(name).is_err());
    }

    #[test]
    fn lock_file_removed_on_drop() {
        let name = "sitecrawler-lock-test-drop";
        let path = std::env::temp_dir().join(format!("{name}.lock"));
        {
            let _guard = CrawlLock::acquire(name).unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }
}
