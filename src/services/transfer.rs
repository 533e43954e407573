//! Feed transfer collaborator
//!
//! The pipeline only needs "given these bytes and a filename, process
//! them". [`FeedSource`] is the seam to the external transfer layer
//! (FTP/SFTP/IMAP clients live behind it, out of scope here); the shipped
//! implementation reads a per-provider inbox directory.

use std::path::PathBuf;
use std::time::SystemTime;

use async_trait::async_trait;

use crate::{
    error::{AppError, AppResult},
    models::Provider,
};

/// A file available for one provider
#[derive(Debug, Clone)]
pub struct FeedFile {
    pub name: String,
    pub modified: Option<SystemTime>,
    pub size: u64,
}

#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Files currently available for the provider, newest first,
    /// already filtered on the provider's file-name pattern
    async fn list(&self, provider: &Provider) -> AppResult<Vec<FeedFile>>;

    /// Raw bytes of one file
    async fn fetch(&self, provider: &Provider, name: &str) -> AppResult<Vec<u8>>;
}

/// Filesystem-backed source: one inbox directory per provider under a
/// configured root (or the provider's explicit inbox_dir)
pub struct DirFeedSource {
    root: PathBuf,
}

impl DirFeedSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn provider_dir(&self, provider: &Provider) -> PathBuf {
        match &provider.inbox_dir {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => self.root.join(&provider.name),
        }
    }
}

#[async_trait]
impl FeedSource for DirFeedSource {
    async fn list(&self, provider: &Provider) -> AppResult<Vec<FeedFile>> {
        let dir = self.provider_dir(provider);
        if !dir.is_dir() {
            tracing::debug!("provider inbox {} does not exist", dir.display());
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot read inbox {}: {}", dir.display(), e)))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
        {
            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                _ => continue,
            };
            let name = entry.file_name().to_string_lossy().into_owned();
            files.push(FeedFile {
                name,
                modified: metadata.modified().ok(),
                size: metadata.len(),
            });
        }

        // Newest first; a provider may cap how many files one run consumes
        files.sort_by(|a, b| b.modified.cmp(&a.modified));
        Ok(files)
    }

    async fn fetch(&self, provider: &Provider, name: &str) -> AppResult<Vec<u8>> {
        // Feed names come from list(); refuse anything path-like
        if name.contains('/') || name.contains("..") {
            return Err(AppError::BadRequest(format!("Invalid feed name: {}", name)));
        }
        let path = self.provider_dir(provider).join(name);
        tokio::fs::read(&path)
            .await
            .map_err(|e| AppError::Internal(format!("Cannot read feed {}: {}", path.display(), e)))
    }
}

/// Filter `files` on a glob pattern and keep the newest match
pub fn newest_match(files: &[FeedFile], pattern: &str) -> Option<FeedFile> {
    let matcher = glob::Pattern::new(pattern).ok()?;
    files.iter().find(|f| matcher.matches(&f.name)).cloned()
}

/// All matches of a glob pattern, newest first
pub fn all_matches(files: &[FeedFile], pattern: &str) -> Vec<FeedFile> {
    match glob::Pattern::new(pattern) {
        Ok(matcher) => files.iter().filter(|f| matcher.matches(&f.name)).cloned().collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> FeedFile {
        FeedFile {
            name: name.to_string(),
            modified: None,
            size: 0,
        }
    }

    #[test]
    fn test_newest_match_glob() {
        let files = vec![file("MaterialFile_0203.txt"), file("StockFile_0203.txt")];
        let found = newest_match(&files, "MaterialFile*.txt").unwrap();
        assert_eq!(found.name, "MaterialFile_0203.txt");
        assert!(newest_match(&files, "TaxesGouv*.txt").is_none());
    }

    #[test]
    fn test_all_matches_preserves_order() {
        let files = vec![file("tarif_2.csv"), file("tarif_1.csv"), file("readme.md")];
        let found = all_matches(&files, "tarif_*.csv");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].name, "tarif_2.csv");
    }
}
