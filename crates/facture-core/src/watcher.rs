//! Download detection via snapshot/diff.
//!
//! Browser downloads complete asynchronously and land in a shared directory
//! that may already hold unrelated files. A [`DownloadSnapshot`] taken right
//! before an attempt starts is the baseline; a file present later but absent
//! from the baseline is attributed to that attempt.

use crate::{Error, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The set of invoice files present in the download directory at one instant.
/// Valid for a single attempt.
#[derive(Debug, Clone)]
pub struct DownloadSnapshot {
    files: HashSet<PathBuf>,
}

impl DownloadSnapshot {
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Polls a download directory for newly arrived PDF files.
#[derive(Debug, Clone)]
pub struct DownloadWatcher {
    dir: PathBuf,
    poll_interval: Duration,
}

impl DownloadWatcher {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    #[cfg(test)]
    fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Record which invoice files are present right now.
    pub fn snapshot(&self) -> Result<DownloadSnapshot> {
        Ok(DownloadSnapshot { files: self.scan()? })
    }

    /// Wait until a PDF absent from `baseline` appears, or `timeout` elapses.
    ///
    /// When several new files qualify at once, the one with the latest
    /// creation time wins. Chrome's in-flight `.crdownload` files never match
    /// the extension filter, so only completed downloads are reported.
    pub async fn await_new_file(
        &self,
        baseline: &DownloadSnapshot,
        timeout: Duration,
    ) -> Result<PathBuf> {
        let deadline = Instant::now() + timeout;

        loop {
            let current = self.scan()?;
            let newest = current
                .into_iter()
                .filter(|path| !baseline.files.contains(path))
                .max_by_key(|path| creation_time(path));

            if let Some(path) = newest {
                tracing::debug!("New download detected: {}", path.display());
                return Ok(path);
            }

            if Instant::now() >= deadline {
                return Err(Error::DownloadTimeout { timeout });
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    fn scan(&self) -> Result<HashSet<PathBuf>> {
        if !self.dir.exists() {
            return Ok(HashSet::new());
        }

        let mut files = HashSet::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if is_pdf(&path) {
                files.insert(path);
            }
        }
        Ok(files)
    }
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

fn creation_time(path: &Path) -> Option<SystemTime> {
    // btime is not available on every filesystem; mtime is equivalent for a
    // file that was just written once.
    let metadata = std::fs::metadata(path).ok()?;
    metadata.created().or_else(|_| metadata.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn watcher_in(dir: &Path) -> DownloadWatcher {
        DownloadWatcher::new(dir.to_path_buf())
            .with_poll_interval(Duration::from_millis(20))
    }

    #[test]
    fn test_snapshot_only_sees_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), b"pdf").unwrap();
        std::fs::write(dir.path().join("b.PDF"), b"pdf").unwrap();
        std::fs::write(dir.path().join("c.crdownload"), b"partial").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"text").unwrap();

        let snapshot = watcher_in(dir.path()).snapshot().unwrap();
        assert_eq!(snapshot.len(), 2);
    }

    #[test]
    fn test_snapshot_of_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = watcher_in(&dir.path().join("not-created-yet"));
        assert!(watcher.snapshot().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detects_file_created_after_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.pdf"), b"old").unwrap();

        let watcher = watcher_in(dir.path());
        let baseline = watcher.snapshot().unwrap();

        let target = dir.path().join("invoice.pdf");
        let writer = {
            let target = target.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(80)).await;
                std::fs::write(&target, b"new").unwrap();
            })
        };

        let found = watcher
            .await_new_file(&baseline, Duration::from_secs(5))
            .await
            .unwrap();
        writer.await.unwrap();

        assert_eq!(found, target);
    }

    #[tokio::test]
    async fn test_picks_newest_when_several_qualify() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = watcher_in(dir.path());
        let baseline = watcher.snapshot().unwrap();

        std::fs::write(dir.path().join("first.pdf"), b"1").unwrap();
        std::thread::sleep(Duration::from_millis(300));
        std::fs::write(dir.path().join("second.pdf"), b"2").unwrap();

        let found = watcher
            .await_new_file(&baseline, Duration::from_secs(5))
            .await
            .unwrap();

        assert_eq!(found, dir.path().join("second.pdf"));
    }

    #[tokio::test]
    async fn test_times_out_when_nothing_arrives() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = watcher_in(dir.path());
        let baseline = watcher.snapshot().unwrap();

        let result = watcher
            .await_new_file(&baseline, Duration::from_millis(300))
            .await;

        assert!(matches!(result, Err(Error::DownloadTimeout { .. })));
    }

    #[tokio::test]
    async fn test_baseline_files_are_not_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("leftover.pdf"), b"old").unwrap();

        let watcher = watcher_in(dir.path());
        let baseline = watcher.snapshot().unwrap();

        let result = watcher
            .await_new_file(&baseline, Duration::from_millis(300))
            .await;

        assert!(matches!(result, Err(Error::DownloadTimeout { .. })));
    }

    #[tokio::test]
    async fn test_non_pdf_files_do_not_satisfy_the_wait() {
        let dir = tempfile::tempdir().unwrap();
        let watcher = watcher_in(dir.path());
        let baseline = watcher.snapshot().unwrap();

        std::fs::write(dir.path().join("invoice.pdf.crdownload"), b"partial").unwrap();

        let result = watcher
            .await_new_file(&baseline, Duration::from_millis(300))
            .await;

        assert!(matches!(result, Err(Error::DownloadTimeout { .. })));
    }
}
