//! Bounded retry loop for a single barcode.
//!
//! One barcode moves through Pending -> Attempting(1..=max) and ends in
//! either Succeeded or Exhausted. Every cycle acquires a fresh session,
//! snapshots the download directory, runs the navigator, waits for the new
//! file, and releases the session before deciding whether to retry - so no
//! two sessions for the same barcode ever overlap, and a leaked browser
//! process cannot outlive its attempt.

use crate::navigate::{FormNavigator, SessionProvider};
use crate::watcher::DownloadWatcher;
use crate::{Profile, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Terminal state of one barcode's retry loop.
#[derive(Debug)]
pub enum AttemptOutcome {
    /// An invoice file arrived; holds the path as downloaded (pre-rename).
    Succeeded(PathBuf),
    /// All attempts consumed without a download.
    Exhausted,
}

pub struct RetryController<'a, P: SessionProvider> {
    provider: &'a P,
    navigator: &'a dyn FormNavigator<P::Session>,
    watcher: &'a DownloadWatcher,
    max_attempts: u32,
    download_timeout: Duration,
}

impl<'a, P: SessionProvider> RetryController<'a, P> {
    pub fn new(
        provider: &'a P,
        navigator: &'a dyn FormNavigator<P::Session>,
        watcher: &'a DownloadWatcher,
        max_attempts: u32,
        download_timeout: Duration,
    ) -> Self {
        Self {
            provider,
            navigator,
            watcher,
            max_attempts,
            download_timeout,
        }
    }

    /// Try to obtain the invoice for one barcode, at most `max_attempts`
    /// times. Never returns an error: every per-cycle failure is logged and
    /// contained here, so one barcode's exhaustion cannot abort the batch.
    pub async fn attempt_barcode(&self, barcode: &str, profile: &Profile) -> AttemptOutcome {
        for attempt in 1..=self.max_attempts {
            tracing::info!(
                barcode,
                attempt,
                max_attempts = self.max_attempts,
                "Requesting invoice"
            );

            match self.run_attempt(barcode, profile).await {
                Ok(path) => {
                    tracing::info!(barcode, attempt, "Invoice downloaded: {}", path.display());
                    return AttemptOutcome::Succeeded(path);
                }
                Err(err) => {
                    tracing::warn!(barcode, attempt, error = %err, "Attempt failed");
                }
            }
        }

        tracing::warn!(
            barcode,
            max_attempts = self.max_attempts,
            "All attempts exhausted"
        );
        AttemptOutcome::Exhausted
    }

    /// One full cycle: snapshot, open, navigate, wait for the download,
    /// close. The session is released on every path out of this function
    /// before the caller evaluates the result.
    async fn run_attempt(&self, barcode: &str, profile: &Profile) -> Result<PathBuf> {
        // Baseline must predate the session: anything the session downloads
        // has to show up as new against it.
        let baseline = self.watcher.snapshot()?;

        let session = self.provider.open().await?;

        let result = async {
            self.navigator.run(&session, barcode, profile).await?;
            self.watcher
                .await_new_file(&baseline, self.download_timeout)
                .await
        }
        .await;

        if let Err(err) = self.provider.close(session).await {
            tracing::warn!(barcode, error = %err, "Session teardown failed (ignored)");
        }

        result
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::navigate::{FormNavigator, SessionProvider};
    use crate::{Error, Profile};
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU32, Ordering};

    pub struct FakeSession;

    /// Counts open/close pairs; optionally refuses to open at all.
    #[derive(Default)]
    pub struct FakeProvider {
        pub opened: AtomicU32,
        pub closed: AtomicU32,
        pub refuse_open: bool,
    }

    #[async_trait]
    impl SessionProvider for FakeProvider {
        type Session = FakeSession;

        async fn open(&self) -> Result<FakeSession> {
            if self.refuse_open {
                return Err(Error::Session("browser refused to start".into()));
            }
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSession)
        }

        async fn close(&self, _session: FakeSession) -> Result<()> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Fails with a navigation error until `succeed_from`, then drops a PDF
    /// into the download directory the way a real form submission would.
    pub struct FakeNavigator {
        download_dir: PathBuf,
        succeed_from: u32,
        write_file: bool,
        calls: AtomicU32,
    }

    impl FakeNavigator {
        pub fn always_failing(download_dir: &Path) -> Self {
            Self::new(download_dir, u32::MAX, true)
        }

        pub fn succeeding_from(download_dir: &Path, attempt: u32) -> Self {
            Self::new(download_dir, attempt, true)
        }

        pub fn silent(download_dir: &Path) -> Self {
            // Pretends to succeed but never triggers a download.
            Self::new(download_dir, 1, false)
        }

        fn new(download_dir: &Path, succeed_from: u32, write_file: bool) -> Self {
            Self {
                download_dir: download_dir.to_path_buf(),
                succeed_from,
                write_file,
                calls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl FormNavigator<FakeSession> for FakeNavigator {
        fn required_fields(&self) -> &'static [&'static str] {
            &["siret", "vat"]
        }

        async fn run(&self, _session: &FakeSession, barcode: &str, _profile: &Profile) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call < self.succeed_from {
                return Err(Error::Navigation(format!("step failed for {barcode}")));
            }
            if self.write_file {
                std::fs::write(
                    self.download_dir.join(format!("download_{call}.pdf")),
                    b"%PDF-1.4",
                )?;
            }
            Ok(())
        }
    }

    fn controller<'a>(
        provider: &'a FakeProvider,
        navigator: &'a FakeNavigator,
        watcher: &'a DownloadWatcher,
        max_attempts: u32,
    ) -> RetryController<'a, FakeProvider> {
        RetryController::new(
            provider,
            navigator,
            watcher,
            max_attempts,
            Duration::from_millis(300),
        )
    }

    #[tokio::test]
    async fn test_exhausts_after_max_attempts_with_paired_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::default();
        let navigator = FakeNavigator::always_failing(dir.path());
        let watcher = DownloadWatcher::new(dir.path().to_path_buf());

        let outcome = controller(&provider, &navigator, &watcher, 3)
            .attempt_barcode("1000001", &Profile::default())
            .await;

        assert!(matches!(outcome, AttemptOutcome::Exhausted));
        assert_eq!(provider.opened.load(Ordering::SeqCst), 3);
        assert_eq!(provider.closed.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::default();
        let navigator = FakeNavigator::succeeding_from(dir.path(), 2);
        let watcher = DownloadWatcher::new(dir.path().to_path_buf());

        let outcome = controller(&provider, &navigator, &watcher, 3)
            .attempt_barcode("1000002", &Profile::default())
            .await;

        let AttemptOutcome::Succeeded(path) = outcome else {
            panic!("expected a download");
        };
        assert!(path.exists());
        assert_eq!(provider.opened.load(Ordering::SeqCst), 2);
        assert_eq!(provider.closed.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_open_failure_consumes_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider {
            refuse_open: true,
            ..FakeProvider::default()
        };
        let navigator = FakeNavigator::succeeding_from(dir.path(), 1);
        let watcher = DownloadWatcher::new(dir.path().to_path_buf());

        let outcome = controller(&provider, &navigator, &watcher, 2)
            .attempt_barcode("1000003", &Profile::default())
            .await;

        assert!(matches!(outcome, AttemptOutcome::Exhausted));
        assert_eq!(provider.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_download_timeout_is_retried_like_any_failure() {
        let dir = tempfile::tempdir().unwrap();
        let provider = FakeProvider::default();
        let navigator = FakeNavigator::silent(dir.path());
        let watcher = DownloadWatcher::new(dir.path().to_path_buf());

        let outcome = controller(&provider, &navigator, &watcher, 2)
            .attempt_barcode("1000004", &Profile::default())
            .await;

        assert!(matches!(outcome, AttemptOutcome::Exhausted));
        assert_eq!(provider.opened.load(Ordering::SeqCst), 2);
        assert_eq!(provider.closed.load(Ordering::SeqCst), 2);
    }
}
