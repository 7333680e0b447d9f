//! Batch orchestration: one profile, one download directory, many barcodes.

use crate::navigate::{FormNavigator, SessionProvider};
use crate::retry::{AttemptOutcome, RetryController};
use crate::watcher::DownloadWatcher;
use crate::{Error, Profile, Result};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Built once per process, read-only afterwards.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Where the browser drops invoices and where `facture_<n>.pdf` files end up.
    pub invoices_dir: PathBuf,
    /// Append-only log of barcodes that exhausted their attempts; accumulates
    /// across runs, never truncated here.
    pub failed_barcodes_file: PathBuf,
    pub max_attempts: u32,
    pub download_timeout: Duration,
}

impl BatchConfig {
    pub fn new(invoices_dir: PathBuf, failed_barcodes_file: PathBuf) -> Self {
        Self {
            invoices_dir,
            failed_barcodes_file,
            max_attempts: 3,
            download_timeout: Duration::from_secs(40),
        }
    }
}

/// What one batch run produced. A barcode lands in `downloaded` (through its
/// renamed file) or in `failed`, never both.
#[derive(Debug, Default, Serialize)]
pub struct BatchResult {
    pub downloaded: Vec<PathBuf>,
    pub failed: Vec<String>,
}

pub struct BatchRunner<'a, P: SessionProvider> {
    provider: &'a P,
    navigator: &'a dyn FormNavigator<P::Session>,
    config: &'a BatchConfig,
}

impl<'a, P: SessionProvider> BatchRunner<'a, P> {
    pub fn new(
        provider: &'a P,
        navigator: &'a dyn FormNavigator<P::Session>,
        config: &'a BatchConfig,
    ) -> Self {
        Self {
            provider,
            navigator,
            config,
        }
    }

    /// Process the barcodes strictly in input order, one browser session at a
    /// time. Fails fast on an incomplete profile before any browser work;
    /// after that, per-barcode failures are collected, never raised.
    pub async fn run(&self, barcodes: &[String], profile: &Profile) -> Result<BatchResult> {
        let missing = profile.missing_fields(self.navigator.required_fields());
        if !missing.is_empty() {
            return Err(Error::Configuration { missing });
        }

        std::fs::create_dir_all(&self.config.invoices_dir)?;
        if let Some(parent) = self.config.failed_barcodes_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let watcher = DownloadWatcher::new(self.config.invoices_dir.clone());
        let controller = RetryController::new(
            self.provider,
            self.navigator,
            &watcher,
            self.config.max_attempts,
            self.config.download_timeout,
        );

        let mut result = BatchResult::default();
        // Numbering is gap-free over successes only, whatever fails in between.
        let mut invoice_number: u32 = 1;

        for barcode in barcodes {
            match controller.attempt_barcode(barcode, profile).await {
                AttemptOutcome::Succeeded(download) => {
                    let target = self
                        .config
                        .invoices_dir
                        .join(format!("facture_{invoice_number}.pdf"));
                    match std::fs::rename(&download, &target) {
                        Ok(()) => {
                            tracing::info!(%barcode, "Saved invoice: {}", target.display());
                            result.downloaded.push(target);
                            invoice_number += 1;
                        }
                        Err(err) => {
                            tracing::warn!(
                                %barcode,
                                error = %err,
                                "Downloaded but could not be moved into place"
                            );
                            self.record_failure(barcode, &mut result);
                        }
                    }
                }
                AttemptOutcome::Exhausted => {
                    self.record_failure(barcode, &mut result);
                }
            }
        }

        Ok(result)
    }

    /// Failure-log persistence is best-effort: the returned result already
    /// reports the barcode, so a write error is logged and swallowed.
    fn record_failure(&self, barcode: &str, result: &mut BatchResult) {
        result.failed.push(barcode.to_string());
        if let Err(err) = append_line(&self.config.failed_barcodes_file, barcode) {
            tracing::warn!(barcode, error = %err, "Could not record failed barcode (ignored)");
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{line}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::tests::{FakeProvider, FakeSession};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;

    /// Succeeds or fails per barcode, writing a "download" on success.
    struct BarcodeNavigator {
        download_dir: PathBuf,
        failing: HashSet<String>,
    }

    impl BarcodeNavigator {
        fn new(download_dir: &Path, failing: &[&str]) -> Self {
            Self {
                download_dir: download_dir.to_path_buf(),
                failing: failing.iter().map(|b| b.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl FormNavigator<FakeSession> for BarcodeNavigator {
        fn required_fields(&self) -> &'static [&'static str] {
            &["siret", "vat"]
        }

        async fn run(&self, _session: &FakeSession, barcode: &str, _profile: &Profile) -> Result<()> {
            if self.failing.contains(barcode) {
                return Err(Error::Navigation(format!("form rejected {barcode}")));
            }
            std::fs::write(
                self.download_dir.join(format!("dl_{barcode}.pdf")),
                b"%PDF-1.4",
            )?;
            Ok(())
        }
    }

    fn complete_profile() -> Profile {
        Profile::from_pairs(&[("siret", "12345678900011"), ("vat", "FR40123456789")])
    }

    fn config_in(dir: &Path) -> BatchConfig {
        let mut config = BatchConfig::new(
            dir.join("invoices"),
            dir.join("failed_barcodes.txt"),
        );
        config.max_attempts = 2;
        config.download_timeout = Duration::from_millis(300);
        config
    }

    fn barcodes(codes: &[&str]) -> Vec<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn test_numbering_skips_failed_barcodes_without_gaps() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let provider = FakeProvider::default();
        let navigator = BarcodeNavigator::new(&config.invoices_dir, &["B"]);

        let result = BatchRunner::new(&provider, &navigator, &config)
            .run(&barcodes(&["A", "B", "C"]), &complete_profile())
            .await
            .unwrap();

        assert_eq!(
            result.downloaded,
            vec![
                config.invoices_dir.join("facture_1.pdf"),
                config.invoices_dir.join("facture_2.pdf"),
            ]
        );
        assert_eq!(result.failed, vec!["B".to_string()]);
        assert!(config.invoices_dir.join("facture_1.pdf").exists());
        assert!(config.invoices_dir.join("facture_2.pdf").exists());
    }

    #[tokio::test]
    async fn test_every_barcode_lands_on_exactly_one_side() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let provider = FakeProvider::default();
        let navigator = BarcodeNavigator::new(&config.invoices_dir, &["B", "D"]);
        let input = barcodes(&["A", "B", "C", "D"]);

        let result = BatchRunner::new(&provider, &navigator, &config)
            .run(&input, &complete_profile())
            .await
            .unwrap();

        assert_eq!(result.downloaded.len() + result.failed.len(), input.len());
        assert_eq!(result.failed, vec!["B".to_string(), "D".to_string()]);
    }

    #[tokio::test]
    async fn test_incomplete_profile_fails_before_any_session() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let provider = FakeProvider::default();
        let navigator = BarcodeNavigator::new(&config.invoices_dir, &[]);
        let profile = Profile::from_pairs(&[("siret", "12345678900011")]);

        let err = BatchRunner::new(&provider, &navigator, &config)
            .run(&barcodes(&["A"]), &profile)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Configuration { ref missing } if missing == &["vat"]));
        assert_eq!(provider.opened.load(Ordering::SeqCst), 0);
        assert_eq!(provider.closed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_barcodes_accumulate_in_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let provider = FakeProvider::default();
        let navigator = BarcodeNavigator::new(&config.invoices_dir, &["X", "Y"]);
        let runner = BatchRunner::new(&provider, &navigator, &config);

        runner
            .run(&barcodes(&["X"]), &complete_profile())
            .await
            .unwrap();
        runner
            .run(&barcodes(&["Y"]), &complete_profile())
            .await
            .unwrap();

        let log = std::fs::read_to_string(&config.failed_barcodes_file).unwrap();
        assert_eq!(log, "X\nY\n");
    }

    #[tokio::test]
    async fn test_unwritable_failure_log_does_not_change_the_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path());
        // A directory at the log path makes every append fail.
        config.failed_barcodes_file = dir.path().to_path_buf();
        let provider = FakeProvider::default();
        let navigator = BarcodeNavigator::new(&config.invoices_dir, &["A"]);

        let result = BatchRunner::new(&provider, &navigator, &config)
            .run(&barcodes(&["A"]), &complete_profile())
            .await
            .unwrap();

        assert_eq!(result.failed, vec!["A".to_string()]);
    }
}
