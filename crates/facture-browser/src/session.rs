//! Chrome session lifecycle.
//!
//! Each session is an isolated Chrome process with its own temporary profile,
//! downloads routed to the configured directory. Sessions are opened and torn
//! down through the engine's [`SessionProvider`] seam; teardown is treated as
//! best-effort by the callers, so every error here is reported, not raised
//! past the attempt.

use crate::finder::ChromeFinder;
use crate::{Error, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::Page;
use facture_core::SessionProvider;
use futures::StreamExt;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::task::JoinHandle;

/// How sessions are launched. Built once, shared by every attempt in a batch.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Where Chrome drops completed downloads. Created if absent.
    pub download_dir: PathBuf,
    pub headless: bool,
    /// Pin a specific Chrome binary instead of probing for one.
    pub chrome_binary: Option<PathBuf>,
}

impl SessionConfig {
    pub fn new(download_dir: PathBuf) -> Self {
        Self {
            download_dir,
            headless: false,
            chrome_binary: None,
        }
    }
}

/// A live Chrome process plus the page the navigator drives.
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler_task: JoinHandle<()>,
    // Held for the session's lifetime; dropping it deletes the profile.
    _profile_dir: TempDir,
}

impl BrowserSession {
    pub fn page(&self) -> &Page {
        &self.page
    }
}

/// [`SessionProvider`] over chromiumoxide.
pub struct ChromeSessions {
    config: SessionConfig,
}

impl ChromeSessions {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    async fn launch(&self) -> Result<BrowserSession> {
        std::fs::create_dir_all(&self.config.download_dir)?;

        let profile_dir = tempfile::tempdir()?;

        let mut builder = BrowserConfig::builder().user_data_dir(profile_dir.path());
        if !self.config.headless {
            builder = builder.with_head();
        }

        let finder = ChromeFinder::new(self.config.chrome_binary.clone());
        if let Some(binary) = finder.resolve()? {
            tracing::debug!("Using Chrome at: {}", binary.display());
            builder = builder.chrome_executable(binary);
        }

        let browser_config = builder.build().map_err(Error::Browser)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        // The handler task must drain CDP protocol messages for any browser
        // command to make progress.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    tracing::debug!("CDP handler event error (continuing): {}", err);
                }
            }
        });

        let page = browser.new_page("about:blank").await?;

        // Route downloads into our directory instead of the user's default.
        let download_path = self.config.download_dir.to_string_lossy().to_string();
        page.execute(SetDownloadBehaviorParams {
            behavior: SetDownloadBehaviorBehavior::Allow,
            download_path: Some(download_path),
            browser_context_id: None,
            events_enabled: None,
        })
        .await?;

        tracing::debug!(
            "Chrome session ready, downloads go to {}",
            self.config.download_dir.display()
        );

        Ok(BrowserSession {
            browser,
            page,
            handler_task,
            _profile_dir: profile_dir,
        })
    }

    async fn teardown(&self, session: BrowserSession) -> Result<()> {
        let BrowserSession {
            mut browser,
            page,
            handler_task,
            _profile_dir,
        } = session;
        drop(page);

        let close_result = browser.close().await;
        let wait_result = browser.wait().await;
        handler_task.abort();

        close_result?;
        let _ = wait_result?;
        Ok(())
    }
}

#[async_trait]
impl SessionProvider for ChromeSessions {
    type Session = BrowserSession;

    async fn open(&self) -> facture_core::Result<BrowserSession> {
        self.launch()
            .await
            .map_err(|err| facture_core::Error::Session(err.to_string()))
    }

    async fn close(&self, session: BrowserSession) -> facture_core::Result<()> {
        self.teardown(session)
            .await
            .map_err(|err| facture_core::Error::Session(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::new(PathBuf::from("/tmp/invoices"));
        assert!(!config.headless);
        assert!(config.chrome_binary.is_none());
    }

    // Opening a real session requires a Chrome binary; the engine-level
    // behavior is covered with fake providers in facture-core.
}
