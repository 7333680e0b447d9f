//! Element interaction helpers shared by the retailer navigators.
//!
//! Retailer pages render most of their form steps client-side, so every
//! lookup polls until the element exists or the step's timeout expires.
//! Polling starts at 100ms and backs off to 1s.

use crate::{Error, Result};
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use std::time::Duration;
use tokio::time::Instant;

const INITIAL_POLL: Duration = Duration::from_millis(100);
const MAX_POLL: Duration = Duration::from_secs(1);

/// Wait for the first element matching `selector` to appear in the DOM.
pub async fn wait_for_element(page: &Page, selector: &str, timeout: Duration) -> Result<Element> {
    let start = Instant::now();
    let mut poll = INITIAL_POLL;

    loop {
        if let Ok(element) = page.find_element(selector).await {
            return Ok(element);
        }

        if start.elapsed() >= timeout {
            return Err(Error::ElementTimeout {
                selector: selector.to_string(),
                timeout,
            });
        }

        tokio::time::sleep(poll).await;
        poll = (poll * 2).min(MAX_POLL);
    }
}

/// Wait for an element and click it.
pub async fn click(page: &Page, selector: &str, timeout: Duration) -> Result<()> {
    let element = wait_for_element(page, selector, timeout).await?;
    element.click().await?;
    Ok(())
}

/// Wait for an input, focus it with a click, and type `text` into it.
/// Inputs start empty in a fresh session, so there is nothing to clear.
pub async fn fill(page: &Page, selector: &str, text: &str, timeout: Duration) -> Result<()> {
    let element = wait_for_element(page, selector, timeout).await?;
    element.click().await?;
    element.type_str(text).await?;
    Ok(())
}

/// Click the element if it shows up in time; report whether it did.
/// For cookie banners and other steps that may legitimately never appear.
pub async fn click_if_present(page: &Page, selector: &str, timeout: Duration) -> bool {
    match click(page, selector, timeout).await {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!("Optional element '{}' skipped: {}", selector, err);
            false
        }
    }
}

/// Click the first element matching `selector` whose visible text contains
/// `label` (trimmed, case-insensitive). Covers the link-text and
/// button-label steps CSS selectors cannot express.
pub async fn click_labeled(
    page: &Page,
    selector: &str,
    label: &str,
    timeout: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    let needle = label.trim().to_lowercase();
    let mut poll = INITIAL_POLL;

    loop {
        if let Ok(elements) = page.find_elements(selector).await {
            for element in elements {
                let Ok(Some(text)) = element.inner_text().await else {
                    continue;
                };
                if text.trim().to_lowercase().contains(&needle) {
                    element.click().await?;
                    return Ok(());
                }
            }
        }

        if Instant::now() >= deadline {
            return Err(Error::ElementTimeout {
                selector: format!("{selector} with text '{label}'"),
                timeout,
            });
        }

        tokio::time::sleep(poll).await;
        poll = (poll * 2).min(MAX_POLL);
    }
}

// These helpers only make sense against a live page; they are exercised
// through the retailer flows, not unit-tested here.
