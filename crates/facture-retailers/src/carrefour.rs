//! Carrefour invoice-request flow.
//!
//! Shorter than Auchan's wizard: one page collects the company identifier and
//! ticket number, a confirmation step, then the company sheet and the
//! download button.

use crate::field;
use async_trait::async_trait;
use chromiumoxide::Page;
use facture_browser::actions::{click, click_if_present, click_labeled, fill};
use facture_browser::BrowserSession;
use facture_core::{FormNavigator, Profile};
use std::time::Duration;

const ENTRY_URL: &str = "https://www.carrefour.fr/services/facture";

const COOKIE_TIMEOUT: Duration = Duration::from_secs(5);
const STEP_TIMEOUT: Duration = Duration::from_secs(15);
const CONFIRM_TIMEOUT: Duration = Duration::from_secs(20);

const REQUIRED_FIELDS: &[&str] = &["address", "zipCode", "city", "siret", "vat"];

pub struct CarrefourNavigator;

impl CarrefourNavigator {
    async fn drive(
        &self,
        page: &Page,
        barcode: &str,
        profile: &Profile,
    ) -> facture_browser::Result<()> {
        page.goto(ENTRY_URL).await?;

        click_if_present(page, "#onetrust-accept-btn-handler", COOKIE_TIMEOUT).await;

        click(page, ".c-button__loader__container", STEP_TIMEOUT).await?;
        click(page, "#entreprise", STEP_TIMEOUT).await?;

        // The live form expects the SIRET in its companyName field.
        fill(
            page,
            r#"[name="companyName"]"#,
            field(profile, "siret"),
            STEP_TIMEOUT,
        )
        .await?;
        fill(page, r#"[name="ticketNumber"]"#, barcode, STEP_TIMEOUT).await?;

        click_labeled(page, "button", "Valider", CONFIRM_TIMEOUT).await?;
        click_labeled(page, "button", "Confirmer mes infos", CONFIRM_TIMEOUT).await?;

        fill(page, r#"[name="address"]"#, field(profile, "address"), STEP_TIMEOUT).await?;
        fill(page, r#"[name="postalCode"]"#, field(profile, "zipCode"), STEP_TIMEOUT).await?;
        fill(page, r#"[name="city"]"#, field(profile, "city"), STEP_TIMEOUT).await?;
        fill(
            page,
            r#"[name="companyIdentifier"]"#,
            field(profile, "siret"),
            STEP_TIMEOUT,
        )
        .await?;
        fill(
            page,
            r#"[name="companyVatNumber"]"#,
            field(profile, "vat"),
            STEP_TIMEOUT,
        )
        .await?;

        // The download control is a button or a link depending on the UI build.
        if let Err(err) =
            click_labeled(page, "button", "Télécharger ma facture", CONFIRM_TIMEOUT).await
        {
            tracing::debug!("Download button not found ({}), trying the link variant", err);
            click_labeled(page, "a", "Télécharger ma facture", CONFIRM_TIMEOUT).await?;
        }

        Ok(())
    }
}

#[async_trait]
impl FormNavigator<BrowserSession> for CarrefourNavigator {
    fn required_fields(&self) -> &'static [&'static str] {
        REQUIRED_FIELDS
    }

    async fn run(
        &self,
        session: &BrowserSession,
        barcode: &str,
        profile: &Profile,
    ) -> facture_core::Result<()> {
        tracing::debug!(barcode, "Walking the Carrefour invoice form");
        self.drive(session.page(), barcode, profile)
            .await
            .map_err(Into::into)
    }
}
