//! Auchan invoice-request flow.
//!
//! The form is a wizard: barcode, customer type, identification type, SIRET,
//! then the company/contact sheet, with a "Suivant" button between steps and
//! a download link at the end.

use crate::field;
use async_trait::async_trait;
use chromiumoxide::Page;
use facture_browser::actions::{click, click_if_present, click_labeled, fill};
use facture_browser::BrowserSession;
use facture_core::{FormNavigator, Profile};
use std::time::Duration;

const ENTRY_URL: &str = "https://www.auchan.fr/facture";

const COOKIE_TIMEOUT: Duration = Duration::from_secs(5);
const STEP_TIMEOUT: Duration = Duration::from_secs(15);
const BUTTON_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(20);

const REQUIRED_FIELDS: &[&str] = &[
    "siret",
    "companyName",
    "address",
    "zipCode",
    "city",
    "vat",
    "name",
    "contactEmail",
];

pub struct AuchanNavigator;

impl AuchanNavigator {
    async fn drive(
        &self,
        page: &Page,
        barcode: &str,
        profile: &Profile,
    ) -> facture_browser::Result<()> {
        page.goto(ENTRY_URL).await?;

        // The consent banner does not show up on every session.
        click_if_present(page, "#onetrust-accept-btn-handler", COOKIE_TIMEOUT).await;

        click_labeled(page, "a", "Commencer", STEP_TIMEOUT).await?;

        fill(page, "#barcode", barcode, STEP_TIMEOUT).await?;
        click_labeled(page, ".btn", "Suivant", BUTTON_TIMEOUT).await?;

        // Professional customer, identified by SIRET.
        click_labeled(page, "a", "Un professionnel", STEP_TIMEOUT).await?;
        click(page, "#businessValue", STEP_TIMEOUT).await?;
        click(
            page,
            r#"li.business-type[data-businessid="PRIVATE_COMPANY"]"#,
            STEP_TIMEOUT,
        )
        .await?;
        click_labeled(page, ".btn", "Suivant", BUTTON_TIMEOUT).await?;

        click(page, "#typeId", STEP_TIMEOUT).await?;
        click(
            page,
            r#"li.identification-type[data-typeid="SIRET"]"#,
            STEP_TIMEOUT,
        )
        .await?;
        click_labeled(page, ".btn", "Suivant", BUTTON_TIMEOUT).await?;

        fill(page, "#siret", field(profile, "siret"), STEP_TIMEOUT).await?;
        click_labeled(page, ".btn", "Suivant", BUTTON_TIMEOUT).await?;

        // Company and contact sheet.
        fill(page, "#companyName", field(profile, "companyName"), STEP_TIMEOUT).await?;
        fill(page, "#companyAddress", field(profile, "address"), STEP_TIMEOUT).await?;
        fill(page, "#zipCode", field(profile, "zipCode"), STEP_TIMEOUT).await?;
        fill(page, "#city", field(profile, "city"), STEP_TIMEOUT).await?;
        fill(page, "#vat", field(profile, "vat"), STEP_TIMEOUT).await?;
        fill(page, "#contactName", field(profile, "name"), STEP_TIMEOUT).await?;
        fill(page, "#contactEmail", field(profile, "contactEmail"), STEP_TIMEOUT).await?;
        click_labeled(page, ".btn", "Valider", BUTTON_TIMEOUT).await?;

        click(page, r#"button[type="submit"]"#, STEP_TIMEOUT).await?;

        click_labeled(page, "a", "Télécharger", DOWNLOAD_TIMEOUT).await?;

        Ok(())
    }
}

#[async_trait]
impl FormNavigator<BrowserSession> for AuchanNavigator {
    fn required_fields(&self) -> &'static [&'static str] {
        REQUIRED_FIELDS
    }

    async fn run(
        &self,
        session: &BrowserSession,
        barcode: &str,
        profile: &Profile,
    ) -> facture_core::Result<()> {
        tracing::debug!(barcode, "Walking the Auchan invoice form");
        self.drive(session.page(), barcode, profile)
            .await
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_url_is_valid() {
        url::Url::parse(ENTRY_URL).unwrap();
    }

    #[test]
    fn test_required_fields_cover_the_contact_sheet() {
        let navigator = AuchanNavigator;
        for required in ["siret", "companyName", "contactEmail"] {
            assert!(navigator.required_fields().contains(&required));
        }
        assert_eq!(navigator.required_fields().len(), 8);
    }
}
