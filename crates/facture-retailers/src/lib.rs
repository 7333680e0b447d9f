//! One navigator per supported retailer.
//!
//! Each navigator is a scripted walk through that retailer's invoice-request
//! form: wait for an element, fill it or click it, step after step, until the
//! site serves the PDF. Selector maps and flow order are site specifics; the
//! engine only sees the [`facture_core::FormNavigator`] contract.

mod auchan;
mod carrefour;

pub use auchan::AuchanNavigator;
pub use carrefour::CarrefourNavigator;

use facture_core::Profile;

/// Fields are validated before any browser work starts, so a lookup here can
/// only miss if validation was skipped; an empty value keeps the form moving
/// and lets the site reject it.
fn field<'a>(profile: &'a Profile, name: &str) -> &'a str {
    profile.get(name).unwrap_or_default()
}
