//! Profile store: the reusable company/contact field bundles used to fill
//! retailer invoice-request forms.
//!
//! Profiles live in a single JSON file keyed by profile name, each value a
//! flat mapping of field name to value:
//!
//! ```json
//! {
//!     "my-company": {
//!         "siret": "12345678900011",
//!         "companyName": "ACME SARL",
//!         "address": "1 rue de la Paix"
//!     }
//! }
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// A flat mapping of contact/company fields, read-only for the whole batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile {
    fields: HashMap<String, String>,
}

impl Profile {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Required fields that are absent or empty, in the order requested.
    /// An empty value is as unusable as a missing key when filling a form.
    pub fn missing_fields(&self, required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|field| self.get(field).is_none_or(str::is_empty))
            .map(|field| field.to_string())
            .collect()
    }

    #[cfg(test)]
    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        Self {
            fields: pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// All profiles from one `profiles.json`, loaded once per batch.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    profiles: HashMap<String, Profile>,
}

impl ProfileStore {
    /// Load the store from a JSON file keyed by profile name.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!(
                    "profile store not found at {}. Create it from profiles.example.json.",
                    path.display()
                ),
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let profiles: HashMap<String, Profile> = serde_json::from_str(&content)?;

        tracing::debug!(
            "Loaded {} profile(s) from {}",
            profiles.len(),
            path.display()
        );

        Ok(Self { profiles })
    }

    pub fn get(&self, name: &str) -> Result<&Profile> {
        self.profiles
            .get(name)
            .ok_or_else(|| Error::ProfileNotFound(name.to_string()))
    }

    /// Profile names, sorted for stable listing.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
