use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::material::{profile::ExportMethod, team::TeamScoped};

/// Common-name prefixes Apple uses for distribution certificates
pub const DEFAULT_DISTRIBUTION_MARKERS: &[&str] = &[
    "iPhone Distribution:",
    "Apple Distribution:",
    "iOS Distribution:",
    "Mac App Distribution:",
    "3rd Party Mac Developer Application:",
];

/// A signing certificate with its private key, as found in the keychain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub serial_number: String,
    pub common_name: String,
    pub team_id: String,
    pub team_name: String,
    /// Uppercase hex SHA1 of the certificate DER
    pub sha1_fingerprint: String,
}

impl Identity {
    pub fn new(
        serial_number: &str,
        common_name: &str,
        team_id: &str,
        team_name: &str,
        sha1_fingerprint: &str,
    ) -> Self {
        Identity {
            serial_number: serial_number.to_string(),
            common_name: common_name.to_string(),
            team_id: team_id.to_string(),
            team_name: team_name.to_string(),
            sha1_fingerprint: sha1_fingerprint.to_uppercase(),
        }
    }

    /// Label shown when asking the user to pick an identity
    pub fn label(&self) -> String {
        format!("{} [{}]", self.common_name, self.team_key())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdentityClass {
    Development,
    Distribution,
}

impl Display for IdentityClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityClass::Development => write!(f, "development"),
            IdentityClass::Distribution => write!(f, "distribution"),
        }
    }
}

impl FromStr for IdentityClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "development" => Ok(IdentityClass::Development),
            "distribution" => Ok(IdentityClass::Distribution),
            other => Err(format!("Unknown identity class: {}", other)),
        }
    }
}

/// Decides an identity's class from its common name.
///
/// An identity is distribution class when its common name starts with one of
/// the configured markers, development class otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClassifier {
    markers: Vec<String>,
}

impl Default for IdentityClassifier {
    fn default() -> Self {
        IdentityClassifier::new(DEFAULT_DISTRIBUTION_MARKERS.iter().map(|m| m.to_string()))
    }
}

impl IdentityClassifier {
    pub fn new(markers: impl IntoIterator<Item = String>) -> Self {
        IdentityClassifier {
            markers: markers.into_iter().collect(),
        }
    }

    pub fn markers(&self) -> &[String] {
        &self.markers
    }

    pub fn class_of(&self, identity: &Identity) -> IdentityClass {
        if self
            .markers
            .iter()
            .any(|marker| identity.common_name.starts_with(marker.as_str()))
        {
            IdentityClass::Distribution
        } else {
            IdentityClass::Development
        }
    }

    pub fn filter_by_export_method(
        &self,
        identities: &[Identity],
        method: ExportMethod,
    ) -> Vec<Identity> {
        let class = method.identity_class();
        identities
            .iter()
            .filter(|identity| self.class_of(identity) == class)
            .cloned()
            .collect()
    }
}
