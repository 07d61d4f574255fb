use std::collections::HashMap;
use std::fmt::Display;
use std::str::FromStr;
use std::time::SystemTime;

use rootcause::{option_ext::OptionExt, prelude::*};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::{
    CodesignError,
    material::{capabilities::CapabilitySet, identity::IdentityClass},
    util::plist::{PlistDataExtract, embedded_plist},
};

/// Distribution channel a provisioning profile (and an export) is made for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportMethod {
    Development,
    AdHoc,
    Enterprise,
    AppStore,
}

impl ExportMethod {
    pub const ALL: [ExportMethod; 4] = [
        ExportMethod::Development,
        ExportMethod::AdHoc,
        ExportMethod::Enterprise,
        ExportMethod::AppStore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportMethod::Development => "development",
            ExportMethod::AdHoc => "ad-hoc",
            ExportMethod::Enterprise => "enterprise",
            ExportMethod::AppStore => "app-store",
        }
    }

    /// The certificate class that can sign for this method
    pub fn identity_class(&self) -> IdentityClass {
        match self {
            ExportMethod::Development => IdentityClass::Development,
            ExportMethod::AdHoc | ExportMethod::Enterprise | ExportMethod::AppStore => {
                IdentityClass::Distribution
            }
        }
    }
}

impl Display for ExportMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ExportMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportMethod::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("Unknown export method: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub uuid: String,
    pub name: String,
    /// May end in a single `*` wildcard, e.g. `com.acme.*`
    pub bundle_id: String,
    pub team_id: String,
    pub team_name: String,
    pub expiration: SystemTime,
    pub capabilities: CapabilitySet,
    pub export_method: ExportMethod,
    pub xcode_managed: bool,
    /// Uppercase hex SHA1 fingerprints of the certificates the profile embeds
    pub embedded_identities: Vec<String>,
}

impl Profile {
    /// Decode the plist payload of a `.mobileprovision` blob.
    pub fn from_mobileprovision(data: &[u8]) -> Result<Self, Report> {
        let payload = embedded_plist(data)
            .ok_or_report()
            .context(CodesignError::InvalidProfile(
                "No plist payload found".to_string(),
            ))?;

        let dict = plist::Value::from_reader_xml(payload)
            .context(CodesignError::InvalidProfile(
                "Failed to parse plist payload".to_string(),
            ))?
            .into_dictionary()
            .ok_or_report()
            .context(CodesignError::InvalidProfile(
                "Plist payload is not a dictionary".to_string(),
            ))?;

        Self::from_dictionary(&dict)
    }

    /// Build a profile from an already decoded profile dictionary.
    pub fn from_dictionary(dict: &plist::Dictionary) -> Result<Self, Report> {
        Ok(Self::read_dictionary(dict).context(CodesignError::InvalidProfile(
            "Missing required profile fields".to_string(),
        ))?)
    }

    fn read_dictionary(dict: &plist::Dictionary) -> Result<Self, Report> {
        let uuid = dict.get_string("UUID")?;
        let name = dict.get_string("Name")?;
        let team_id = dict
            .get_array("TeamIdentifier")?
            .first()
            .and_then(|v| v.as_string())
            .ok_or_else(|| report!("TeamIdentifier is empty"))?
            .to_string();
        let team_name = dict.get_string("TeamName")?;
        let expiration = dict.get_date("ExpirationDate")?;
        let capabilities = dict.get_dict("Entitlements")?.clone();

        let app_id = capabilities.get_str("application-identifier")?;
        let prefixes: Vec<&str> = dict
            .get("ApplicationIdentifierPrefix")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_string()).collect())
            .unwrap_or_default();
        let bundle_id = strip_app_id_prefix(app_id, &team_id, &prefixes).to_string();

        let export_method = export_method_of(dict, &capabilities);
        let xcode_managed = dict.get_bool_or("IsXcodeManaged", false);

        let embedded_identities = dict
            .get("DeveloperCertificates")
            .and_then(|v| v.as_array())
            .map(|certs| {
                certs
                    .iter()
                    .filter_map(|c| c.as_data())
                    .map(|der| hex::encode_upper(Sha1::digest(der)))
                    .collect()
            })
            .unwrap_or_default();

        Ok(Profile {
            uuid,
            name,
            bundle_id,
            team_id,
            team_name,
            expiration,
            capabilities,
            export_method,
            xcode_managed,
            embedded_identities,
        })
    }

    pub fn matches_bundle_id(&self, bundle_id: &str) -> bool {
        bundle_id_matches(&self.bundle_id, bundle_id)
    }

    pub fn is_wildcard(&self) -> bool {
        self.bundle_id.ends_with('*')
    }

    pub fn embeds_identity(&self, sha1_fingerprint: &str) -> bool {
        self.embedded_identities
            .iter()
            .any(|f| f.eq_ignore_ascii_case(sha1_fingerprint))
    }

    /// Label shown when asking the user to pick a profile
    pub fn label(&self) -> String {
        format!("{} ({})", self.name, self.uuid)
    }
}

fn strip_app_id_prefix<'a>(app_id: &'a str, team_id: &str, prefixes: &[&str]) -> &'a str {
    std::iter::once(team_id)
        .chain(prefixes.iter().copied())
        .find_map(|prefix| {
            app_id
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('.'))
        })
        .unwrap_or(app_id)
}

fn export_method_of(dict: &plist::Dictionary, entitlements: &CapabilitySet) -> ExportMethod {
    if dict.get_bool_or("ProvisionsAllDevices", false) {
        ExportMethod::Enterprise
    } else if !dict.contains_key("ProvisionedDevices") {
        ExportMethod::AppStore
    } else if entitlements.get_bool_or("get-task-allow", false) {
        ExportMethod::Development
    } else {
        ExportMethod::AdHoc
    }
}

/// Match a bundle identifier against a profile's, which may end in a single
/// trailing `*`. `com.acme.*` matches anything starting with `com.acme.` and
/// a bare `*` matches everything. A `*` anywhere else is literal.
pub fn bundle_id_matches(pattern: &str, bundle_id: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => bundle_id.starts_with(prefix),
        None => pattern == bundle_id,
    }
}

/// Keep the profile expiring last for every (bundle id, name) pair.
///
/// Output follows the order in which each pair first appears; ties keep the
/// earlier profile. Teams are not part of the key, so profiles of different
/// teams sharing a name (Xcode's "iOS Team Provisioning Profile: *" for one)
/// collapse into one; bucket with [`crate::profiles_by_team`] first to keep
/// one per team.
pub fn latest_per_name_and_bundle(profiles: &[Profile]) -> Vec<Profile> {
    let mut latest: Vec<Profile> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();

    for profile in profiles {
        let key = (profile.bundle_id.as_str(), profile.name.as_str());
        match index.get(&key) {
            Some(&i) => {
                if profile.expiration > latest[i].expiration {
                    latest[i] = profile.clone();
                }
            }
            None => {
                index.insert(key, latest.len());
                latest.push(profile.clone());
            }
        }
    }

    latest
}
