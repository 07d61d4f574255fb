use std::collections::BTreeMap;

use rootcause::prelude::*;

use crate::material::{capabilities::CapabilitySet, identity::Identity, profile::Profile};

/// An application target: one bundle identifier and the capabilities it
/// was built with.
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub bundle_id: String,
    pub capabilities: CapabilitySet,
}

impl Target {
    pub fn new(bundle_id: &str, capabilities: CapabilitySet) -> Self {
        Target {
            bundle_id: bundle_id.to_string(),
            capabilities,
        }
    }
}

/// The built application being re-signed.
pub trait Archive {
    fn bundle_id_entitlements_map(&self) -> BTreeMap<String, CapabilitySet>;

    /// Whether the archive was signed with an Xcode managed profile
    fn is_xcode_managed(&self) -> bool;

    fn targets(&self) -> Vec<Target> {
        self.bundle_id_entitlements_map()
            .into_iter()
            .map(|(bundle_id, capabilities)| Target {
                bundle_id,
                capabilities,
            })
            .collect()
    }
}

/// Signing material installed on the machine. Called again every time a
/// round is retried, so implementations should reload rather than cache.
pub trait Inventory {
    fn installed_identities(&self) -> Result<Vec<Identity>, Report>;
    fn installed_profiles(&self) -> Result<Vec<Profile>, Report>;
}
