//! Fixtures shared by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use codesign_groups::{Archive, CapabilitySet, ExportMethod, Identity, Inventory, Profile};
use rootcause::Report;

pub fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub fn developer(serial: &str, team_id: &str) -> Identity {
    Identity::new(
        serial,
        &format!("Apple Development: {serial} ({team_id})"),
        team_id,
        &format!("{team_id} Team"),
        &format!("{serial}0000"),
    )
}

pub fn distributor(serial: &str, team_id: &str) -> Identity {
    Identity::new(
        serial,
        &format!("Apple Distribution: {serial} ({team_id})"),
        team_id,
        &format!("{team_id} Team"),
        &format!("{serial}0000"),
    )
}

pub fn profile(uuid: &str, bundle_id: &str, team_id: &str) -> Profile {
    Profile {
        uuid: uuid.to_string(),
        name: format!("{uuid} profile"),
        bundle_id: bundle_id.to_string(),
        team_id: team_id.to_string(),
        team_name: format!("{team_id} Team"),
        expiration: at(1_000),
        capabilities: CapabilitySet::new(),
        export_method: ExportMethod::Development,
        xcode_managed: false,
        embedded_identities: vec![],
    }
}

/// Parse the inner XML of a `<plist>` element into a capability set
pub fn caps(xml: &str) -> CapabilitySet {
    let doc = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><plist version="1.0">{xml}</plist>"#
    );
    plist::Value::from_reader_xml(doc.as_bytes())
        .unwrap()
        .into_dictionary()
        .unwrap()
}

pub struct FakeArchive {
    pub targets: BTreeMap<String, CapabilitySet>,
    pub xcode_managed: bool,
}

impl FakeArchive {
    pub fn new(targets: &[(&str, CapabilitySet)]) -> Self {
        FakeArchive {
            targets: targets
                .iter()
                .map(|(id, caps)| (id.to_string(), caps.clone()))
                .collect(),
            xcode_managed: false,
        }
    }
}

impl Archive for FakeArchive {
    fn bundle_id_entitlements_map(&self) -> BTreeMap<String, CapabilitySet> {
        self.targets.clone()
    }

    fn is_xcode_managed(&self) -> bool {
        self.xcode_managed
    }
}

pub struct FakeInventory {
    pub identities: Vec<Identity>,
    pub profiles: Vec<Profile>,
}

impl Inventory for FakeInventory {
    fn installed_identities(&self) -> Result<Vec<Identity>, Report> {
        Ok(self.identities.clone())
    }

    fn installed_profiles(&self) -> Result<Vec<Profile>, Report> {
        Ok(self.profiles.clone())
    }
}
