use std::collections::BTreeMap;

use tracing::debug;

use crate::material::{
    identity::Identity,
    profile::{ExportMethod, Profile},
    team::TeamScoped,
};

/// An identity with every profile that could sign each target under it.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectableGroup {
    pub identity: Identity,
    /// Candidate profiles per target bundle id, in input order
    pub profiles: BTreeMap<String, Vec<Profile>>,
}

impl SelectableGroup {
    pub fn bundle_ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn candidates(&self, bundle_id: &str) -> &[Profile] {
        self.profiles
            .get(bundle_id)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Every bundle id has exactly one candidate left
    pub fn is_unambiguous(&self) -> bool {
        self.profiles.values().all(|p| p.len() == 1)
    }
}

/// A fully resolved signing choice: one identity and one profile per target.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeSignGroup {
    pub identity: Identity,
    pub profiles: BTreeMap<String, Profile>,
}

impl CodeSignGroup {
    pub fn profile_for(&self, bundle_id: &str) -> Option<&Profile> {
        self.profiles.get(bundle_id)
    }

    pub fn bundle_ids(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn team_id(&self) -> &str {
        &self.identity.team_id
    }

    /// The export method shared by every profile, if they agree
    pub fn export_method(&self) -> Option<ExportMethod> {
        let mut methods = self.profiles.values().map(|p| p.export_method);
        let first = methods.next()?;
        methods.all(|m| m == first).then_some(first)
    }
}

/// Pairs identities with the profiles that can sign each target.
#[derive(Debug, Clone, Copy)]
pub struct GroupBuilder {
    /// Only pair a profile that lists embedded certificates with identities
    /// among them
    pub require_embedded_identity: bool,
}

impl Default for GroupBuilder {
    fn default() -> Self {
        GroupBuilder {
            require_embedded_identity: true,
        }
    }
}

impl GroupBuilder {
    /// One group per identity that has at least one same-team profile for
    /// every target bundle id. Duplicate candidates are kept.
    pub fn build(
        &self,
        identities: &[Identity],
        profiles: &[Profile],
        target_bundle_ids: &[String],
    ) -> Vec<SelectableGroup> {
        let mut groups = Vec::new();

        for identity in identities {
            let team = identity.team_key();
            let eligible: Vec<&Profile> = profiles
                .iter()
                .filter(|p| p.team_key() == team)
                .filter(|p| self.pairs_with(p, identity))
                .collect();

            let mut candidates = BTreeMap::new();
            let mut complete = true;
            for bundle_id in target_bundle_ids {
                let matching: Vec<Profile> = eligible
                    .iter()
                    .filter(|p| p.matches_bundle_id(bundle_id))
                    .map(|p| (*p).clone())
                    .collect();
                if matching.is_empty() {
                    debug!(
                        "{} has no profile for {}, skipping",
                        identity.common_name, bundle_id
                    );
                    complete = false;
                    break;
                }
                candidates.insert(bundle_id.clone(), matching);
            }

            if complete {
                groups.push(SelectableGroup {
                    identity: identity.clone(),
                    profiles: candidates,
                });
            }
        }

        debug!(
            "Built {} selectable groups from {} identities and {} profiles",
            groups.len(),
            identities.len(),
            profiles.len()
        );
        groups
    }

    fn pairs_with(&self, profile: &Profile, identity: &Identity) -> bool {
        !self.require_embedded_identity
            || profile.embedded_identities.is_empty()
            || profile.embeds_identity(&identity.sha1_fingerprint)
    }
}

pub fn build_selectable_groups(
    identities: &[Identity],
    profiles: &[Profile],
    target_bundle_ids: &[String],
) -> Vec<SelectableGroup> {
    GroupBuilder::default().build(identities, profiles, target_bundle_ids)
}
