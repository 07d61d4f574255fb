use std::collections::BTreeMap;

use tracing::debug;

use crate::material::{
    capabilities::{CapabilitySet, is_compatible, missing_capabilities},
    identity::{Identity, IdentityClassifier},
    profile::{ExportMethod, Profile},
};
use crate::resolve::groups::SelectableGroup;

/// A narrowing step over selectable groups.
///
/// Every filter removes candidates (or whole groups) and never adds any, and
/// a group left without candidates for some bundle id is dropped.
#[derive(Debug, Clone)]
pub enum GroupFilter {
    /// Profiles must grant what each target requires
    Entitlements(BTreeMap<String, CapabilitySet>),
    /// Identity class and profile type must fit the export method
    ExportMethod {
        method: ExportMethod,
        classifier: IdentityClassifier,
    },
    /// Profiles must be (or not be) Xcode managed
    XcodeManaged(bool),
    /// Only identities of this team id
    Team(String),
    /// Profiles with these names are never offered
    ExcludeProfileNames(Vec<String>),
}

impl GroupFilter {
    pub fn name(&self) -> &'static str {
        match self {
            GroupFilter::Entitlements(_) => "entitlements",
            GroupFilter::ExportMethod { .. } => "export method",
            GroupFilter::XcodeManaged(_) => "xcode managed",
            GroupFilter::Team(_) => "team",
            GroupFilter::ExcludeProfileNames(_) => "excluded profile names",
        }
    }

    pub fn apply(&self, groups: &[SelectableGroup]) -> Vec<SelectableGroup> {
        match self {
            GroupFilter::Entitlements(required) => {
                narrow(groups, |_| true, |bundle_id, profile| {
                    let Some(required) = required.get(bundle_id) else {
                        return true;
                    };
                    let compatible = is_compatible(required, &profile.capabilities);
                    if !compatible {
                        debug!(
                            "Profile {} is missing capabilities for {}: {:?}",
                            profile.label(),
                            bundle_id,
                            missing_capabilities(required, &profile.capabilities)
                        );
                    }
                    compatible
                })
            }
            GroupFilter::ExportMethod { method, classifier } => {
                let class = method.identity_class();
                narrow(
                    groups,
                    |identity| classifier.class_of(identity) == class,
                    |_, profile| profile.export_method == *method,
                )
            }
            GroupFilter::XcodeManaged(managed) => {
                narrow(groups, |_| true, |_, profile| profile.xcode_managed == *managed)
            }
            GroupFilter::Team(team_id) => {
                narrow(groups, |identity| &identity.team_id == team_id, |_, _| true)
            }
            GroupFilter::ExcludeProfileNames(names) => {
                narrow(groups, |_| true, |_, profile| !names.contains(&profile.name))
            }
        }
    }
}

/// Apply filters in order, stopping early once nothing is left.
pub fn apply_filters(groups: &[SelectableGroup], filters: &[GroupFilter]) -> Vec<SelectableGroup> {
    let mut remaining = groups.to_vec();
    for filter in filters {
        if remaining.is_empty() {
            break;
        }
        let before = remaining.len();
        remaining = filter.apply(&remaining);
        debug!(
            "{} filter kept {} of {} groups",
            filter.name(),
            remaining.len(),
            before
        );
    }
    remaining
}

fn narrow(
    groups: &[SelectableGroup],
    keep_identity: impl Fn(&Identity) -> bool,
    keep_profile: impl Fn(&str, &Profile) -> bool,
) -> Vec<SelectableGroup> {
    groups
        .iter()
        .filter(|group| keep_identity(&group.identity))
        .filter_map(|group| {
            let mut profiles = BTreeMap::new();
            for (bundle_id, candidates) in &group.profiles {
                let kept: Vec<Profile> = candidates
                    .iter()
                    .filter(|p| keep_profile(bundle_id.as_str(), *p))
                    .cloned()
                    .collect();
                if kept.is_empty() {
                    return None;
                }
                profiles.insert(bundle_id.clone(), kept);
            }
            Some(SelectableGroup {
                identity: group.identity.clone(),
                profiles,
            })
        })
        .collect()
}
