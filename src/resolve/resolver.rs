use std::collections::BTreeMap;

use rootcause::prelude::*;
use tracing::{debug, info};

use crate::{
    CodesignError,
    material::{
        identity::Identity,
        profile::{ExportMethod, Profile, latest_per_name_and_bundle},
        team::profiles_by_team,
    },
    resolve::{
        archive::{Archive, Inventory, Target},
        builder::{ResolverBuilder, ResolverConfiguration},
        chooser::{ChoiceKind, ChoiceOption, ChoiceRequest, Chooser},
        filters::apply_filters,
        groups::{CodeSignGroup, GroupBuilder, SelectableGroup},
    },
};

pub struct Resolver {
    config: ResolverConfiguration,
    chooser: Box<dyn Chooser>,
}

impl Resolver {
    /// Construct a new `Resolver`
    ///
    /// See [`crate::resolve::builder::ResolverBuilder`] for a more convenient way to construct one.
    pub fn new(config: ResolverConfiguration, chooser: Box<dyn Chooser>) -> Self {
        Resolver { config, chooser }
    }

    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::new()
    }

    pub fn config(&self) -> &ResolverConfiguration {
        &self.config
    }

    pub fn chooser_mut(&mut self) -> &mut dyn Chooser {
        self.chooser.as_mut()
    }

    /// Groups that can sign every target for `method`, after keeping only the
    /// freshest profile per (bundle id, name) within each team and running the
    /// filter pipeline.
    pub fn candidate_groups(
        &self,
        identities: &[Identity],
        profiles: &[Profile],
        targets: &[Target],
        method: ExportMethod,
        archive_xcode_managed: bool,
    ) -> Vec<SelectableGroup> {
        let profiles: Vec<Profile> = profiles_by_team(profiles)
            .values()
            .flat_map(|bucket| latest_per_name_and_bundle(bucket))
            .collect();
        let bundle_ids: Vec<String> = targets.iter().map(|t| t.bundle_id.clone()).collect();

        let builder = GroupBuilder {
            require_embedded_identity: self.config.require_embedded_identity,
        };
        let groups = builder.build(identities, &profiles, &bundle_ids);

        apply_filters(
            &groups,
            &self.config.filters(method, archive_xcode_managed, targets),
        )
    }

    /// Load the installed material and resolve one group for `method`.
    pub fn resolve_for(
        &mut self,
        archive: &dyn Archive,
        inventory: &dyn Inventory,
        method: ExportMethod,
    ) -> Result<CodeSignGroup, Report> {
        let identities = inventory
            .installed_identities()
            .context("Failed to load installed signing identities")?;
        let profiles = inventory
            .installed_profiles()
            .context("Failed to load installed provisioning profiles")?;
        let targets = archive.targets();

        info!(
            "Looking for {} signing material for {} targets among {} identities and {} profiles",
            method,
            targets.len(),
            identities.len(),
            profiles.len()
        );

        let groups = self.candidate_groups(
            &identities,
            &profiles,
            &targets,
            method,
            archive.is_xcode_managed(),
        );
        let group = self.resolve(&groups)?;
        ensure_covers(&group, &targets)?;
        Ok(group)
    }

    pub fn resolve(&mut self, groups: &[SelectableGroup]) -> Result<CodeSignGroup, Report> {
        resolve(groups, self.chooser.as_mut())
    }
}

/// Narrow candidate groups down to one identity and one profile per bundle id.
///
/// Nothing is asked when a single unambiguous group remains. Otherwise the
/// chooser picks the identity, then a profile for every bundle id with more
/// than one candidate; profiles are offered latest expiry first.
pub fn resolve(
    groups: &[SelectableGroup],
    chooser: &mut dyn Chooser,
) -> Result<CodeSignGroup, Report> {
    let group = match groups {
        [] => bail!(CodesignError::NoCandidateGroups),
        [only] => only,
        _ => {
            info!("{} signing identities match, asking for one", groups.len());
            let request = ChoiceRequest {
                kind: ChoiceKind::Identity,
                options: groups
                    .iter()
                    .map(|g| ChoiceOption::for_identity(&g.identity))
                    .collect(),
            };
            &groups[pick(chooser, &request)?]
        }
    };

    if group.profiles.is_empty() {
        bail!(CodesignError::IncompleteSelection(format!(
            "{} has no profiles to sign with",
            group.identity.common_name
        )));
    }

    let mut profiles = BTreeMap::new();
    for (bundle_id, candidates) in &group.profiles {
        let profile = match candidates.as_slice() {
            [] => bail!(CodesignError::IncompleteSelection(format!(
                "{} has no profile for {}",
                group.identity.common_name, bundle_id
            ))),
            [only] => only,
            _ => {
                let mut sorted: Vec<&Profile> = candidates.iter().collect();
                sorted.sort_by(|a, b| b.expiration.cmp(&a.expiration));

                let request = ChoiceRequest {
                    kind: ChoiceKind::Profile {
                        bundle_id: bundle_id.clone(),
                    },
                    options: sorted.iter().map(|p| ChoiceOption::for_profile(p)).collect(),
                };
                sorted[pick(chooser, &request)?]
            }
        };

        if profile.team_id != group.identity.team_id {
            bail!(CodesignError::IncompleteSelection(format!(
                "Profile {} belongs to team {}, not {}",
                profile.label(),
                profile.team_id,
                group.identity.team_id
            )));
        }
        profiles.insert(bundle_id.clone(), profile.clone());
    }

    info!(
        "Selected {} with {} profiles",
        group.identity.common_name,
        profiles.len()
    );
    Ok(CodeSignGroup {
        identity: group.identity.clone(),
        profiles,
    })
}

/// Fail unless `group` holds a profile for every target.
pub(crate) fn ensure_covers(group: &CodeSignGroup, targets: &[Target]) -> Result<(), Report> {
    let missing: Vec<&str> = targets
        .iter()
        .map(|t| t.bundle_id.as_str())
        .filter(|bundle_id| group.profile_for(bundle_id).is_none())
        .collect();

    if !missing.is_empty() {
        bail!(CodesignError::IncompleteSelection(format!(
            "{} has no profile for {}",
            group.identity.common_name,
            missing.join(", ")
        )));
    }
    Ok(())
}

pub(crate) fn pick(chooser: &mut dyn Chooser, request: &ChoiceRequest) -> Result<usize, Report> {
    match chooser.choose(request) {
        Some(index) if index < request.options.len() => {
            debug!("{}: {}", request.kind, request.options[index].label);
            Ok(index)
        }
        Some(index) => bail!(CodesignError::ChoiceAborted(format!(
            "option {} is out of range ({})",
            index, request.kind
        ))),
        None => bail!(CodesignError::ChoiceAborted(request.kind.to_string())),
    }
}
