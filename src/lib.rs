pub mod material;
pub mod resolve;
pub mod util;

pub use material::{
    capabilities::{CapabilitySet, is_compatible, missing_capabilities},
    identity::{Identity, IdentityClass, IdentityClassifier},
    profile::{ExportMethod, Profile, bundle_id_matches, latest_per_name_and_bundle},
    team::{TeamKey, identities_by_team, profiles_by_team},
};
pub use resolve::{
    archive::{Archive, Inventory, Target},
    builder::{ResolverBuilder, ResolverConfiguration},
    chooser::{ChoiceKind, ChoiceOption, ChoiceRequest, Chooser, FirstOption},
    collector::Collector,
    filters::{GroupFilter, apply_filters},
    groups::{CodeSignGroup, GroupBuilder, SelectableGroup, build_selectable_groups},
    resolver::{Resolver, resolve},
};

use rootcause::Report;
use thiserror::Error as ThisError;

#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum CodesignError {
    #[error("No signing identity and provisioning profile combination satisfies every target")]
    NoCandidateGroups,
    #[error("Incomplete selection: {0}")]
    IncompleteSelection(String),
    #[error("Selection aborted: {0}")]
    ChoiceAborted(String),
    #[error("Invalid provisioning profile: {0}")]
    InvalidProfile(String),
}

impl CodesignError {
    /// Find the first `CodesignError` anywhere in a report tree
    pub fn find_in(report: &Report) -> Option<&CodesignError> {
        report
            .iter_reports()
            .find_map(|node| node.downcast_current_context::<CodesignError>())
    }
}
