use std::fmt::Display;

use crate::{
    material::{identity::Identity, profile::{ExportMethod, Profile}},
    resolve::groups::CodeSignGroup,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChoiceKind {
    ExportMethod,
    Identity,
    Profile { bundle_id: String },
}

impl Display for ChoiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChoiceKind::ExportMethod => write!(f, "Select an export method"),
            ChoiceKind::Identity => write!(f, "Select a signing identity"),
            ChoiceKind::Profile { bundle_id } => {
                write!(f, "Select a provisioning profile for {}", bundle_id)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceOption {
    /// Stable identifier: serial number, profile UUID or export method name
    pub key: String,
    pub label: String,
}

impl ChoiceOption {
    pub fn for_identity(identity: &Identity) -> Self {
        ChoiceOption {
            key: identity.serial_number.clone(),
            label: identity.label(),
        }
    }

    pub fn for_profile(profile: &Profile) -> Self {
        ChoiceOption {
            key: profile.uuid.clone(),
            label: profile.label(),
        }
    }

    pub fn for_export_method(method: ExportMethod) -> Self {
        ChoiceOption {
            key: method.as_str().to_string(),
            label: method.as_str().to_string(),
        }
    }
}

/// One decision the resolver cannot make on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChoiceRequest {
    pub kind: ChoiceKind,
    pub options: Vec<ChoiceOption>,
}

/// Makes the decisions that would otherwise be interactive prompts.
///
/// `choose` returns the index of the picked option, or `None` to abort the
/// current round. The same options in the same order must lead to the same
/// answer for resolution to be reproducible.
pub trait Chooser {
    fn choose(&mut self, request: &ChoiceRequest) -> Option<usize>;

    /// Asked after each round; `true` starts another round
    fn collect_another(&mut self, _collected: &[CodeSignGroup]) -> bool {
        false
    }

    /// Asked when no candidates were found; `true` reloads the installed
    /// material and tries the same export method again
    fn retry_discovery(&mut self, _method: ExportMethod) -> bool {
        false
    }
}

impl<F> Chooser for F
where
    F: FnMut(&ChoiceRequest) -> Option<usize>,
{
    fn choose(&mut self, request: &ChoiceRequest) -> Option<usize> {
        self(request)
    }
}

/// Always takes the first option, which is the most recent profile when
/// choosing profiles. Never asks for another round.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstOption;

impl Chooser for FirstOption {
    fn choose(&mut self, request: &ChoiceRequest) -> Option<usize> {
        if request.options.is_empty() {
            None
        } else {
            Some(0)
        }
    }
}
