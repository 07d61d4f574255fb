use rootcause::prelude::*;
use tracing::{info, warn};

use crate::{
    CodesignError,
    material::profile::ExportMethod,
    resolve::{
        archive::{Archive, Inventory},
        chooser::{ChoiceKind, ChoiceOption, ChoiceRequest},
        groups::CodeSignGroup,
        resolver::{Resolver, pick},
    },
};

/// Collects code sign groups round after round until the chooser is done.
///
/// Each round resolves one group for one export method. A round whose
/// choice is aborted yields nothing but does not end the session; a round
/// with no candidates ends it unless the chooser wants to retry.
pub struct Collector<'a> {
    resolver: Resolver,
    archive: &'a dyn Archive,
    inventory: &'a dyn Inventory,
}

impl<'a> Collector<'a> {
    pub fn new(resolver: Resolver, archive: &'a dyn Archive, inventory: &'a dyn Inventory) -> Self {
        Collector {
            resolver,
            archive,
            inventory,
        }
    }

    pub fn collect(&mut self) -> Result<Vec<CodeSignGroup>, Report> {
        let mut collected: Vec<CodeSignGroup> = Vec::new();
        let mut next_method = self.resolver.config().export_method;

        loop {
            let method = match next_method.take() {
                Some(method) => Some(method),
                None => self.choose_export_method()?,
            };

            if let Some(method) = method {
                match self.resolver.resolve_for(self.archive, self.inventory, method) {
                    Ok(group) => {
                        info!(
                            "Collected {} code sign group for {}",
                            method, group.identity.common_name
                        );
                        collected.push(group);
                    }
                    Err(report) => match CodesignError::find_in(&report) {
                        Some(CodesignError::NoCandidateGroups) => {
                            warn!("No {} signing identity and profiles found", method);
                            if self.resolver.chooser_mut().retry_discovery(method) {
                                next_method = Some(method);
                                continue;
                            }
                            if collected.is_empty() {
                                return Err(report);
                            }
                            return Ok(collected);
                        }
                        Some(CodesignError::ChoiceAborted(reason)) => {
                            info!("Round aborted: {}", reason);
                        }
                        _ => return Err(report),
                    },
                }
            }

            if !self.resolver.chooser_mut().collect_another(&collected) {
                break;
            }
        }

        Ok(collected)
    }

    /// `None` when the chooser declines to pick a method
    fn choose_export_method(&mut self) -> Result<Option<ExportMethod>, Report> {
        let request = ChoiceRequest {
            kind: ChoiceKind::ExportMethod,
            options: ExportMethod::ALL
                .into_iter()
                .map(ChoiceOption::for_export_method)
                .collect(),
        };

        match pick(self.resolver.chooser_mut(), &request) {
            Ok(index) => Ok(Some(ExportMethod::ALL[index])),
            Err(report) => match CodesignError::find_in(&report) {
                Some(CodesignError::ChoiceAborted(reason)) => {
                    info!("Round aborted: {}", reason);
                    Ok(None)
                }
                _ => Err(report),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Chooser, Identity, Profile, material::capabilities::CapabilitySet};
    use std::{
        cell::{Cell, RefCell},
        collections::BTreeMap,
        time::{Duration, UNIX_EPOCH},
    };

    struct App;

    impl Archive for App {
        fn bundle_id_entitlements_map(&self) -> BTreeMap<String, CapabilitySet> {
            let mut map = BTreeMap::new();
            map.insert("com.acme.app".to_string(), CapabilitySet::new());
            map
        }

        fn is_xcode_managed(&self) -> bool {
            false
        }
    }

    #[derive(Default)]
    struct Keychain {
        profiles: RefCell<Vec<Profile>>,
        loads: Cell<usize>,
    }

    impl Inventory for Keychain {
        fn installed_identities(&self) -> Result<Vec<Identity>, Report> {
            self.loads.set(self.loads.get() + 1);
            Ok(vec![
                Identity::new("D1", "iPhone Developer: Jane", "T1", "Team", "D1"),
                Identity::new("S1", "iPhone Distribution: Acme", "T1", "Team", "S1"),
            ])
        }

        fn installed_profiles(&self) -> Result<Vec<Profile>, Report> {
            Ok(self.profiles.borrow().clone())
        }
    }

    fn profile(uuid: &str, method: ExportMethod) -> Profile {
        Profile {
            uuid: uuid.to_string(),
            name: format!("{uuid} profile"),
            bundle_id: "com.acme.*".to_string(),
            team_id: "T1".to_string(),
            team_name: "Team".to_string(),
            expiration: UNIX_EPOCH + Duration::from_secs(1_000),
            capabilities: CapabilitySet::new(),
            export_method: method,
            xcode_managed: false,
            embedded_identities: vec![],
        }
    }

    /// Answers export method prompts from a script and counts rounds
    struct Scripted {
        methods: Vec<ExportMethod>,
        rounds: usize,
        retries: usize,
    }

    impl Chooser for Scripted {
        fn choose(&mut self, request: &ChoiceRequest) -> Option<usize> {
            match request.kind {
                ChoiceKind::ExportMethod => {
                    let method = self.methods.get(self.rounds).copied()?;
                    request.options.iter().position(|o| o.key == method.as_str())
                }
                _ => Some(0),
            }
        }

        fn collect_another(&mut self, _collected: &[CodeSignGroup]) -> bool {
            self.rounds += 1;
            self.rounds < self.methods.len()
        }

        fn retry_discovery(&mut self, _method: ExportMethod) -> bool {
            if self.retries == 0 {
                return false;
            }
            self.retries -= 1;
            true
        }
    }

    fn scripted(methods: Vec<ExportMethod>, retries: usize) -> Box<Scripted> {
        Box::new(Scripted {
            methods,
            rounds: 0,
            retries,
        })
    }

    #[test]
    fn collects_one_group_per_round() {
        let keychain = Keychain::default();
        keychain.profiles.borrow_mut().extend([
            profile("DEV", ExportMethod::Development),
            profile("STORE", ExportMethod::AppStore),
        ]);

        let resolver = Resolver::builder()
            .chooser(scripted(vec![ExportMethod::Development, ExportMethod::AppStore], 0))
            .build();
        let groups = Collector::new(resolver, &App, &keychain).collect().unwrap();

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].identity.serial_number, "D1");
        assert_eq!(groups[0].profile_for("com.acme.app").unwrap().uuid, "DEV");
        assert_eq!(groups[1].identity.serial_number, "S1");
        assert_eq!(groups[1].export_method(), Some(ExportMethod::AppStore));
    }

    #[test]
    fn configured_method_skips_first_prompt() {
        let keychain = Keychain::default();
        keychain
            .profiles
            .borrow_mut()
            .push(profile("ADHOC", ExportMethod::AdHoc));

        let no_method_prompt = |request: &ChoiceRequest| -> Option<usize> {
            assert_ne!(request.kind, ChoiceKind::ExportMethod);
            Some(0)
        };
        let resolver = Resolver::builder()
            .export_method(ExportMethod::AdHoc)
            .chooser(Box::new(no_method_prompt))
            .build();
        let groups = Collector::new(resolver, &App, &keychain).collect().unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].profile_for("com.acme.app").unwrap().uuid, "ADHOC");
    }

    #[test]
    fn no_candidates_without_retry_fails() {
        let keychain = Keychain::default();
        let resolver = Resolver::builder()
            .export_method(ExportMethod::Enterprise)
            .build();

        let err = Collector::new(resolver, &App, &keychain).collect().unwrap_err();
        assert_eq!(
            CodesignError::find_in(&err),
            Some(&CodesignError::NoCandidateGroups)
        );
        assert_eq!(keychain.loads.get(), 1);
    }

    #[test]
    fn retry_reloads_inventory() {
        let keychain = Keychain::default();
        let resolver = Resolver::builder()
            .export_method(ExportMethod::Enterprise)
            .chooser(scripted(vec![], 2))
            .build();

        let err = Collector::new(resolver, &App, &keychain).collect().unwrap_err();
        assert!(CodesignError::find_in(&err).is_some());
        assert_eq!(keychain.loads.get(), 3);
    }

    #[test]
    fn declined_export_method_ends_round_without_group() {
        let keychain = Keychain::default();
        keychain
            .profiles
            .borrow_mut()
            .push(profile("DEV", ExportMethod::Development));

        let resolver = Resolver::builder().chooser(scripted(vec![], 0)).build();
        let groups = Collector::new(resolver, &App, &keychain).collect().unwrap();

        assert!(groups.is_empty());
        assert_eq!(keychain.loads.get(), 0);
    }
}
