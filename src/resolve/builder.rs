use std::collections::BTreeMap;

use crate::{
    material::{identity::IdentityClassifier, profile::ExportMethod},
    resolve::{
        archive::Target,
        chooser::{Chooser, FirstOption},
        filters::GroupFilter,
        resolver::Resolver,
    },
};

/// What the resolver is allowed to pick from.
#[derive(Debug, Clone)]
pub struct ResolverConfiguration {
    /// Export method of the first round; the chooser is asked when unset
    pub export_method: Option<ExportMethod>,
    /// Overrides whether the archive was built with Xcode managed signing
    pub xcode_managed: Option<bool>,
    pub classifier: IdentityClassifier,
    pub team_id: Option<String>,
    pub excluded_profile_names: Vec<String>,
    pub require_embedded_identity: bool,
}

impl Default for ResolverConfiguration {
    fn default() -> Self {
        ResolverConfiguration {
            export_method: None,
            xcode_managed: None,
            classifier: IdentityClassifier::default(),
            team_id: None,
            excluded_profile_names: Vec::new(),
            require_embedded_identity: true,
        }
    }
}

impl ResolverConfiguration {
    /// The filter pipeline for one round, cheapest first
    pub fn filters(
        &self,
        method: ExportMethod,
        archive_xcode_managed: bool,
        targets: &[Target],
    ) -> Vec<GroupFilter> {
        let mut filters = vec![
            GroupFilter::ExportMethod {
                method,
                classifier: self.classifier.clone(),
            },
            GroupFilter::XcodeManaged(self.xcode_managed.unwrap_or(archive_xcode_managed)),
        ];

        if let Some(team_id) = &self.team_id {
            filters.push(GroupFilter::Team(team_id.clone()));
        }
        if !self.excluded_profile_names.is_empty() {
            filters.push(GroupFilter::ExcludeProfileNames(
                self.excluded_profile_names.clone(),
            ));
        }

        let required: BTreeMap<String, _> = targets
            .iter()
            .map(|t| (t.bundle_id.clone(), t.capabilities.clone()))
            .collect();
        filters.push(GroupFilter::Entitlements(required));

        filters
    }
}

pub struct ResolverBuilder {
    config: ResolverConfiguration,
    chooser: Box<dyn Chooser>,
}

impl Default for ResolverBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolverBuilder {
    pub fn new() -> Self {
        ResolverBuilder {
            config: ResolverConfiguration::default(),
            chooser: Box::new(FirstOption),
        }
    }

    pub fn export_method(mut self, method: ExportMethod) -> Self {
        self.config.export_method = Some(method);
        self
    }

    pub fn xcode_managed(mut self, managed: bool) -> Self {
        self.config.xcode_managed = Some(managed);
        self
    }

    /// Replace the common-name prefixes that mark distribution certificates
    pub fn distribution_markers(mut self, markers: Vec<String>) -> Self {
        self.config.classifier = IdentityClassifier::new(markers);
        self
    }

    pub fn team_id(mut self, team_id: &str) -> Self {
        self.config.team_id = Some(team_id.to_string());
        self
    }

    pub fn exclude_profile_name(mut self, name: &str) -> Self {
        self.config.excluded_profile_names.push(name.to_string());
        self
    }

    pub fn require_embedded_identity(mut self, require: bool) -> Self {
        self.config.require_embedded_identity = require;
        self
    }

    pub fn chooser(mut self, chooser: Box<dyn Chooser>) -> Self {
        self.chooser = chooser;
        self
    }

    pub fn build(self) -> Resolver {
        Resolver::new(self.config, self.chooser)
    }
}
