use std::collections::BTreeMap;
use std::fmt::Display;

use crate::material::{identity::Identity, profile::Profile};

/// A signing team, identified by its team identifier and display name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TeamKey(String);

impl TeamKey {
    pub fn new(team_id: &str, team_name: &str) -> Self {
        TeamKey(format!("{} - {}", team_id, team_name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for TeamKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Anything that belongs to exactly one signing team
pub trait TeamScoped {
    fn team_key(&self) -> TeamKey;
}

impl TeamScoped for Identity {
    fn team_key(&self) -> TeamKey {
        TeamKey::new(&self.team_id, &self.team_name)
    }
}

impl TeamScoped for Profile {
    fn team_key(&self) -> TeamKey {
        TeamKey::new(&self.team_id, &self.team_name)
    }
}

/// Bucket items by team. Items keep their input order within a bucket and
/// teams without items never appear.
pub fn by_team<T: TeamScoped + Clone>(items: &[T]) -> BTreeMap<TeamKey, Vec<T>> {
    let mut buckets: BTreeMap<TeamKey, Vec<T>> = BTreeMap::new();
    for item in items {
        buckets.entry(item.team_key()).or_default().push(item.clone());
    }
    buckets
}

pub fn identities_by_team(identities: &[Identity]) -> BTreeMap<TeamKey, Vec<Identity>> {
    by_team(identities)
}

pub fn profiles_by_team(profiles: &[Profile]) -> BTreeMap<TeamKey, Vec<Profile>> {
    by_team(profiles)
}
