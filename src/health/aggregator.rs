//! Min-aggregation of health checks
//!
//! Every key (node name or service instance id) gets the worst level among
//! its checks. Keys without any check read as `NoCheckDefined`, which is
//! distinct from "all checks passing".

use std::collections::HashMap;

use crate::discovery::Check;

use super::level::{Bounded, HealthLevel};

/// Health level per key, left-joined against "no check defined"
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthIndex {
    levels: HashMap<String, HealthLevel>,
}

impl HealthIndex {
    /// Level of `key`, `NoCheckDefined` if no check was indexed for it
    pub fn level(&self, key: &str) -> HealthLevel {
        self.levels
            .get(key)
            .copied()
            .unwrap_or(HealthLevel::NoCheckDefined)
    }

    /// Whether at least one check was indexed for `key`
    pub fn contains(&self, key: &str) -> bool {
        self.levels.contains_key(key)
    }

    /// Number of keys with at least one check
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, HealthLevel)> {
        self.levels.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

/// Index checks by `key_of`, keeping the minimum level per key
pub fn index_by_min_health<'a, I, F>(checks: I, key_of: F) -> HealthIndex
where
    I: IntoIterator<Item = &'a Check>,
    F: Fn(&'a Check) -> &'a str,
{
    let mut acc: HashMap<&'a str, Bounded> = HashMap::new();
    for check in checks {
        let level = Bounded::from(HealthLevel::for_status(check.status));
        let slot = acc.entry(key_of(check)).or_insert(Bounded::Infinity);
        *slot = (*slot).min(level);
    }

    // Every accumulated slot has seen at least one check, so no bound survives
    let levels = acc
        .into_iter()
        .filter_map(|(key, bounded)| bounded.level().map(|level| (key.to_string(), level)))
        .collect();

    HealthIndex { levels }
}
