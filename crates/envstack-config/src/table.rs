//! Environment config table

use crate::environment::EnvironmentConfig;
use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};

/// Read-only mapping from environment name to its config.
///
/// Iteration order is lexicographic by name, which keeps assembly deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnvironmentTable {
    entries: BTreeMap<String, EnvironmentConfig>,
}

impl EnvironmentTable {
    /// Empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference environments. All single-region, DR disabled.
    pub fn builtin() -> Self {
        Self::new()
            .with(
                "production",
                EnvironmentConfig::new(1024, 2048, 3, 2, 10, "r6g.large").with_nat_gateways(2),
            )
            .with("sandbox", EnvironmentConfig::new(1024, 2048, 2, 1, 5, "r6g.medium"))
            .with("demo", EnvironmentConfig::new(512, 1024, 1, 1, 2, "r6g.medium"))
            .with("uat", EnvironmentConfig::new(256, 512, 1, 1, 2, "t3.small"))
    }

    /// Add or replace an entry
    pub fn with(mut self, name: &str, config: EnvironmentConfig) -> Self {
        self.insert(name, config);
        self
    }

    /// Add or replace an entry, returning the previous config
    pub fn insert(&mut self, name: &str, config: EnvironmentConfig) -> Option<EnvironmentConfig> {
        self.entries.insert(name.to_string(), config)
    }

    /// Look up an environment
    pub fn get(&self, name: &str) -> Option<&EnvironmentConfig> {
        self.entries.get(name)
    }

    /// Iterate entries in name order
    pub fn iter(&self) -> btree_map::Iter<'_, String, EnvironmentConfig> {
        self.entries.iter()
    }

    /// Environment names in iteration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every violation in the table, in iteration order.
    pub fn violations(&self, primary_region: &str) -> Vec<ConfigError> {
        self.iter()
            .filter_map(|(name, config)| validate_entry(name, config, primary_region).err())
            .collect()
    }
}

/// Validate one entry, including its name.
pub fn validate_entry(
    name: &str,
    config: &EnvironmentConfig,
    primary_region: &str,
) -> ConfigResult<()> {
    validate_name(name)?;
    config.validate(name, primary_region)
}

fn validate_name(name: &str) -> ConfigResult<()> {
    let well_formed = !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !well_formed {
        return Err(ConfigError::InvalidEnvironmentName(name.to_string()));
    }
    // `<env>-dr` is the label of <env>'s DR partition
    if name.ends_with("-dr") {
        return Err(ConfigError::ReservedSuffix(name.to_string()));
    }
    Ok(())
}

impl<'a> IntoIterator for &'a EnvironmentTable {
    type Item = (&'a String, &'a EnvironmentConfig);
    type IntoIter = btree_map::Iter<'a, String, EnvironmentConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<(String, EnvironmentConfig)> for EnvironmentTable {
    fn from_iter<I: IntoIterator<Item = (String, EnvironmentConfig)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table() {
        let table = EnvironmentTable::builtin();
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["demo", "production", "sandbox", "uat"]);
        assert!(table.violations("us-east-1").is_empty());

        let production = table.get("production").unwrap();
        assert_eq!(production.desired_count, 3);
        assert_eq!(production.nat_gateways, 2);
        assert!(!production.enable_dr);
        assert!(table.get("staging").is_none());
    }

    #[test]
    fn test_keys_are_unique() {
        let mut table = EnvironmentTable::builtin();
        let previous = table.insert("uat", EnvironmentConfig::new(512, 1024, 1, 1, 4, "t3.medium"));
        assert!(previous.is_some());
        assert_eq!(table.len(), 4);
        assert_eq!(table.get("uat").unwrap().max_count, 4);
    }

    #[test]
    fn test_violations_name_each_environment() {
        let table = EnvironmentTable::builtin()
            .with("broken", EnvironmentConfig::new(256, 512, 1, 2, 1, "t3.small"))
            .with("Bad Name", EnvironmentConfig::new(256, 512, 1, 1, 1, "t3.small"));

        let violations = table.violations("us-east-1");
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].environment(), Some("Bad Name"));
        assert_eq!(violations[1].environment(), Some("broken"));
    }

    #[test]
    fn test_reserved_dr_suffix() {
        let cfg = EnvironmentConfig::new(256, 512, 1, 1, 1, "t3.small");
        assert!(matches!(
            validate_entry("prod-dr", &cfg, "us-east-1"),
            Err(ConfigError::ReservedSuffix(_))
        ));
        assert!(validate_entry("prod-drill", &cfg, "us-east-1").is_ok());
    }
}
