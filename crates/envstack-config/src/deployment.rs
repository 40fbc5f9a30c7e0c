//! Top-level deployment configuration (TOML)

use crate::error::{ConfigError, ConfigResult};
use crate::profile::ServiceProfile;
use crate::table::EnvironmentTable;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Region hosting every primary partition
pub const DEFAULT_PRIMARY_REGION: &str = "us-east-1";

/// Everything assembly reads besides the account identifier.
///
/// ```toml
/// primary_region = "us-east-1"
///
/// [service]
/// name = "django-api"
///
/// [environments.uat]
/// cpu = 256
/// memory = 512
/// desired_count = 1
/// min_count = 1
/// max_count = 2
/// db_instance_class = "t3.small"
/// enable_dr = true
/// dr_region = "us-west-2"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentConfig {
    /// Primary region for every environment
    #[serde(default = "default_primary_region")]
    pub primary_region: String,
    /// Application deployed into every environment
    #[serde(default)]
    pub service: ServiceProfile,
    /// Environment table; the built-in table when omitted
    #[serde(default = "EnvironmentTable::builtin")]
    pub environments: EnvironmentTable,
}

/// A region code must be non-empty and carry no surrounding whitespace.
pub fn validate_primary_region(region: &str) -> ConfigResult<()> {
    if region.is_empty() || region.trim() != region {
        return Err(ConfigError::InvalidPrimaryRegion(region.to_string()));
    }
    Ok(())
}

fn default_primary_region() -> String {
    DEFAULT_PRIMARY_REGION.to_string()
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            primary_region: default_primary_region(),
            service: ServiceProfile::default(),
            environments: EnvironmentTable::builtin(),
        }
    }
}

impl DeploymentConfig {
    /// Parse from TOML text
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from a TOML file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    /// Replace the environment table
    pub fn with_environments(mut self, environments: EnvironmentTable) -> Self {
        self.environments = environments;
        self
    }

    /// Every problem in the profile and the table.
    pub fn violations(&self) -> Vec<ConfigError> {
        let mut violations = Vec::new();
        if let Err(e) = validate_primary_region(&self.primary_region) {
            violations.push(e);
        }
        if let Err(e) = self.service.validate() {
            violations.push(e);
        }
        violations.extend(self.environments.violations(&self.primary_region));
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_file_is_empty() {
        let config = DeploymentConfig::from_toml_str("").unwrap();
        assert_eq!(config, DeploymentConfig::default());
        assert_eq!(config.environments.len(), 4);
        assert!(config.violations().is_empty());
    }

    #[test]
    fn test_parse_environment_table() {
        let config = DeploymentConfig::from_toml_str(
            r#"
primary_region = "eu-central-1"

[service]
name = "billing-api"
container_port = 9000

[environments.uat]
cpu = 256
memory = 512
desired_count = 1
min_count = 1
max_count = 2
db_instance_class = "t3.small"
enable_dr = true
dr_region = "eu-west-1"
vpc_cidr = "10.20.0.0/16"
"#,
        )
        .unwrap();

        assert_eq!(config.primary_region, "eu-central-1");
        assert_eq!(config.service.name, "billing-api");
        assert_eq!(config.service.container_port, 9000);
        // Unspecified profile fields keep their defaults
        assert_eq!(config.service.health_check_path, "/health/");
        assert_eq!(config.environments.len(), 1);

        let uat = config.environments.get("uat").unwrap();
        assert!(uat.enable_dr);
        assert_eq!(uat.dr_region, "eu-west-1");
        assert_eq!(uat.nat_gateways, 1);
        assert_eq!(uat.vpc_cidr.to_string(), "10.20.0.0/16");
        assert!(config.violations().is_empty());
    }

    #[test]
    fn test_parse_errors() {
        let err = DeploymentConfig::from_toml_str(
            r#"
[environments.uat]
cpu = 256
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = DeploymentConfig::from_toml_str("regions = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = DeploymentConfig::load(Path::new("/nonexistent/envstack.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_violations_cover_profile_and_table() {
        let mut config = DeploymentConfig::default();
        config.service.container_port = 0;
        config.environments.insert(
            "qa",
            crate::EnvironmentConfig::new(256, 512, 1, 1, 2, "t3.small").with_dr("us-east-1"),
        );
        let violations = config.violations();
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], ConfigError::InvalidServiceProfile(_)));
        assert!(matches!(violations[1], ConfigError::DrRegionMatchesPrimary { .. }));
    }

    #[test]
    fn test_primary_region_must_be_clean() {
        assert!(validate_primary_region("us-east-1").is_ok());
        assert!(matches!(
            validate_primary_region(""),
            Err(ConfigError::InvalidPrimaryRegion(_))
        ));
        assert!(matches!(
            validate_primary_region("us-east-1 "),
            Err(ConfigError::InvalidPrimaryRegion(_))
        ));

        let config = DeploymentConfig::from_toml_str("primary_region = \"\"").unwrap();
        let violations = config.violations();
        assert!(matches!(
            violations.as_slice(),
            [ConfigError::InvalidPrimaryRegion(_)]
        ));

        let padded = DeploymentConfig::from_toml_str("primary_region = \"us-east-1 \"")
            .unwrap()
            .with_environments(crate::EnvironmentTable::default().with(
                "uat",
                crate::EnvironmentConfig::new(256, 512, 1, 1, 2, "t3.small").with_dr("us-east-1"),
            ));
        let violations = padded.violations();
        assert_eq!(violations.len(), 2);
        assert!(matches!(violations[0], ConfigError::InvalidPrimaryRegion(_)));
        assert!(matches!(violations[1], ConfigError::DrRegionMatchesPrimary { .. }));
    }
}
