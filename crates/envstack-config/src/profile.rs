//! Application profile deployed into every environment

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The application service and the database it expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceProfile {
    /// Service name, used in stack ids (`<env>-app-<name>`)
    pub name: String,
    /// Human-readable name used in stack descriptions
    pub display_name: String,
    /// Image registry name prefix (`<prefix>-<env-label>`)
    pub repository_prefix: String,
    /// Image tag the service runs
    pub image_tag: String,
    /// Port the container listens on
    pub container_port: u16,
    /// Plain environment variables for every task
    pub environment: BTreeMap<String, String>,
    /// Variable receiving the database credential
    pub credential_variable: String,
    /// Load balancer health-check path
    pub health_check_path: String,
    /// Database expected by the service
    pub database: DatabaseSettings,
}

impl Default for ServiceProfile {
    fn default() -> Self {
        let mut environment = BTreeMap::new();
        environment.insert(
            "DJANGO_SETTINGS_MODULE".to_string(),
            "config.settings.production".to_string(),
        );
        environment.insert("ALLOWED_HOSTS".to_string(), "*".to_string());

        Self {
            name: "django-api".to_string(),
            display_name: "Django API".to_string(),
            repository_prefix: "django".to_string(),
            image_tag: "latest".to_string(),
            container_port: 8000,
            environment,
            credential_variable: "DATABASE_URL".to_string(),
            health_check_path: "/health/".to_string(),
            database: DatabaseSettings::default(),
        }
    }
}

impl ServiceProfile {
    /// Stack segment for the service stack
    pub fn stack_segment(&self) -> String {
        format!("app-{}", self.name)
    }

    /// Check the profile is usable
    pub fn validate(&self) -> ConfigResult<()> {
        if !is_dns_label(&self.name) {
            return Err(invalid(format!("service name {:?} is not a DNS label", self.name)));
        }
        if self.display_name.trim().is_empty() {
            return Err(invalid("display name is empty".into()));
        }
        if !is_dns_label(&self.repository_prefix) {
            return Err(invalid(format!(
                "repository prefix {:?} is not a DNS label",
                self.repository_prefix
            )));
        }
        if self.image_tag.is_empty() {
            return Err(invalid("image tag is empty".into()));
        }
        if self.container_port == 0 {
            return Err(invalid("container port must be non-zero".into()));
        }
        if !self.health_check_path.starts_with('/') {
            return Err(invalid(format!(
                "health check path {:?} must start with '/'",
                self.health_check_path
            )));
        }
        if self.credential_variable.is_empty() {
            return Err(invalid("credential variable is empty".into()));
        }
        if self.environment.contains_key(&self.credential_variable) {
            return Err(invalid(format!(
                "{} is reserved for the database credential",
                self.credential_variable
            )));
        }
        self.database.validate()
    }
}

/// Managed database settings shared by every environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseSettings {
    /// Aurora PostgreSQL engine version
    pub engine_version: String,
    /// Listener port
    pub port: u16,
    /// Admin user for the generated credential
    pub admin_user: String,
    /// Database created at launch
    pub database_name: String,
    /// Automated backup retention
    pub backup_retention_days: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine_version: "16.4".to_string(),
            port: 5432,
            admin_user: "postgres".to_string(),
            database_name: "django".to_string(),
            backup_retention_days: 7,
        }
    }
}

impl DatabaseSettings {
    fn validate(&self) -> ConfigResult<()> {
        if self.port == 0 {
            return Err(invalid("database port must be non-zero".into()));
        }
        if self.admin_user.is_empty() || self.database_name.is_empty() {
            return Err(invalid("database admin user and name are required".into()));
        }
        if !(1..=35).contains(&self.backup_retention_days) {
            return Err(invalid(format!(
                "backup retention must be 1..=35 days (got {})",
                self.backup_retention_days
            )));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::InvalidServiceProfile(message)
}

fn is_dns_label(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 63
        && !value.starts_with('-')
        && !value.ends_with('-')
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = ServiceProfile::default();
        assert!(profile.validate().is_ok());
        assert_eq!(profile.stack_segment(), "app-django-api");
        assert_eq!(profile.database.port, 5432);
        assert_eq!(profile.environment["ALLOWED_HOSTS"], "*");
    }

    #[test]
    fn test_credential_variable_is_reserved() {
        let mut profile = ServiceProfile::default();
        profile
            .environment
            .insert("DATABASE_URL".into(), "postgres://inline".into());
        assert!(matches!(
            profile.validate(),
            Err(ConfigError::InvalidServiceProfile(_))
        ));
    }

    #[test]
    fn test_rejects_bad_names_and_ranges() {
        let profile = ServiceProfile {
            name: "Django API".into(),
            ..Default::default()
        };
        assert!(profile.validate().is_err());

        let mut profile = ServiceProfile::default();
        profile.database.backup_retention_days = 0;
        assert!(profile.validate().is_err());

        let profile = ServiceProfile {
            health_check_path: "health".into(),
            ..Default::default()
        };
        assert!(profile.validate().is_err());
    }
}
