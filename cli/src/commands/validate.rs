//! Validate command

use super::Session;
use anyhow::{bail, Result};
use colored::Colorize;
use envstack_config::{validate_entry, ConfigError, DeploymentConfig};
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Tabled, Serialize)]
pub struct ValidationRow {
    pub environment: String,
    pub regions: String,
    pub status: String,
    pub detail: String,
}

pub fn rows(deployment: &DeploymentConfig) -> Vec<ValidationRow> {
    let primary = &deployment.primary_region;
    let mut rows = Vec::new();

    let profile = deployment.service.validate();
    rows.push(ValidationRow {
        environment: format!("(service {})", deployment.service.name),
        regions: primary.clone(),
        status: status(&profile).into(),
        detail: detail(&profile),
    });

    for (name, config) in deployment.environments.iter() {
        let result = validate_entry(name, config, primary);
        let regions = if config.enable_dr {
            format!("{} + {}", primary, config.dr_region)
        } else {
            primary.clone()
        };
        rows.push(ValidationRow {
            environment: name.clone(),
            regions,
            status: status(&result).into(),
            detail: detail(&result),
        });
    }
    rows
}

fn status(result: &Result<(), ConfigError>) -> &'static str {
    match result {
        Ok(()) => "ok",
        Err(_) => "invalid",
    }
}

fn detail(result: &Result<(), ConfigError>) -> String {
    match result {
        Ok(()) => String::new(),
        Err(e) => e.to_string(),
    }
}

pub fn handle(session: &Session) -> Result<()> {
    session.format.print_rows(&rows(&session.deployment))?;

    let violations = session.deployment.violations();
    if violations.is_empty() {
        eprintln!(
            "{} {} environment(s) valid",
            "ok:".green().bold(),
            session.deployment.environments.len()
        );
        return Ok(());
    }
    bail!("{} configuration violation(s)", violations.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use envstack_config::EnvironmentConfig;

    #[test]
    fn test_rows_flag_invalid_entries() {
        let mut deployment = DeploymentConfig::default();
        deployment
            .environments
            .insert("qa", EnvironmentConfig::new(256, 512, 3, 1, 2, "t3.small"));
        deployment
            .environments
            .insert("uat", EnvironmentConfig::new(256, 512, 1, 1, 2, "t3.small").with_dr("us-west-2"));

        let rows = rows(&deployment);
        assert_eq!(rows.len(), 1 + deployment.environments.len());
        assert_eq!(rows[0].status, "ok");

        let qa = rows.iter().find(|r| r.environment == "qa").unwrap();
        assert_eq!(qa.status, "invalid");
        assert!(qa.detail.contains("min <= desired <= max"));

        let uat = rows.iter().find(|r| r.environment == "uat").unwrap();
        assert_eq!(uat.status, "ok");
        assert_eq!(uat.regions, "us-east-1 + us-west-2");
    }
}
