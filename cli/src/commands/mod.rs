//! CLI Commands

pub mod graph;
pub mod outputs;
pub mod profile;
pub mod stacks;
pub mod synth;
pub mod validate;

use crate::output::OutputFormat;
use anyhow::{bail, Context, Result};
use colored::Colorize;
use envstack_config::{DeploymentConfig, EnvironmentTable};
use envstack_provision::DeclarativeProvisioner;
use envstack_topology::{Assembler, Assembly};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs, resolved once at process entry.
pub struct Session {
    pub deployment: DeploymentConfig,
    pub account: String,
    pub format: OutputFormat,
    pub parallel: bool,
}

impl Session {
    pub fn new(
        config_path: Option<&Path>,
        environments: &[String],
        account: String,
        format: OutputFormat,
        parallel: bool,
    ) -> Result<Self> {
        let mut deployment = match config_path {
            Some(path) => DeploymentConfig::load(path)
                .with_context(|| format!("loading deployment config {}", path.display()))?,
            None => DeploymentConfig::default(),
        };
        if !environments.is_empty() {
            deployment.environments = select(&deployment.environments, environments)?;
        }
        debug!(
            "Session: {} environment(s), primary region {}, account {:?}",
            deployment.environments.len(),
            deployment.primary_region,
            account
        );
        Ok(Self {
            deployment,
            account,
            format,
            parallel,
        })
    }

    pub fn assembler(&self) -> Result<Assembler> {
        Assembler::for_deployment(
            Arc::new(DeclarativeProvisioner::new()),
            &self.deployment,
            &self.account,
        )
        .context("preparing assembler")
    }

    /// Assemble every environment, reporting failed ones on stderr.
    pub fn assemble(&self) -> Result<Assembly> {
        let assembler = self.assembler()?;
        let table = &self.deployment.environments;
        let assembly = if self.parallel {
            assembler.assemble_parallel(table)?
        } else {
            assembler.assemble(table)?
        };
        assembly.verify(table, assembler.graph())?;
        for failure in &assembly.failures {
            eprintln!("{} {}", "failed:".red().bold(), failure);
        }
        Ok(assembly)
    }
}

/// Fails when any environment could not be assembled.
pub fn finish(assembly: &Assembly) -> Result<()> {
    if assembly.is_complete() {
        return Ok(());
    }
    let failed: Vec<&str> = assembly.failed_environments().into_iter().collect();
    bail!(
        "{} environment(s) failed to assemble: {}",
        failed.len(),
        failed.join(", ")
    )
}

/// Restrict the table to the named environments.
fn select(table: &EnvironmentTable, names: &[String]) -> Result<EnvironmentTable> {
    let mut selected = EnvironmentTable::default();
    for name in names {
        match table.get(name) {
            Some(config) => {
                selected.insert(name, config.clone());
            }
            None => bail!(
                "unknown environment {} (known: {})",
                name,
                table.names().collect::<Vec<_>>().join(", ")
            ),
        }
    }
    Ok(selected)
}
