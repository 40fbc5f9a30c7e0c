//! Synth command

use super::Session;
use anyhow::{Context, Result};
use colored::Colorize;
use envstack_topology::Topology;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Hand-off document for the provisioning backend
#[derive(Debug, Serialize)]
pub struct Synthesis<'a> {
    pub account: &'a str,
    pub primary_region: &'a str,
    /// Partition key to content fingerprint
    pub fingerprints: BTreeMap<String, String>,
    pub topology: &'a Topology,
}

impl<'a> Synthesis<'a> {
    pub fn new(session: &'a Session, topology: &'a Topology) -> Result<Self> {
        let fingerprints = topology
            .fingerprints()
            .context("fingerprinting partitions")?
            .into_iter()
            .map(|(key, hash)| (key.to_string(), hash))
            .collect();
        Ok(Self {
            account: &session.account,
            primary_region: &session.deployment.primary_region,
            fingerprints,
            topology,
        })
    }
}

/// Refuses to emit anything unless every environment assembled.
pub fn handle(session: &Session, out: Option<&Path>) -> Result<()> {
    let topology = session.assemble()?.into_result()?;
    let document = session.format.render(&Synthesis::new(session, &topology)?)?;

    match out {
        Some(path) => {
            fs::write(path, document).with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "{} {} stacks in {} partitions written to {}",
                "synthesized:".green().bold(),
                topology.len(),
                topology.partitions().len(),
                path.display()
            );
        }
        None => println!("{}", document),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_document_shape() {
        let session = Session::new(None, &[], "123456789012".into(), OutputFormat::Json, true)
            .unwrap();
        let topology = session.assemble().unwrap().into_result().unwrap();
        let json = OutputFormat::Json
            .render(&Synthesis::new(&session, &topology).unwrap())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["account"], "123456789012");
        assert_eq!(value["primary_region"], "us-east-1");
        assert_eq!(value["fingerprints"].as_object().unwrap().len(), 4);
        assert_eq!(value["fingerprints"]["uat/primary"].as_str().unwrap().len(), 64);
    }
}
