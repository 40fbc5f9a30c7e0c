//! Outputs command

use super::{finish, Session};
use anyhow::{bail, Result};
use envstack_topology::Topology;
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Tabled, Serialize)]
pub struct OutputRow {
    pub stack: String,
    pub output: String,
    pub export_name: String,
    pub value: String,
    pub description: String,
}

/// Named outputs, optionally of a single stack
pub fn rows(topology: &Topology, stack: Option<&str>) -> Vec<OutputRow> {
    topology
        .stacks()
        .filter(|s| stack.map_or(true, |wanted| s.id().as_str() == wanted))
        .flat_map(|s| {
            s.declaration().exports.iter().map(move |export| OutputRow {
                stack: s.id().to_string(),
                output: export.name.clone(),
                export_name: export.export_name.clone(),
                value: export.value.to_string(),
                description: export.description.clone(),
            })
        })
        .collect()
}

pub fn handle(session: &Session, stack: Option<&str>) -> Result<()> {
    let assembly = session.assemble()?;
    let rows = rows(&assembly.topology, stack);
    if let Some(id) = stack {
        if rows.is_empty() && !assembly.topology.stacks().any(|s| s.id().as_str() == id) {
            bail!("no stack named {}", id);
        }
    }
    session.format.print_rows(&rows)?;
    finish(&assembly)
}
