//! Stacks command

use super::{finish, Session};
use anyhow::Result;
use envstack_topology::Topology;
use serde::Serialize;
use tabled::Tabled;

#[derive(Debug, Tabled, Serialize)]
pub struct StackRow {
    pub stack: String,
    pub environment: String,
    pub role: String,
    pub placement: String,
    pub depends_on: String,
    pub description: String,
}

pub fn rows(topology: &Topology) -> Vec<StackRow> {
    topology
        .stacks()
        .map(|stack| StackRow {
            stack: stack.id().to_string(),
            environment: stack.environment().to_string(),
            role: stack.role().to_string(),
            placement: stack.placement().to_string(),
            depends_on: stack
                .depends_on()
                .iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            description: stack.description().to_string(),
        })
        .collect()
}

pub fn handle(session: &Session) -> Result<()> {
    let assembly = session.assemble()?;
    session.format.print_rows(&rows(&assembly.topology))?;
    finish(&assembly)
}
