//! Graph command

use super::{finish, Session};
use anyhow::Result;
use envstack_topology::Topology;
use serde::Serialize;
use std::fmt::Write;
use tabled::Tabled;

#[derive(Debug, Tabled, Serialize)]
pub struct EdgeRow {
    pub consumer: String,
    pub producer: String,
    pub reason: String,
}

pub fn rows(topology: &Topology) -> Vec<EdgeRow> {
    topology
        .edges()
        .map(|edge| EdgeRow {
            consumer: edge.consumer.to_string(),
            producer: edge.producer.to_string(),
            reason: edge.reason.clone(),
        })
        .collect()
}

/// Graphviz rendering, one cluster per partition
pub fn dot(topology: &Topology) -> String {
    let mut out = String::from("digraph envstack {\n    rankdir=RL;\n    node [shape=box];\n");
    for (index, partition) in topology.partitions().iter().enumerate() {
        let _ = writeln!(out, "    subgraph cluster_{} {{", index);
        let _ = writeln!(
            out,
            "        label=\"{} ({})\";",
            partition.key(),
            partition.placement()
        );
        for stack in partition.stacks() {
            let _ = writeln!(out, "        \"{}\";", stack.id());
        }
        let _ = writeln!(out, "    }}");
    }
    for edge in topology.edges() {
        let _ = writeln!(
            out,
            "    \"{}\" -> \"{}\" [label=\"{}\"];",
            edge.consumer, edge.producer, edge.reason
        );
    }
    out.push_str("}\n");
    out
}

pub fn handle(session: &Session, as_dot: bool) -> Result<()> {
    let assembly = session.assemble()?;
    if as_dot {
        print!("{}", dot(&assembly.topology));
    } else {
        session.format.print_rows(&rows(&assembly.topology))?;
    }
    finish(&assembly)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    fn production() -> Topology {
        let session = Session::new(
            None,
            &["production".to_string()],
            String::new(),
            OutputFormat::Table,
            false,
        )
        .unwrap();
        session.assemble().unwrap().topology
    }

    #[test]
    fn test_edge_rows() {
        let rows = rows(&production());
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].consumer, "production-shared-data");
        assert_eq!(rows[0].producer, "production-shared-network");
        assert_eq!(rows[1].consumer, "production-app-django-api");
        assert_eq!(rows[1].producer, "production-shared-data");
    }

    #[test]
    fn test_dot() {
        let dot = dot(&production());
        assert!(dot.starts_with("digraph envstack {"));
        assert!(dot.contains("label=\"production/primary (<unresolved>/us-east-1)\";"));
        assert!(dot.contains(
            "\"production-shared-data\" -> \"production-shared-network\" \
             [label=\"data stack requires network handle\"];"
        ));
        assert!(dot.trim_end().ends_with('}'));
    }
}
