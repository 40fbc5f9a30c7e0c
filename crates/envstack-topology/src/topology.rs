//! Assembled topology: stack handles and dependency edges per partition

use crate::error::{AssemblyError, AssemblyResult};
use crate::graph::StageGraph;
use envstack_common::{OutputKind, RegionRole, StackId, StackPlacement};
use envstack_config::{EnvironmentConfig, EnvironmentTable};
use envstack_provision::{Output, StackDeclaration};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A provisioned stack. Written once by its stage, read by consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackHandle {
    pub(crate) id: StackId,
    pub(crate) environment: String,
    pub(crate) role: RegionRole,
    pub(crate) stage: String,
    pub(crate) placement: StackPlacement,
    pub(crate) description: String,
    pub(crate) outputs: BTreeMap<OutputKind, Output>,
    pub(crate) depends_on: Vec<StackId>,
    pub(crate) declaration: StackDeclaration,
}

impl StackHandle {
    pub fn id(&self) -> &StackId {
        &self.id
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn role(&self) -> RegionRole {
        self.role
    }

    /// Name of the stage that built the stack
    pub fn stage(&self) -> &str {
        &self.stage
    }

    pub fn placement(&self) -> &StackPlacement {
        &self.placement
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn output(&self, kind: OutputKind) -> Option<&Output> {
        self.outputs.get(&kind)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Output> + '_ {
        self.outputs.values()
    }

    /// Output kinds, i.e. the handle shape
    pub fn output_kinds(&self) -> Vec<OutputKind> {
        self.outputs.keys().copied().collect()
    }

    /// Stacks that must be provisioned first
    pub fn depends_on(&self) -> &[StackId] {
        &self.depends_on
    }

    /// Recorded resources and named exports
    pub fn declaration(&self) -> &StackDeclaration {
        &self.declaration
    }
}

/// Explicit ordering constraint: `consumer` is provisioned after `producer`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct DependencyEdge {
    pub consumer: StackId,
    pub producer: StackId,
    pub reason: String,
}

impl fmt::Display for DependencyEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.consumer, self.producer, self.reason)
    }
}

/// (environment, region role)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PartitionKey {
    pub environment: String,
    pub role: RegionRole,
}

impl PartitionKey {
    pub fn new(environment: &str, role: RegionRole) -> Self {
        Self {
            environment: environment.to_string(),
            role,
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.environment, self.role)
    }
}

/// Every stack and edge of one environment in one region role.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Partition {
    pub(crate) key: PartitionKey,
    pub(crate) placement: StackPlacement,
    /// Effective config the stages were built from
    pub(crate) config: EnvironmentConfig,
    pub(crate) stacks: Vec<StackHandle>,
    pub(crate) edges: Vec<DependencyEdge>,
}

impl Partition {
    pub fn key(&self) -> &PartitionKey {
        &self.key
    }

    pub fn environment(&self) -> &str {
        &self.key.environment
    }

    pub fn role(&self) -> RegionRole {
        self.key.role
    }

    pub fn placement(&self) -> &StackPlacement {
        &self.placement
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Stacks in build order
    pub fn stacks(&self) -> &[StackHandle] {
        &self.stacks
    }

    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    /// Stack built by the named stage
    pub fn stack_for(&self, stage: &str) -> Option<&StackHandle> {
        self.stacks.iter().find(|s| s.stage == stage)
    }

    /// SHA-256 of the partition's canonical JSON, hex-encoded
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        let canonical = serde_json::to_vec(self)?;
        Ok(hex::encode(Sha256::digest(&canonical)))
    }
}

/// Everything one assembly run produced, partitions in table order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Topology {
    partitions: Vec<Partition>,
}

impl Topology {
    pub(crate) fn push(&mut self, partition: Partition) {
        self.partitions.push(partition);
    }

    pub fn partitions(&self) -> &[Partition] {
        &self.partitions
    }

    pub fn partition(&self, environment: &str, role: RegionRole) -> Option<&Partition> {
        self.partitions
            .iter()
            .find(|p| p.key.environment == environment && p.key.role == role)
    }

    /// Partitions of one environment, primary first
    pub fn environment(&self, environment: &str) -> impl Iterator<Item = &Partition> + '_ {
        let environment = environment.to_string();
        self.partitions
            .iter()
            .filter(move |p| p.key.environment == environment)
    }

    /// Environments present, in table order
    pub fn environments(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for partition in &self.partitions {
            if !seen.contains(&partition.environment()) {
                seen.push(partition.environment());
            }
        }
        seen
    }

    pub fn stacks(&self) -> impl Iterator<Item = &StackHandle> + '_ {
        self.partitions.iter().flat_map(|p| p.stacks.iter())
    }

    pub fn stack(&self, id: &StackId) -> Option<&StackHandle> {
        self.stacks().find(|s| &s.id == id)
    }

    pub fn edges(&self) -> impl Iterator<Item = &DependencyEdge> + '_ {
        self.partitions.iter().flat_map(|p| p.edges.iter())
    }

    /// Number of stacks
    pub fn len(&self) -> usize {
        self.partitions.iter().map(|p| p.stacks.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fingerprint of every partition
    pub fn fingerprints(&self) -> Result<BTreeMap<PartitionKey, String>, serde_json::Error> {
        self.partitions
            .iter()
            .map(|p| p.fingerprint().map(|hash| (p.key.clone(), hash)))
            .collect()
    }

    /// Check structural invariants against the table the topology came from.
    ///
    /// Every present environment must have one primary partition and a DR
    /// partition exactly when DR is enabled; each partition holds one stack
    /// per stage; no edge leaves its partition.
    pub fn verify(&self, table: &EnvironmentTable, graph: &StageGraph) -> AssemblyResult<()> {
        let expected_stages: Vec<&str> = graph.stages().iter().map(|s| s.name()).collect();

        let mut keys = BTreeSet::new();
        for partition in &self.partitions {
            if !keys.insert(&partition.key) {
                return Err(violation(format!("partition {} appears twice", partition.key)));
            }

            let config = table.get(partition.environment()).ok_or_else(|| {
                violation(format!("{} is not in the environment table", partition.key))
            })?;

            if partition.role() == RegionRole::Dr {
                if !config.enable_dr {
                    return Err(violation(format!(
                        "{} exists but DR is disabled",
                        partition.key
                    )));
                }
                if partition.config.desired_count != 1 || partition.config.min_count != 1 {
                    return Err(violation(format!(
                        "{} is not a warm standby (desired={}, min={})",
                        partition.key, partition.config.desired_count, partition.config.min_count
                    )));
                }
            }

            let stages: Vec<&str> = partition.stacks.iter().map(|s| s.stage()).collect();
            if stages != expected_stages {
                return Err(violation(format!(
                    "{} holds stacks {:?}, expected {:?}",
                    partition.key, stages, expected_stages
                )));
            }

            let ids: BTreeSet<&StackId> = partition.stacks.iter().map(|s| &s.id).collect();
            for edge in &partition.edges {
                if !ids.contains(&edge.consumer) || !ids.contains(&edge.producer) {
                    return Err(violation(format!("edge {} leaves partition {}", edge, partition.key)));
                }
            }
            if partition.edges.len() != graph.edges().len() {
                return Err(violation(format!(
                    "{} has {} edges, expected {}",
                    partition.key,
                    partition.edges.len(),
                    graph.edges().len()
                )));
            }
        }

        for environment in self.environments() {
            let Some(config) = table.get(environment) else {
                continue;
            };
            if self.partition(environment, RegionRole::Primary).is_none() {
                return Err(violation(format!("{} has no primary partition", environment)));
            }
            if config.enable_dr && self.partition(environment, RegionRole::Dr).is_none() {
                return Err(violation(format!("{} has DR enabled but no DR partition", environment)));
            }
        }

        Ok(())
    }
}

fn violation(message: String) -> AssemblyError {
    AssemblyError::Invariant(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Assembler;
    use envstack_config::ServiceProfile;
    use envstack_provision::DeclarativeProvisioner;
    use std::sync::Arc;

    fn assembled(table: &EnvironmentTable) -> (Topology, StageGraph) {
        let graph = StageGraph::standard(&ServiceProfile::default()).unwrap();
        let assembler = Assembler::new(
            Arc::new(DeclarativeProvisioner::new()),
            graph.clone(),
            "123456789012",
            "us-east-1",
        );
        (assembler.assemble(table).unwrap().topology, graph)
    }

    fn uat() -> EnvironmentTable {
        EnvironmentTable::new().with(
            "uat",
            EnvironmentConfig::new(256, 512, 1, 1, 2, "t3.small").with_dr("us-west-2"),
        )
    }

    #[test]
    fn test_verify_accepts_assembled_topology() {
        let table = uat();
        let (topology, graph) = assembled(&table);
        assert!(topology.verify(&table, &graph).is_ok());
        assert_eq!(topology.environment("uat").count(), 2);
        assert!(topology
            .stack(&StackId::from_raw("uat-dr-shared-data"))
            .is_some());
    }

    #[test]
    fn test_verify_rejects_cross_partition_edge() {
        let table = uat();
        let (mut topology, graph) = assembled(&table);
        let primary_network = topology.partitions[0].stacks[0].id.clone();
        topology.partitions[1].edges[0].producer = primary_network;

        let err = topology.verify(&table, &graph).unwrap_err();
        assert!(matches!(err, AssemblyError::Invariant(ref m) if m.contains("leaves partition")));
    }

    #[test]
    fn test_verify_rejects_unexpected_dr() {
        let (topology, graph) = assembled(&uat());
        let without_dr = EnvironmentTable::new()
            .with("uat", EnvironmentConfig::new(256, 512, 1, 1, 2, "t3.small"));
        assert!(topology.verify(&without_dr, &graph).is_err());
    }

    #[test]
    fn test_fingerprint_tracks_content() {
        let (topology, _) = assembled(&uat());
        let primary = topology.partition("uat", RegionRole::Primary).unwrap();
        let dr = topology.partition("uat", RegionRole::Dr).unwrap();

        let hash = primary.fingerprint().unwrap();
        assert_eq!(hash.len(), 64);
        assert_ne!(hash, dr.fingerprint().unwrap());

        let mut changed = primary.clone();
        changed.stacks[2].description.push('!');
        assert_ne!(hash, changed.fingerprint().unwrap());
    }

    #[test]
    fn test_serialized_shape() {
        let (topology, _) = assembled(&uat());
        let json = serde_json::to_value(&topology).unwrap();
        let partition = &json["partitions"][1];
        assert_eq!(partition["key"]["role"], "dr");
        assert_eq!(partition["placement"]["region"], "us-west-2");
        assert_eq!(partition["stacks"][0]["outputs"]["network"]["kind"], "network");
        assert_eq!(
            partition["edges"][0]["reason"],
            "data stack requires network handle"
        );
    }
}
