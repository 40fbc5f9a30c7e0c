//! Topology assembler
//!
//! Walks the environment table and builds every partition by running the stage
//! graph once per (environment, region role). DR partitions reuse the same
//! procedure with the derived warm-standby config.

use crate::error::{AssemblyError, AssemblyResult};
use crate::graph::StageGraph;
use crate::stage::{StageContext, StageError, StageInputs};
use crate::topology::{DependencyEdge, Partition, PartitionKey, StackHandle, Topology};
use envstack_common::{OutputKind, RegionRole, StackId, StackPlacement};
use envstack_config::{
    validate_entry, validate_primary_region, DeploymentConfig, EnvironmentConfig, EnvironmentTable,
};
use envstack_provision::{Output, Provisioner, StackScope};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one assembly run.
///
/// Failed environments contribute no stacks; their errors are kept here.
#[derive(Debug)]
pub struct Assembly {
    pub topology: Topology,
    pub failures: Vec<AssemblyError>,
}

impl Assembly {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Environments excluded because of a failure
    pub fn failed_environments(&self) -> BTreeSet<&str> {
        self.failures.iter().filter_map(|f| f.environment()).collect()
    }

    /// Topology only if every environment assembled
    pub fn into_result(self) -> AssemblyResult<Topology> {
        if self.failures.is_empty() {
            Ok(self.topology)
        } else {
            Err(AssemblyError::Incomplete(self.failures))
        }
    }

    /// Topology invariants, plus: every table entry is either assembled or failed
    pub fn verify(&self, table: &EnvironmentTable, graph: &StageGraph) -> AssemblyResult<()> {
        self.topology.verify(table, graph)?;

        let present: BTreeSet<&str> = self.topology.environments().into_iter().collect();
        let failed = self.failed_environments();
        for name in table.names() {
            if present.contains(name) == failed.contains(name) {
                return Err(AssemblyError::Invariant(format!(
                    "{} must be either assembled or failed",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// What one environment contributed
struct EnvironmentOutcome {
    partitions: Vec<Partition>,
    failures: Vec<AssemblyError>,
}

/// Builds topologies from an environment table
pub struct Assembler {
    provisioner: Arc<dyn Provisioner>,
    graph: StageGraph,
    account: String,
    primary_region: String,
}

impl Assembler {
    pub fn new(
        provisioner: Arc<dyn Provisioner>,
        graph: StageGraph,
        account: impl Into<String>,
        primary_region: impl Into<String>,
    ) -> Self {
        Self {
            provisioner,
            graph,
            account: account.into(),
            primary_region: primary_region.into(),
        }
    }

    /// Standard stages for the deployment's service profile
    pub fn for_deployment(
        provisioner: Arc<dyn Provisioner>,
        deployment: &DeploymentConfig,
        account: impl Into<String>,
    ) -> AssemblyResult<Self> {
        validate_primary_region(&deployment.primary_region).map_err(AssemblyError::Profile)?;
        deployment
            .service
            .validate()
            .map_err(AssemblyError::Profile)?;
        let graph = StageGraph::standard(&deployment.service)?;
        Ok(Self::new(
            provisioner,
            graph,
            account,
            deployment.primary_region.clone(),
        ))
    }

    pub fn graph(&self) -> &StageGraph {
        &self.graph
    }

    pub fn primary_region(&self) -> &str {
        &self.primary_region
    }

    /// Assemble environments one after another.
    pub fn assemble(&self, table: &EnvironmentTable) -> AssemblyResult<Assembly> {
        let outcomes = table
            .iter()
            .map(|(name, config)| self.assemble_environment(name, config))
            .collect();
        self.merge(outcomes)
    }

    /// Assemble each environment on its own scoped thread.
    ///
    /// Produces the same [`Assembly`] as [`Assembler::assemble`].
    pub fn assemble_parallel(&self, table: &EnvironmentTable) -> AssemblyResult<Assembly> {
        let entries: Vec<(&String, &EnvironmentConfig)> = table.iter().collect();

        let outcomes = crossbeam::scope(|scope| {
            let handles: Vec<_> = entries
                .iter()
                .map(|&(name, config)| {
                    scope.spawn(move |_| self.assemble_environment(name, config))
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_else(|panic| std::panic::resume_unwind(panic));

        self.merge(outcomes)
    }

    fn merge(&self, outcomes: Vec<AssemblyResult<EnvironmentOutcome>>) -> AssemblyResult<Assembly> {
        let mut topology = Topology::default();
        let mut failures = Vec::new();

        for outcome in outcomes {
            let outcome = outcome?;
            for partition in outcome.partitions {
                topology.push(partition);
            }
            failures.extend(outcome.failures);
        }

        info!(
            "Assembly complete: {} stacks in {} partitions, {} failure(s)",
            topology.len(),
            topology.partitions().len(),
            failures.len()
        );
        Ok(Assembly { topology, failures })
    }

    /// Primary partition, then DR when enabled. All or nothing; the first
    /// contained failure stops the environment.
    fn assemble_environment(
        &self,
        environment: &str,
        config: &EnvironmentConfig,
    ) -> AssemblyResult<EnvironmentOutcome> {
        if let Err(source) = validate_entry(environment, config, &self.primary_region) {
            warn!("Rejected environment {}: {}", environment, source);
            return Ok(EnvironmentOutcome {
                partitions: Vec::new(),
                failures: vec![AssemblyError::Configuration {
                    environment: environment.to_string(),
                    source,
                }],
            });
        }

        let mut regions = vec![(
            RegionRole::Primary,
            config.clone(),
            self.primary_region.clone(),
        )];
        if config.enable_dr {
            regions.push((
                RegionRole::Dr,
                config.derive_dr(),
                config.dr_region.trim().to_string(),
            ));
        }

        let mut partitions = Vec::new();
        for (role, effective, region) in regions {
            match self.assemble_region(environment, role, &effective, &region) {
                Ok(partition) => partitions.push(partition),
                Err(error) if error.is_fatal() => return Err(error),
                Err(error) => {
                    // Remaining regions are never built for a failed environment
                    warn!("Environment {} ({}) failed: {}", environment, role, error);
                    return Ok(EnvironmentOutcome {
                        partitions: Vec::new(),
                        failures: vec![error],
                    });
                }
            }
        }

        Ok(EnvironmentOutcome {
            partitions,
            failures: Vec::new(),
        })
    }

    /// Run every stage in order for one environment in one region.
    fn assemble_region(
        &self,
        environment: &str,
        role: RegionRole,
        config: &EnvironmentConfig,
        region: &str,
    ) -> AssemblyResult<Partition> {
        let label = role.environment_label(environment);
        let placement = StackPlacement::new(self.account.clone(), region);
        let ctx = StageContext {
            environment,
            label: &label,
            role,
            config,
            provisioner: self.provisioner.as_ref(),
        };

        let stages = self.graph.stages();
        let ids: Vec<StackId> = stages
            .iter()
            .map(|stage| stage.stack_id(environment, role))
            .collect();

        let mut stacks: Vec<StackHandle> = Vec::with_capacity(stages.len());
        let mut edges = Vec::new();

        for (index, stage) in stages.iter().enumerate() {
            let id = &ids[index];
            let description = stage.description(environment, role);
            let mut scope = StackScope::new(id.clone(), placement.clone(), description.clone());

            let built = {
                let available: BTreeMap<OutputKind, &Output> = stage
                    .requires()
                    .iter()
                    .filter_map(|kind| {
                        stacks
                            .iter()
                            .find_map(|s| s.outputs.get(kind))
                            .map(|output| (*kind, output))
                    })
                    .collect();
                debug!("Building stack {} in {}", id, placement);
                stage.build(&ctx, &StageInputs::new(available), &mut scope)
            };

            let outputs = built.map_err(|error| match error {
                StageError::Provisioning(source) => AssemblyError::Provisioning {
                    environment: environment.to_string(),
                    role,
                    stack: id.clone(),
                    source,
                },
                StageError::DependencyUnavailable(kind) => AssemblyError::DependencyUnavailable {
                    stack: id.clone(),
                    kind,
                },
            })?;
            let outputs = check_outputs(id, stage.produces(), outputs)?;

            let mut depends_on = Vec::new();
            for edge in self.graph.producers_of(index) {
                let producer = ids[edge.producer].clone();
                debug!("Recorded edge {} -> {}: {}", id, producer, edge.reason);
                depends_on.push(producer.clone());
                edges.push(DependencyEdge {
                    consumer: id.clone(),
                    producer,
                    reason: edge.reason.clone(),
                });
            }

            stacks.push(StackHandle {
                id: id.clone(),
                environment: environment.to_string(),
                role,
                stage: stage.name().to_string(),
                placement: placement.clone(),
                description,
                outputs,
                depends_on,
                declaration: scope.finish(),
            });
        }

        info!(
            "Assembled {} ({}): {} stacks, {} edges in {}",
            environment,
            role,
            stacks.len(),
            edges.len(),
            placement
        );
        Ok(Partition {
            key: PartitionKey::new(environment, role),
            placement,
            config: config.clone(),
            stacks,
            edges,
        })
    }
}

/// Outputs must match the stage's declared kinds exactly.
fn check_outputs(
    stack: &StackId,
    declared: &[OutputKind],
    outputs: Vec<Output>,
) -> AssemblyResult<BTreeMap<OutputKind, Output>> {
    let mut by_kind = BTreeMap::new();
    for output in outputs {
        let kind = output.kind();
        if !declared.contains(&kind) || by_kind.insert(kind, output).is_some() {
            return Err(AssemblyError::StageContract {
                stack: stack.clone(),
                kind,
            });
        }
    }
    if let Some(&kind) = declared.iter().find(|kind| !by_kind.contains_key(*kind)) {
        return Err(AssemblyError::StageContract {
            stack: stack.clone(),
            kind,
        });
    }
    Ok(by_kind)
}
