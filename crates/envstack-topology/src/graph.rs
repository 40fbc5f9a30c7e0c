//! Stage graph
//!
//! Resolves build order from what each stage requires and produces, using
//! Kahn's algorithm. Edges are kept only where no longer path already implies
//! them, so `service -> network` disappears once `service -> data -> network`
//! exists.

use crate::error::GraphError;
use crate::stacks::{DataStage, NetworkStage, ServiceStage};
use crate::stage::Stage;
use envstack_common::OutputKind;
use envstack_config::ServiceProfile;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Recorded dependency between two stages (indices into [`StageGraph::stages`])
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageEdge {
    pub consumer: usize,
    pub producer: usize,
    pub reason: String,
}

/// Stages in build order plus the edges between them.
#[derive(Clone)]
pub struct StageGraph {
    stages: Vec<Arc<dyn Stage>>,
    edges: Vec<StageEdge>,
}

impl fmt::Debug for StageGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("StageGraph")
            .field("stages", &names)
            .field("edges", &self.edges)
            .finish()
    }
}

impl StageGraph {
    /// Build and sort a graph.
    ///
    /// Fails when two stages share a name or an output kind, when a required
    /// kind has no producer, or when requirements form a cycle.
    pub fn new(stages: Vec<Arc<dyn Stage>>) -> Result<Self, GraphError> {
        let mut names = HashSet::new();
        for stage in &stages {
            if !names.insert(stage.name()) {
                return Err(GraphError::DuplicateStage(stage.name().to_string()));
            }
        }

        let mut producer_of: BTreeMap<OutputKind, usize> = BTreeMap::new();
        for (index, stage) in stages.iter().enumerate() {
            for &kind in stage.produces() {
                if let Some(&first) = producer_of.get(&kind) {
                    return Err(GraphError::DuplicateProducer {
                        kind,
                        first: stages[first].name().to_string(),
                        second: stage.name().to_string(),
                    });
                }
                producer_of.insert(kind, index);
            }
        }

        // deps[i]: stages whose outputs stage i consumes
        let mut deps: Vec<BTreeSet<usize>> = Vec::with_capacity(stages.len());
        for stage in &stages {
            let mut producers = BTreeSet::new();
            for kind in stage.requires() {
                let producer = producer_of.get(kind).ok_or_else(|| GraphError::MissingProducer {
                    stage: stage.name().to_string(),
                    kind: *kind,
                })?;
                producers.insert(*producer);
            }
            deps.push(producers);
        }

        let order = topological_order(&stages, &deps)?;

        // ancestors[i]: every stage reachable from i through requirements
        let mut ancestors: Vec<BTreeSet<usize>> = vec![BTreeSet::new(); stages.len()];
        for &index in &order {
            let mut reachable = BTreeSet::new();
            for &producer in &deps[index] {
                reachable.insert(producer);
                reachable.extend(ancestors[producer].iter().copied());
            }
            ancestors[index] = reachable;
        }

        let position: Vec<usize> = {
            let mut position = vec![0; stages.len()];
            for (sorted, &original) in order.iter().enumerate() {
                position[original] = sorted;
            }
            position
        };

        let mut edges = Vec::new();
        for &consumer in &order {
            for &producer in &deps[consumer] {
                let implied = deps[consumer]
                    .iter()
                    .any(|&other| other != producer && ancestors[other].contains(&producer));
                if implied {
                    continue;
                }
                edges.push(StageEdge {
                    consumer: position[consumer],
                    producer: position[producer],
                    reason: stages[consumer].dependency_reason(stages[producer].as_ref()),
                });
            }
        }

        let sorted = order.iter().map(|&i| Arc::clone(&stages[i])).collect();
        Ok(Self {
            stages: sorted,
            edges,
        })
    }

    /// Network, data and service stages for one application profile
    pub fn standard(profile: &ServiceProfile) -> Result<Self, GraphError> {
        Self::new(vec![
            Arc::new(NetworkStage::new()),
            Arc::new(DataStage::new(profile.database.clone())),
            Arc::new(ServiceStage::new(profile.clone())),
        ])
    }

    /// Stages in build order
    pub fn stages(&self) -> &[Arc<dyn Stage>] {
        &self.stages
    }

    /// Edges in build order of their consumer
    pub fn edges(&self) -> &[StageEdge] {
        &self.edges
    }

    /// Recorded producers of the stage at `index`
    pub fn producers_of(&self, index: usize) -> impl Iterator<Item = &StageEdge> + '_ {
        self.edges.iter().filter(move |e| e.consumer == index)
    }

    /// Producing stage index for every output kind
    pub fn producer_of(&self, kind: OutputKind) -> Option<usize> {
        self.stages.iter().position(|s| s.produces().contains(&kind))
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

/// Kahn's algorithm; ties keep the caller's order.
fn topological_order(
    stages: &[Arc<dyn Stage>],
    deps: &[BTreeSet<usize>],
) -> Result<Vec<usize>, GraphError> {
    let mut in_degree: Vec<usize> = deps.iter().map(BTreeSet::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); stages.len()];
    for (consumer, producers) in deps.iter().enumerate() {
        for &producer in producers {
            dependents[producer].push(consumer);
        }
    }

    let mut queue: VecDeque<usize> = (0..stages.len()).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(stages.len());

    while let Some(index) = queue.pop_front() {
        order.push(index);
        for &dependent in &dependents[index] {
            in_degree[dependent] -= 1;
            if in_degree[dependent] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    if order.len() != stages.len() {
        let stuck = (0..stages.len())
            .filter(|i| !order.contains(i))
            .map(|i| stages[i].name().to_string())
            .collect();
        return Err(GraphError::CircularDependency { stages: stuck });
    }

    Ok(order)
}
