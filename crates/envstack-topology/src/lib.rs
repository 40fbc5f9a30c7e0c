//! envstack Topology - multi-environment stack assembly
//!
//! For every environment in an [`EnvironmentTable`](envstack_config::EnvironmentTable)
//! the [`Assembler`] runs a [`StageGraph`] (network, data, service by default)
//! once for the primary region and, when DR is enabled, once more for the DR
//! region with the warm-standby config. Each run yields a [`Partition`] of
//! [`StackHandle`]s joined by explicit [`DependencyEdge`]s.

pub mod assembler;
pub mod error;
pub mod graph;
pub mod stacks;
pub mod stage;
pub mod topology;

pub use assembler::{Assembler, Assembly};
pub use error::{AssemblyError, AssemblyResult, GraphError};
pub use graph::{StageEdge, StageGraph};
pub use stacks::{DataStage, NetworkStage, ServiceStage};
pub use stage::{Stage, StageContext, StageError, StageInputs};
pub use topology::{DependencyEdge, Partition, PartitionKey, StackHandle, Topology};
