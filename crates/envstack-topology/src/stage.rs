//! Stage abstraction
//!
//! A stage builds one stack per environment/region. It declares the output
//! kinds it consumes and produces; the [`StageGraph`](crate::StageGraph)
//! derives ordering and dependency edges from those declarations alone.

use envstack_common::{OutputKind, RegionRole, StackId};
use envstack_config::EnvironmentConfig;
use envstack_provision::{
    BucketHandle, ContainerClusterHandle, CredentialHandle, DatabaseClusterHandle, NetworkHandle,
    Output, ProvisioningError, Provisioner, ServiceHandle, StackScope,
};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a stage build stopped
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    /// A handle the stage needs is absent or of the wrong kind
    #[error("required {0} handle is unavailable")]
    DependencyUnavailable(OutputKind),
}

/// Everything a stage knows about the partition it builds into.
pub struct StageContext<'a> {
    /// Environment name as it appears in the table
    pub environment: &'a str,
    /// Name handed to builders: `<env>` or `<env>-dr`
    pub label: &'a str,
    pub role: RegionRole,
    /// Effective config (already derived for DR)
    pub config: &'a EnvironmentConfig,
    pub provisioner: &'a dyn Provisioner,
}

/// Handles from upstream stacks, restricted to what the stage requires.
pub struct StageInputs<'a> {
    available: BTreeMap<OutputKind, &'a Output>,
}

impl<'a> StageInputs<'a> {
    pub fn new(available: BTreeMap<OutputKind, &'a Output>) -> Self {
        Self { available }
    }

    /// No upstream handles
    pub fn empty() -> Self {
        Self::new(BTreeMap::new())
    }

    pub fn kinds(&self) -> impl Iterator<Item = OutputKind> + '_ {
        self.available.keys().copied()
    }

    pub fn network(&self) -> Result<&'a NetworkHandle, StageError> {
        match self.available.get(&OutputKind::Network).copied() {
            Some(Output::Network(handle)) => Ok(handle),
            _ => Err(StageError::DependencyUnavailable(OutputKind::Network)),
        }
    }

    pub fn database_cluster(&self) -> Result<&'a DatabaseClusterHandle, StageError> {
        match self.available.get(&OutputKind::DatabaseCluster).copied() {
            Some(Output::DatabaseCluster(handle)) => Ok(handle),
            _ => Err(StageError::DependencyUnavailable(OutputKind::DatabaseCluster)),
        }
    }

    pub fn bucket(&self) -> Result<&'a BucketHandle, StageError> {
        match self.available.get(&OutputKind::Bucket).copied() {
            Some(Output::Bucket(handle)) => Ok(handle),
            _ => Err(StageError::DependencyUnavailable(OutputKind::Bucket)),
        }
    }

    pub fn credential(&self) -> Result<&'a CredentialHandle, StageError> {
        match self.available.get(&OutputKind::Credential).copied() {
            Some(Output::Credential(handle)) => Ok(handle),
            _ => Err(StageError::DependencyUnavailable(OutputKind::Credential)),
        }
    }

    pub fn container_cluster(&self) -> Result<&'a ContainerClusterHandle, StageError> {
        match self.available.get(&OutputKind::ContainerCluster).copied() {
            Some(Output::ContainerCluster(handle)) => Ok(handle),
            _ => Err(StageError::DependencyUnavailable(OutputKind::ContainerCluster)),
        }
    }

    pub fn service(&self) -> Result<&'a ServiceHandle, StageError> {
        match self.available.get(&OutputKind::Service).copied() {
            Some(Output::Service(handle)) => Ok(handle),
            _ => Err(StageError::DependencyUnavailable(OutputKind::Service)),
        }
    }
}

/// One kind of stack in every environment/region partition.
pub trait Stage: Send + Sync {
    /// Short stage name, e.g. `network`
    fn name(&self) -> &str;

    /// Stack id segment, e.g. `shared-network`
    fn segment(&self) -> &str;

    /// Output kinds consumed from upstream stacks
    fn requires(&self) -> &[OutputKind];

    /// Output kinds this stage hands downstream
    fn produces(&self) -> &[OutputKind];

    /// Stack description for an environment in a role
    fn description(&self, environment: &str, role: RegionRole) -> String;

    /// Justification recorded on the edge from this stage to `producer`.
    fn dependency_reason(&self, producer: &dyn Stage) -> String {
        let nouns: Vec<&str> = self
            .requires()
            .iter()
            .filter(|kind| producer.produces().contains(*kind))
            .map(OutputKind::noun)
            .collect();
        format!(
            "{} stack requires {} from {} stack",
            self.name(),
            join_nouns(&nouns),
            producer.name()
        )
    }

    /// Declare the stack into `scope` and return its outputs.
    fn build(
        &self,
        ctx: &StageContext<'_>,
        inputs: &StageInputs<'_>,
        scope: &mut StackScope,
    ) -> Result<Vec<Output>, StageError>;

    /// Stack id of this stage for an environment/role
    fn stack_id(&self, environment: &str, role: RegionRole) -> StackId {
        StackId::new(environment, role, self.segment())
    }
}

/// `a`, `a and b`, `a, b and c`
pub(crate) fn join_nouns(nouns: &[&str]) -> String {
    match nouns {
        [] => String::new(),
        [only] => only.to_string(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}
