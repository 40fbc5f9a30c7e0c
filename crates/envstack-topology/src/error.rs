//! Assembly errors

use envstack_common::{OutputKind, RegionRole, StackId};
use envstack_config::ConfigError;
use envstack_provision::ProvisioningError;
use thiserror::Error;

/// Stage graph construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// Two stages share a name
    #[error("duplicate stage name {0}")]
    DuplicateStage(String),

    /// Two stages produce the same output kind
    #[error("{kind} is produced by both the {first} and {second} stages")]
    DuplicateProducer {
        kind: OutputKind,
        first: String,
        second: String,
    },

    /// A required output kind has no producer
    #[error("{stage} stage requires {kind}, which no stage produces")]
    MissingProducer { stage: String, kind: OutputKind },

    /// Stage requirements form a cycle
    #[error("circular dependency between stages: {}", stages.join(", "))]
    CircularDependency { stages: Vec<String> },
}

/// Errors raised while assembling a topology.
///
/// `Configuration` and `Provisioning` are scoped to one environment and are
/// collected in [`Assembly::failures`](crate::Assembly::failures). Every other
/// variant is a contract violation and aborts the whole run.
#[derive(Debug, Error)]
pub enum AssemblyError {
    /// Config entry rejected before any builder ran
    #[error("environment {environment}: {source}")]
    Configuration {
        environment: String,
        #[source]
        source: ConfigError,
    },

    /// Backend rejected a declaration
    #[error("environment {environment} ({role}): stack {stack} failed: {source}")]
    Provisioning {
        environment: String,
        role: RegionRole,
        stack: StackId,
        #[source]
        source: ProvisioningError,
    },

    /// A stage asked for a handle it was not given
    #[error("stack {stack}: required {kind} handle is unavailable")]
    DependencyUnavailable { stack: StackId, kind: OutputKind },

    /// A stage returned without an output it declares
    #[error("stack {stack}: stage did not produce its {kind} output")]
    StageContract { stack: StackId, kind: OutputKind },

    /// Service profile or primary region rejected
    #[error(transparent)]
    Profile(ConfigError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Assembled topology breaks a structural invariant
    #[error("topology invariant violated: {0}")]
    Invariant(String),

    /// Strict mode: at least one environment failed
    #[error("{} environment assembly failure(s); first: {}", .0.len(), first_failure(.0))]
    Incomplete(Vec<AssemblyError>),
}

fn first_failure(failures: &[AssemblyError]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_default()
}

impl AssemblyError {
    /// Whether the error aborts the whole run rather than one environment
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Configuration { .. } | Self::Provisioning { .. })
    }

    /// Environment the error belongs to
    pub fn environment(&self) -> Option<&str> {
        match self {
            Self::Configuration { environment, .. } | Self::Provisioning { environment, .. } => {
                Some(environment)
            }
            _ => None,
        }
    }

    /// Region role that failed; `None` when the entry was rejected up front
    pub fn role(&self) -> Option<RegionRole> {
        match self {
            Self::Provisioning { role, .. } => Some(*role),
            _ => None,
        }
    }

    /// Stack that failed
    pub fn stack(&self) -> Option<&StackId> {
        match self {
            Self::Provisioning { stack, .. }
            | Self::DependencyUnavailable { stack, .. }
            | Self::StageContract { stack, .. } => Some(stack),
            _ => None,
        }
    }
}

/// Result type for assembly
pub type AssemblyResult<T> = Result<T, AssemblyError>;
