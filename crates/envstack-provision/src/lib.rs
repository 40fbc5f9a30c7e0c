//! Provisioning boundary for the topology assembler.
//!
//! Stack builders never talk to a cloud SDK directly. They call a
//! [`Provisioner`], which records each resource into the [`StackScope`] of the
//! stack being built and hands back a typed handle. [`DeclarativeProvisioner`]
//! is the built-in backend: it validates every declaration and records it for
//! synthesis.

pub mod declarative;
pub mod error;
pub mod handles;
pub mod props;
pub mod provisioner;
pub mod scope;

pub use declarative::{DeclarativeProvisioner, Quotas};
pub use error::{ProvisionResult, ProvisioningError};
pub use handles::{
    BucketHandle, ContainerClusterHandle, CredentialHandle, DatabaseClusterHandle, NetworkHandle,
    Output, Reference, RepositoryHandle, SecurityGroupHandle, ServiceHandle, Subnet,
    SubnetSelection, SubnetTier,
};
pub use provisioner::Provisioner;
pub use scope::{Export, Resource, ResourceKind, StackDeclaration, StackScope};
