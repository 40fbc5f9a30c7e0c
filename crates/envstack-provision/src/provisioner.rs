//! Provisioning backend boundary

use crate::error::ProvisionResult;
use crate::handles::{
    BucketHandle, ContainerClusterHandle, DatabaseClusterHandle, NetworkHandle, RepositoryHandle,
    SecurityGroupHandle, ServiceHandle,
};
use crate::props::{
    BucketProps, ContainerClusterProps, DatabaseClusterProps, ExportProps,
    LoadBalancedServiceProps, RepositoryProps, SecurityGroupProps, VpcProps,
};
use crate::scope::StackScope;

/// Resource constructs the topology core needs from a provisioning SDK.
///
/// Every call declares into the caller's [`StackScope`] and returns a typed
/// handle. Implementations hold no per-stack state, so a single provisioner can
/// serve concurrent assemblies.
pub trait Provisioner: Send + Sync {
    /// Network with subnet tiers per availability zone and optional flow logging
    fn vpc(&self, scope: &mut StackScope, id: &str, props: VpcProps)
        -> ProvisionResult<NetworkHandle>;

    fn security_group(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: SecurityGroupProps,
    ) -> ProvisionResult<SecurityGroupHandle>;

    /// Database cluster; the credential secret is generated alongside it
    fn database_cluster(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: DatabaseClusterProps,
    ) -> ProvisionResult<DatabaseClusterHandle>;

    fn bucket(&self, scope: &mut StackScope, id: &str, props: BucketProps)
        -> ProvisionResult<BucketHandle>;

    fn repository(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: RepositoryProps,
    ) -> ProvisionResult<RepositoryHandle>;

    fn container_cluster(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: ContainerClusterProps,
    ) -> ProvisionResult<ContainerClusterHandle>;

    /// Service behind a load balancer, submitted as one atomic declaration
    fn load_balanced_service(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: LoadBalancedServiceProps,
    ) -> ProvisionResult<ServiceHandle>;

    /// Export a named output value
    fn export(&self, scope: &mut StackScope, props: ExportProps) -> ProvisionResult<()>;
}
