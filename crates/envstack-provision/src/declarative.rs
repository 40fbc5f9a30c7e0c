//! Reference backend: validate declarations and record them.
//!
//! Handles carry deterministic [`Reference`](crate::Reference) tokens instead of
//! live resource ids, so identical inputs always produce identical declarations.

use crate::error::{ProvisionResult, ProvisioningError};
use crate::handles::{
    BucketHandle, ContainerClusterHandle, CredentialHandle, DatabaseClusterHandle, NetworkHandle,
    RepositoryHandle, SecurityGroupHandle, ServiceHandle, Subnet, SubnetTier,
};
use crate::props::{
    BucketProps, ContainerClusterProps, Credentials, DatabaseClusterProps, ExportProps,
    LoadBalancedServiceProps, RepositoryProps, SecurityGroupProps, VpcProps,
};
use crate::provisioner::Provisioner;
use crate::scope::{ResourceKind, StackScope};
use ipnet::Ipv4Net;
use serde::Serialize;
use serde_json::json;
use std::collections::HashSet;
use std::net::Ipv4Addr;

/// Per-stack backend limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quotas {
    pub max_resources_per_stack: usize,
    pub max_exports_per_stack: usize,
}

impl Default for Quotas {
    fn default() -> Self {
        Self {
            max_resources_per_stack: 500,
            max_exports_per_stack: 200,
        }
    }
}

/// Validating, recording provisioner
#[derive(Debug, Clone, Default)]
pub struct DeclarativeProvisioner {
    quotas: Quotas,
}

impl DeclarativeProvisioner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quotas(quotas: Quotas) -> Self {
        Self { quotas }
    }

    fn declare<P: Serialize>(
        &self,
        scope: &mut StackScope,
        logical_id: &str,
        kind: ResourceKind,
        properties: &P,
    ) -> ProvisionResult<()> {
        if scope.resources().len() >= self.quotas.max_resources_per_stack {
            return Err(ProvisioningError::QuotaExceeded {
                resource: format!("{}/resources", scope.stack()),
                limit: self.quotas.max_resources_per_stack,
            });
        }
        scope.declare(logical_id, kind, properties)?;
        tracing::trace!("{}: declared {:?} {}", scope.stack(), kind, logical_id);
        Ok(())
    }
}

#[derive(Serialize)]
struct AllocatedVpc<'a> {
    #[serde(flatten)]
    props: &'a VpcProps,
    subnets: &'a [Subnet],
}

impl Provisioner for DeclarativeProvisioner {
    fn vpc(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: VpcProps,
    ) -> ProvisionResult<NetworkHandle> {
        if props.max_azs == 0 {
            return Err(ProvisioningError::invalid(id, "max_azs must be at least 1"));
        }
        if props.nat_gateways > props.max_azs {
            return Err(ProvisioningError::invalid(
                id,
                format!(
                    "{} NAT gateways exceed {} availability zones",
                    props.nat_gateways, props.max_azs
                ),
            ));
        }
        if props.subnet_configuration.is_empty() {
            return Err(ProvisioningError::invalid(id, "no subnet configuration"));
        }
        let mut names = HashSet::new();
        for config in &props.subnet_configuration {
            if !names.insert(config.name.as_str()) {
                return Err(ProvisioningError::invalid(
                    id,
                    format!("duplicate subnet group {}", config.name),
                ));
            }
        }
        let has_tier = |tier| props.subnet_configuration.iter().any(|c| c.tier == tier);
        if has_tier(SubnetTier::PrivateWithEgress) && props.nat_gateways == 0 {
            return Err(ProvisioningError::invalid(
                id,
                "private-with-egress subnets need at least one NAT gateway",
            ));
        }
        if props.nat_gateways > 0 && !has_tier(SubnetTier::Public) {
            return Err(ProvisioningError::invalid(id, "NAT gateways need a public subnet tier"));
        }

        let subnets = allocate_subnets(scope, id, &props)?;
        self.declare(
            scope,
            id,
            ResourceKind::Vpc,
            &AllocatedVpc {
                props: &props,
                subnets: &subnets,
            },
        )?;
        if let Some(flow_log) = &props.flow_log {
            self.declare(scope, &format!("{}FlowLog", id), ResourceKind::FlowLog, flow_log)?;
        }

        Ok(NetworkHandle::new(
            scope.reference(id, "VpcId"),
            props.cidr,
            subnets,
        ))
    }

    fn security_group(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: SecurityGroupProps,
    ) -> ProvisionResult<SecurityGroupHandle> {
        if props.description.trim().is_empty() {
            return Err(ProvisioningError::invalid(id, "description is required"));
        }
        if let Some(rule) = props.ingress.iter().find(|r| r.port == 0) {
            return Err(ProvisioningError::invalid(
                id,
                format!("ingress rule {:?} has port 0", rule.description),
            ));
        }
        self.declare(scope, id, ResourceKind::SecurityGroup, &props)?;
        Ok(SecurityGroupHandle::new(scope.reference(id, "GroupId")))
    }

    fn database_cluster(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: DatabaseClusterProps,
    ) -> ProvisionResult<DatabaseClusterHandle> {
        let instances = std::iter::once(&props.writer).chain(props.readers.iter());
        for instance in instances {
            let valid = instance
                .instance_class
                .split_once('.')
                .map(|(family, size)| !family.is_empty() && !size.is_empty())
                .unwrap_or(false);
            if !valid {
                return Err(ProvisioningError::invalid(
                    id,
                    format!(
                        "instance {} has invalid class {:?}",
                        instance.name, instance.instance_class
                    ),
                ));
            }
        }
        if props.port == 0 {
            return Err(ProvisioningError::invalid(id, "port must be non-zero"));
        }
        if !(1..=35).contains(&props.backup_retention_days) {
            return Err(ProvisioningError::invalid(
                id,
                format!(
                    "backup retention must be 1..=35 days (got {})",
                    props.backup_retention_days
                ),
            ));
        }
        if props.subnets.is_empty() {
            return Err(ProvisioningError::invalid(id, "no subnets selected"));
        }

        let Credentials::GeneratedSecret { username } = &props.credentials;
        let secret_id = format!("{}Secret", id);
        self.declare(scope, id, ResourceKind::DatabaseCluster, &props)?;
        self.declare(
            scope,
            &secret_id,
            ResourceKind::Secret,
            &json!({
                "username": username,
                "generated": true,
                "attached_to": id,
            }),
        )?;

        Ok(DatabaseClusterHandle::new(
            scope.reference(id, "ClusterIdentifier"),
            scope.reference(id, "Endpoint.Address"),
            scope.reference(id, "ReadEndpoint.Address"),
            props.port,
            CredentialHandle::new(scope.reference(&secret_id, "Arn")),
        ))
    }

    fn bucket(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: BucketProps,
    ) -> ProvisionResult<BucketHandle> {
        self.declare(scope, id, ResourceKind::Bucket, &props)?;
        Ok(BucketHandle::new(
            scope.reference(id, "BucketName"),
            scope.reference(id, "Arn"),
        ))
    }

    fn repository(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: RepositoryProps,
    ) -> ProvisionResult<RepositoryHandle> {
        let name = &props.repository_name;
        let valid_name = (2..=256).contains(&name.len())
            && name
                .chars()
                .next()
                .map(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
                .unwrap_or(false)
            && name.chars().all(|c| {
                c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '_' | '.' | '/')
            });
        if !valid_name {
            return Err(ProvisioningError::invalid(
                id,
                format!("invalid repository name {:?}", name),
            ));
        }
        if props.lifecycle_rules.iter().any(|r| r.max_image_count == 0) {
            return Err(ProvisioningError::invalid(id, "lifecycle rule keeps zero images"));
        }
        self.declare(scope, id, ResourceKind::Repository, &props)?;
        Ok(RepositoryHandle::new(scope.reference(id, "RepositoryUri")))
    }

    fn container_cluster(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: ContainerClusterProps,
    ) -> ProvisionResult<ContainerClusterHandle> {
        self.declare(scope, id, ResourceKind::ContainerCluster, &props)?;
        Ok(ContainerClusterHandle::new(scope.reference(id, "ClusterName")))
    }

    fn load_balanced_service(
        &self,
        scope: &mut StackScope,
        id: &str,
        props: LoadBalancedServiceProps,
    ) -> ProvisionResult<ServiceHandle> {
        validate_service(id, &props)?;
        self.declare(scope, id, ResourceKind::LoadBalancedService, &props)?;
        Ok(ServiceHandle::new(
            scope.reference(id, "ServiceName"),
            scope.reference(id, "LoadBalancer.DnsName"),
        ))
    }

    fn export(&self, scope: &mut StackScope, props: ExportProps) -> ProvisionResult<()> {
        if scope.exports().len() >= self.quotas.max_exports_per_stack {
            return Err(ProvisioningError::QuotaExceeded {
                resource: format!("{}/exports", scope.stack()),
                limit: self.quotas.max_exports_per_stack,
            });
        }
        scope.record_export(props.into())
    }
}

/// Carve every subnet group out of the VPC CIDR, tier-major then AZ-minor.
fn allocate_subnets(
    scope: &StackScope,
    id: &str,
    props: &VpcProps,
) -> ProvisionResult<Vec<Subnet>> {
    let start = u64::from(u32::from(props.cidr.network()));
    let end = u64::from(u32::from(props.cidr.broadcast())) + 1;
    let mut cursor = start;
    let mut subnets = Vec::new();

    for config in &props.subnet_configuration {
        if config.cidr_mask < props.cidr.prefix_len() || config.cidr_mask > 28 {
            return Err(ProvisioningError::invalid(
                id,
                format!(
                    "subnet group {} mask /{} does not fit {}",
                    config.name, config.cidr_mask, props.cidr
                ),
            ));
        }
        let size = 1u64 << (32 - u32::from(config.cidr_mask));
        for az in 0..props.max_azs {
            cursor = cursor.div_ceil(size) * size;
            if cursor + size > end {
                return Err(ProvisioningError::invalid(
                    id,
                    format!("{} is too small for every subnet group", props.cidr),
                ));
            }
            let address = Ipv4Addr::from(cursor as u32);
            let cidr = Ipv4Net::new(address, config.cidr_mask)
                .map_err(|e| ProvisioningError::invalid(id, e.to_string()))?;
            subnets.push(Subnet {
                tier: config.tier,
                availability_zone: az,
                cidr,
                subnet_id: scope.reference(
                    &format!("{}{}Subnet{}", id, config.name, az + 1),
                    "SubnetId",
                ),
            });
            cursor += size;
        }
    }

    Ok(subnets)
}

fn validate_service(id: &str, props: &LoadBalancedServiceProps) -> ProvisionResult<()> {
    if !fargate_size_supported(props.cpu, props.memory_mib) {
        return Err(ProvisioningError::invalid(
            id,
            format!(
                "unsupported task size cpu={} memory={}",
                props.cpu, props.memory_mib
            ),
        ));
    }

    let scaling = &props.scaling;
    if scaling.min_capacity > props.desired_count || props.desired_count > scaling.max_capacity {
        return Err(ProvisioningError::invalid(
            id,
            format!(
                "desired count {} outside scaling bounds {}..={}",
                props.desired_count, scaling.min_capacity, scaling.max_capacity
            ),
        ));
    }

    if props.min_healthy_percent > 100 || props.max_healthy_percent < 100 {
        return Err(ProvisioningError::invalid(
            id,
            format!(
                "healthy percent bounds {}..{} must straddle 100",
                props.min_healthy_percent, props.max_healthy_percent
            ),
        ));
    }

    let hc = &props.health_check;
    if !hc.path.starts_with('/') {
        return Err(ProvisioningError::invalid(id, "health check path must start with '/'"));
    }
    if !(5..=300).contains(&hc.interval_secs) || hc.timeout_secs == 0 || hc.timeout_secs >= hc.interval_secs {
        return Err(ProvisioningError::invalid(
            id,
            format!(
                "health check timeout {}s must be below interval {}s (5..=300)",
                hc.timeout_secs, hc.interval_secs
            ),
        ));
    }
    for threshold in [hc.healthy_threshold, hc.unhealthy_threshold] {
        if !(2..=10).contains(&threshold) {
            return Err(ProvisioningError::invalid(
                id,
                format!("health check threshold {} outside 2..=10", threshold),
            ));
        }
    }

    let mut trigger_names = HashSet::new();
    for trigger in &scaling.triggers {
        if !trigger_names.insert(trigger.name.as_str()) {
            return Err(ProvisioningError::invalid(
                id,
                format!("duplicate scaling trigger {}", trigger.name),
            ));
        }
        if !(1..=100).contains(&trigger.target_utilization_percent) {
            return Err(ProvisioningError::invalid(
                id,
                format!(
                    "trigger {} target {}% outside 1..=100",
                    trigger.name, trigger.target_utilization_percent
                ),
            ));
        }
    }

    let image = &props.task_image;
    if image.container_port == 0 {
        return Err(ProvisioningError::invalid(id, "container port must be non-zero"));
    }
    if let Some(key) = image.secrets.keys().find(|k| image.environment.contains_key(*k)) {
        return Err(ProvisioningError::invalid(
            id,
            format!("{} is both a plain variable and a secret", key),
        ));
    }
    if props.task_subnets.is_empty() {
        return Err(ProvisioningError::invalid(id, "no task subnets selected"));
    }

    Ok(())
}

/// Task sizes accepted by the serverless container runtime.
fn fargate_size_supported(cpu: u32, memory_mib: u32) -> bool {
    let (low, high, step) = match cpu {
        256 => return matches!(memory_mib, 512 | 1024 | 2048),
        512 => (1024, 4096, 1024),
        1024 => (2048, 8192, 1024),
        2048 => (4096, 16384, 1024),
        4096 => (8192, 30720, 1024),
        8192 => (16384, 61440, 4096),
        16384 => (32768, 122880, 8192),
        _ => return false,
    };
    (low..=high).contains(&memory_mib) && (memory_mib - low) % step == 0
}
