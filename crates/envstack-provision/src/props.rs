//! Declaration properties accepted by a [`Provisioner`](crate::Provisioner).

use crate::handles::{Reference, SubnetSelection, SubnetTier};
use ipnet::Ipv4Net;
use serde::Serialize;
use std::collections::BTreeMap;

/// What happens to a resource when its stack is deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalPolicy {
    Destroy,
    Retain,
    Snapshot,
}

// =============================================================================
// Network
// =============================================================================

/// One subnet tier, repeated in every availability zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetConfiguration {
    pub name: String,
    pub tier: SubnetTier,
    pub cidr_mask: u8,
}

impl SubnetConfiguration {
    pub fn new(name: &str, tier: SubnetTier, cidr_mask: u8) -> Self {
        Self {
            name: name.to_string(),
            tier,
            cidr_mask,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowLogDestination {
    CloudWatchLogs,
    S3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficType {
    Accept,
    Reject,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowLogProps {
    pub destination: FlowLogDestination,
    pub traffic_type: TrafficType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VpcProps {
    pub cidr: Ipv4Net,
    pub max_azs: u32,
    pub nat_gateways: u32,
    pub subnet_configuration: Vec<SubnetConfiguration>,
    pub flow_log: Option<FlowLogProps>,
}

// =============================================================================
// Data
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    Tcp,
    Udp,
}

/// Inbound rule; everything not listed is denied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressRule {
    pub peer: Ipv4Net,
    pub protocol: Protocol,
    pub port: u16,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityGroupProps {
    pub vpc: Reference,
    pub description: String,
    pub allow_all_outbound: bool,
    pub ingress: Vec<IngressRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "engine", rename_all = "snake_case")]
pub enum DatabaseEngine {
    AuroraPostgres { version: String },
}

/// How the admin credential is obtained
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Credentials {
    /// The backend generates the password and stores it in a secret
    GeneratedSecret { username: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterInstance {
    pub name: String,
    pub instance_class: String,
}

impl ClusterInstance {
    pub fn provisioned(name: &str, instance_class: &str) -> Self {
        Self {
            name: name.to_string(),
            instance_class: instance_class.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseClusterProps {
    pub engine: DatabaseEngine,
    pub credentials: Credentials,
    pub default_database_name: String,
    pub writer: ClusterInstance,
    pub readers: Vec<ClusterInstance>,
    pub vpc: Reference,
    pub subnets: SubnetSelection,
    pub security_groups: Vec<Reference>,
    pub port: u16,
    pub storage_encrypted: bool,
    /// Reject non-TLS client connections
    pub require_tls: bool,
    pub deletion_protection: bool,
    pub backup_retention_days: u32,
    pub removal_policy: RemovalPolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BucketEncryption {
    S3Managed,
    KmsManaged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockPublicAccess {
    BlockAll,
    BlockAcls,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketProps {
    pub versioned: bool,
    pub encryption: BucketEncryption,
    pub block_public_access: BlockPublicAccess,
    /// Deny requests not made over TLS
    pub enforce_ssl: bool,
    pub removal_policy: RemovalPolicy,
}

// =============================================================================
// Service
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagMutability {
    Mutable,
    Immutable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LifecycleRule {
    pub max_image_count: u32,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryProps {
    pub repository_name: String,
    pub image_scan_on_push: bool,
    pub tag_mutability: TagMutability,
    pub lifecycle_rules: Vec<LifecycleRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerClusterProps {
    pub vpc: Reference,
    pub container_insights: bool,
}

/// Container image and runtime wiring of each task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskImage {
    pub repository_uri: Reference,
    pub tag: String,
    pub container_port: u16,
    pub environment: BTreeMap<String, String>,
    /// Variables injected from secrets at task start
    pub secrets: BTreeMap<String, Reference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitBreaker {
    pub enable: bool,
    pub rollback: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub path: String,
    pub interval_secs: u32,
    pub timeout_secs: u32,
    pub healthy_threshold: u32,
    pub unhealthy_threshold: u32,
}

/// Permission granted to the running tasks
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "grant", rename_all = "snake_case")]
pub enum Grant {
    BucketReadWrite { bucket: Reference },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalingMetric {
    CpuUtilization,
    MemoryUtilization,
}

/// Target-tracking trigger
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalingTrigger {
    pub name: String,
    pub metric: ScalingMetric,
    pub target_utilization_percent: u32,
    pub scale_in_cooldown_secs: u32,
    pub scale_out_cooldown_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScalingProps {
    pub min_capacity: u32,
    pub max_capacity: u32,
    pub triggers: Vec<ScalingTrigger>,
}

/// Service, load balancer, health check, grants and scaling in one declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadBalancedServiceProps {
    pub cluster: Reference,
    pub cpu: u32,
    pub memory_mib: u32,
    pub desired_count: u32,
    pub task_image: TaskImage,
    pub public_load_balancer: bool,
    pub assign_public_ip: bool,
    pub task_subnets: SubnetSelection,
    pub circuit_breaker: CircuitBreaker,
    pub min_healthy_percent: u32,
    pub max_healthy_percent: u32,
    pub health_check_grace_period_secs: u32,
    pub health_check: HealthCheck,
    pub grants: Vec<Grant>,
    pub scaling: ScalingProps,
}

// =============================================================================
// Outputs
// =============================================================================

/// Named output value exported for operators and other tools
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportProps {
    /// Output id within the stack, e.g. `VpcId`
    pub name: String,
    pub value: Reference,
    pub description: String,
    /// Account/region-wide export name
    pub export_name: String,
}
