//! Typed output handles
//!
//! A handle is a write-once view of something a stack declared. It exposes only
//! the accessors downstream stacks need, never the backend object itself.

use envstack_common::{OutputKind, StackId};
use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Deferred value resolved by the backend at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Reference {
    /// Stack declaring the resource
    pub stack: StackId,
    /// Resource logical id within the stack
    pub logical_id: String,
    /// Attribute read from the resource
    pub attribute: String,
}

impl Reference {
    pub fn new(stack: &StackId, logical_id: &str, attribute: &str) -> Self {
        Self {
            stack: stack.clone(),
            logical_id: logical_id.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${{{}.{}.{}}}", self.stack, self.logical_id, self.attribute)
    }
}

/// Subnet tiers declared in every network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubnetTier {
    /// Internet-facing, hosts load balancers and NAT gateways
    Public,
    /// Private with outbound egress through NAT
    PrivateWithEgress,
    /// No route in or out of the network
    PrivateIsolated,
}

/// One allocated subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subnet {
    pub tier: SubnetTier,
    /// Availability zone index, starting at 0
    pub availability_zone: u32,
    pub cidr: Ipv4Net,
    pub subnet_id: Reference,
}

/// Subnets picked from a network by tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetSelection {
    pub tier: SubnetTier,
    pub subnet_ids: Vec<Reference>,
}

impl SubnetSelection {
    pub fn is_empty(&self) -> bool {
        self.subnet_ids.is_empty()
    }
}

/// Isolated virtual network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkHandle {
    vpc_id: Reference,
    cidr_block: Ipv4Net,
    subnets: Vec<Subnet>,
}

impl NetworkHandle {
    pub fn new(vpc_id: Reference, cidr_block: Ipv4Net, subnets: Vec<Subnet>) -> Self {
        Self {
            vpc_id,
            cidr_block,
            subnets,
        }
    }

    /// Network identifier
    pub fn id(&self) -> &Reference {
        &self.vpc_id
    }

    /// Address space of the whole network
    pub fn cidr_block(&self) -> Ipv4Net {
        self.cidr_block
    }

    /// All subnets of one tier, in availability-zone order
    pub fn select_subnets(&self, tier: SubnetTier) -> SubnetSelection {
        SubnetSelection {
            tier,
            subnet_ids: self
                .subnets
                .iter()
                .filter(|s| s.tier == tier)
                .map(|s| s.subnet_id.clone())
                .collect(),
        }
    }

    pub fn subnets(&self) -> &[Subnet] {
        &self.subnets
    }
}

/// Security group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecurityGroupHandle {
    group_id: Reference,
}

impl SecurityGroupHandle {
    pub fn new(group_id: Reference) -> Self {
        Self { group_id }
    }

    pub fn id(&self) -> &Reference {
        &self.group_id
    }
}

/// Generated database credential.
///
/// The secret holds host, port, user and password; it is the only way the
/// service learns where its database lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialHandle {
    secret_arn: Reference,
}

impl CredentialHandle {
    pub fn new(secret_arn: Reference) -> Self {
        Self { secret_arn }
    }

    pub fn secret_arn(&self) -> &Reference {
        &self.secret_arn
    }
}

/// Managed relational database cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseClusterHandle {
    cluster_id: Reference,
    writer_endpoint: Reference,
    reader_endpoint: Reference,
    port: u16,
    secret: CredentialHandle,
}

impl DatabaseClusterHandle {
    pub fn new(
        cluster_id: Reference,
        writer_endpoint: Reference,
        reader_endpoint: Reference,
        port: u16,
        secret: CredentialHandle,
    ) -> Self {
        Self {
            cluster_id,
            writer_endpoint,
            reader_endpoint,
            port,
            secret,
        }
    }

    pub fn id(&self) -> &Reference {
        &self.cluster_id
    }

    /// Writer endpoint hostname
    pub fn writer_endpoint(&self) -> &Reference {
        &self.writer_endpoint
    }

    /// Load-balanced reader endpoint hostname
    pub fn reader_endpoint(&self) -> &Reference {
        &self.reader_endpoint
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Credential generated together with the cluster
    pub fn secret(&self) -> &CredentialHandle {
        &self.secret
    }
}

/// Object storage bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketHandle {
    bucket_name: Reference,
    bucket_arn: Reference,
}

impl BucketHandle {
    pub fn new(bucket_name: Reference, bucket_arn: Reference) -> Self {
        Self {
            bucket_name,
            bucket_arn,
        }
    }

    pub fn name(&self) -> &Reference {
        &self.bucket_name
    }

    pub fn arn(&self) -> &Reference {
        &self.bucket_arn
    }
}

/// Container image registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryHandle {
    repository_uri: Reference,
}

impl RepositoryHandle {
    pub fn new(repository_uri: Reference) -> Self {
        Self { repository_uri }
    }

    pub fn uri(&self) -> &Reference {
        &self.repository_uri
    }
}

/// Container orchestration cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerClusterHandle {
    cluster_name: Reference,
}

impl ContainerClusterHandle {
    pub fn new(cluster_name: Reference) -> Self {
        Self { cluster_name }
    }

    pub fn name(&self) -> &Reference {
        &self.cluster_name
    }
}

/// Load-balanced application service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceHandle {
    service_name: Reference,
    load_balancer_dns: Reference,
}

impl ServiceHandle {
    pub fn new(service_name: Reference, load_balancer_dns: Reference) -> Self {
        Self {
            service_name,
            load_balancer_dns,
        }
    }

    pub fn name(&self) -> &Reference {
        &self.service_name
    }

    /// Public DNS name of the load balancer
    pub fn endpoint(&self) -> &Reference {
        &self.load_balancer_dns
    }
}

/// Typed output a stack hands to its consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Output {
    Network(NetworkHandle),
    DatabaseCluster(DatabaseClusterHandle),
    Bucket(BucketHandle),
    Credential(CredentialHandle),
    ContainerCluster(ContainerClusterHandle),
    Service(ServiceHandle),
}

impl Output {
    pub fn kind(&self) -> OutputKind {
        match self {
            Self::Network(_) => OutputKind::Network,
            Self::DatabaseCluster(_) => OutputKind::DatabaseCluster,
            Self::Bucket(_) => OutputKind::Bucket,
            Self::Credential(_) => OutputKind::Credential,
            Self::ContainerCluster(_) => OutputKind::ContainerCluster,
            Self::Service(_) => OutputKind::Service,
        }
    }
}
