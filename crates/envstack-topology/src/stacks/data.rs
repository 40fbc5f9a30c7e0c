//! Shared data stage: database cluster, credential and media bucket

use super::deletion_protected;
use crate::stage::{Stage, StageContext, StageError, StageInputs};
use envstack_common::{OutputKind, RegionRole};
use envstack_config::DatabaseSettings;
use envstack_provision::props::{
    BlockPublicAccess, BucketEncryption, BucketProps, ClusterInstance, Credentials,
    DatabaseClusterProps, DatabaseEngine, ExportProps, IngressRule, Protocol, RemovalPolicy,
    SecurityGroupProps,
};
use envstack_provision::{Output, Reference, StackScope, SubnetTier};

#[derive(Debug, Clone, Default)]
pub struct DataStage {
    database: DatabaseSettings,
}

impl DataStage {
    pub fn new(database: DatabaseSettings) -> Self {
        Self { database }
    }
}

impl Stage for DataStage {
    fn name(&self) -> &str {
        "data"
    }

    fn segment(&self) -> &str {
        "shared-data"
    }

    fn requires(&self) -> &[OutputKind] {
        &[OutputKind::Network]
    }

    fn produces(&self) -> &[OutputKind] {
        &[
            OutputKind::DatabaseCluster,
            OutputKind::Bucket,
            OutputKind::Credential,
        ]
    }

    fn description(&self, environment: &str, role: RegionRole) -> String {
        role.describe(&format!("Shared data infrastructure for {}", environment))
    }

    fn dependency_reason(&self, _producer: &dyn Stage) -> String {
        "data stack requires network handle".to_string()
    }

    fn build(
        &self,
        ctx: &StageContext<'_>,
        inputs: &StageInputs<'_>,
        scope: &mut StackScope,
    ) -> Result<Vec<Output>, StageError> {
        let network = inputs.network()?;
        let db = &self.database;

        // Only the network's own address space reaches the database port
        let security_group = ctx.provisioner.security_group(
            scope,
            "DbSecurityGroup",
            SecurityGroupProps {
                vpc: network.id().clone(),
                description: "Security group for Aurora PostgreSQL".to_string(),
                allow_all_outbound: false,
                ingress: vec![IngressRule {
                    peer: network.cidr_block(),
                    protocol: Protocol::Tcp,
                    port: db.port,
                    description: "Allow PostgreSQL from VPC".to_string(),
                }],
            },
        )?;

        let instance_class = &ctx.config.db_instance_class;
        let cluster = ctx.provisioner.database_cluster(
            scope,
            "AuroraCluster",
            DatabaseClusterProps {
                engine: DatabaseEngine::AuroraPostgres {
                    version: db.engine_version.clone(),
                },
                credentials: Credentials::GeneratedSecret {
                    username: db.admin_user.clone(),
                },
                default_database_name: db.database_name.clone(),
                writer: ClusterInstance::provisioned("Writer", instance_class),
                readers: vec![ClusterInstance::provisioned("Reader", instance_class)],
                vpc: network.id().clone(),
                subnets: network.select_subnets(SubnetTier::PrivateIsolated),
                security_groups: vec![security_group.id().clone()],
                port: db.port,
                storage_encrypted: true,
                require_tls: true,
                deletion_protection: deletion_protected(ctx.label),
                backup_retention_days: db.backup_retention_days,
                removal_policy: RemovalPolicy::Snapshot,
            },
        )?;

        let bucket = ctx.provisioner.bucket(
            scope,
            "MediaBucket",
            BucketProps {
                versioned: true,
                encryption: BucketEncryption::S3Managed,
                block_public_access: BlockPublicAccess::BlockAll,
                enforce_ssl: true,
                removal_policy: RemovalPolicy::Retain,
            },
        )?;

        let exports: [(&str, &Reference, &str); 3] = [
            (
                "ClusterEndpoint",
                cluster.writer_endpoint(),
                "Aurora Cluster Endpoint",
            ),
            (
                "ClusterReaderEndpoint",
                cluster.reader_endpoint(),
                "Aurora Cluster Reader Endpoint",
            ),
            ("BucketName", bucket.name(), "S3 Bucket Name"),
        ];
        for (name, value, description) in exports {
            let export = ExportProps {
                name: name.to_string(),
                value: value.clone(),
                description: description.to_string(),
                export_name: scope.stack().export_name(name),
            };
            ctx.provisioner.export(scope, export)?;
        }

        let credential = cluster.secret().clone();
        Ok(vec![
            Output::DatabaseCluster(cluster),
            Output::Bucket(bucket),
            Output::Credential(credential),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::test_support::build;
    use crate::stacks::NetworkStage;
    use crate::stage::StageInputs;
    use envstack_config::EnvironmentConfig;
    use std::collections::BTreeMap;

    fn data_for(environment: &str, role: RegionRole) -> serde_json::Value {
        let config = EnvironmentConfig::new(1024, 2048, 2, 1, 5, "r6g.medium");
        let (network, _) = build(&NetworkStage, environment, role, &config, &StageInputs::empty());
        let inputs = StageInputs::new(BTreeMap::from([(OutputKind::Network, &network[0])]));
        let (outputs, decl) = build(&DataStage::default(), environment, role, &config, &inputs);

        let kinds: Vec<OutputKind> = outputs.iter().map(Output::kind).collect();
        assert_eq!(
            kinds,
            vec![
                OutputKind::DatabaseCluster,
                OutputKind::Bucket,
                OutputKind::Credential
            ]
        );
        assert!(decl.export("ClusterReaderEndpoint").is_some());
        decl.resource("AuroraCluster").unwrap().properties.clone()
    }

    #[test]
    fn test_deletion_protection_follows_label() {
        assert_eq!(data_for("sandbox", RegionRole::Primary)["deletion_protection"], true);
        assert_eq!(data_for("production", RegionRole::Primary)["deletion_protection"], true);
        assert_eq!(data_for("demo", RegionRole::Primary)["deletion_protection"], false);
        assert_eq!(data_for("production", RegionRole::Dr)["deletion_protection"], false);
    }

    #[test]
    fn test_database_restricted_to_isolated_tier() {
        let cluster = data_for("uat", RegionRole::Primary);
        assert_eq!(cluster["subnets"]["tier"], "private_isolated");
        assert_eq!(cluster["storage_encrypted"], true);
        assert_eq!(cluster["writer"]["instance_class"], "r6g.medium");
        assert_eq!(cluster["readers"][0]["instance_class"], "r6g.medium");
    }

    #[test]
    fn test_requires_network() {
        let config = EnvironmentConfig::new(256, 512, 1, 1, 2, "t3.small");
        let provisioner = envstack_provision::DeclarativeProvisioner::new();
        let ctx = StageContext {
            environment: "uat",
            label: "uat",
            role: RegionRole::Primary,
            config: &config,
            provisioner: &provisioner,
        };
        let mut scope = StackScope::new(
            DataStage::default().stack_id("uat", RegionRole::Primary),
            envstack_common::StackPlacement::new("", "us-east-1"),
            "",
        );
        let err = DataStage::default()
            .build(&ctx, &StageInputs::empty(), &mut scope)
            .unwrap_err();
        assert!(matches!(err, StageError::DependencyUnavailable(OutputKind::Network)));
        assert!(scope.resources().is_empty());
    }
}
