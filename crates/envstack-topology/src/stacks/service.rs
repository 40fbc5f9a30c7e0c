//! Application service stage

use crate::stage::{Stage, StageContext, StageError, StageInputs};
use envstack_common::{OutputKind, RegionRole};
use envstack_config::ServiceProfile;
use envstack_provision::props::{
    CircuitBreaker, ContainerClusterProps, ExportProps, Grant, HealthCheck, LifecycleRule,
    LoadBalancedServiceProps, RepositoryProps, ScalingMetric, ScalingProps, ScalingTrigger,
    TagMutability, TaskImage,
};
use envstack_provision::{Output, Reference, StackScope, SubnetTier};
use std::collections::BTreeMap;

const TARGET_UTILIZATION_PERCENT: u32 = 70;
const SCALING_COOLDOWN_SECS: u32 = 60;
const RETAINED_IMAGES: u32 = 10;

/// Load-balanced container service for the profile's application.
#[derive(Debug, Clone)]
pub struct ServiceStage {
    profile: ServiceProfile,
    segment: String,
}

impl ServiceStage {
    pub fn new(profile: ServiceProfile) -> Self {
        let segment = profile.stack_segment();
        Self { profile, segment }
    }

    fn health_check(&self) -> HealthCheck {
        HealthCheck {
            path: self.profile.health_check_path.clone(),
            interval_secs: 30,
            timeout_secs: 5,
            healthy_threshold: 2,
            unhealthy_threshold: 3,
        }
    }
}

impl Default for ServiceStage {
    fn default() -> Self {
        Self::new(ServiceProfile::default())
    }
}

fn scaling_trigger(name: &str, metric: ScalingMetric) -> ScalingTrigger {
    ScalingTrigger {
        name: name.to_string(),
        metric,
        target_utilization_percent: TARGET_UTILIZATION_PERCENT,
        scale_in_cooldown_secs: SCALING_COOLDOWN_SECS,
        scale_out_cooldown_secs: SCALING_COOLDOWN_SECS,
    }
}

impl Stage for ServiceStage {
    fn name(&self) -> &str {
        "service"
    }

    fn segment(&self) -> &str {
        &self.segment
    }

    fn requires(&self) -> &[OutputKind] {
        &[
            OutputKind::Network,
            OutputKind::DatabaseCluster,
            OutputKind::Bucket,
            OutputKind::Credential,
        ]
    }

    fn produces(&self) -> &[OutputKind] {
        &[OutputKind::ContainerCluster, OutputKind::Service]
    }

    fn description(&self, environment: &str, role: RegionRole) -> String {
        match role {
            RegionRole::Primary => {
                format!("{} service for {}", self.profile.display_name, environment)
            }
            RegionRole::Dr => {
                format!("DR {} service for {}", self.profile.display_name, environment)
            }
        }
    }

    fn dependency_reason(&self, producer: &dyn Stage) -> String {
        if producer.produces().contains(&OutputKind::DatabaseCluster) {
            return "service stack requires database and bucket from data stack".to_string();
        }
        format!("service stack requires outputs from {} stack", producer.name())
    }

    fn build(
        &self,
        ctx: &StageContext<'_>,
        inputs: &StageInputs<'_>,
        scope: &mut StackScope,
    ) -> Result<Vec<Output>, StageError> {
        let network = inputs.network()?;
        // Resolved up front so a missing handle fails before anything is declared
        inputs.database_cluster()?;
        let bucket = inputs.bucket()?;
        let credential = inputs.credential()?;
        let config = ctx.config;

        let cluster = ctx.provisioner.container_cluster(
            scope,
            "EcsCluster",
            ContainerClusterProps {
                vpc: network.id().clone(),
                container_insights: true,
            },
        )?;

        let repository = ctx.provisioner.repository(
            scope,
            "AppRepo",
            RepositoryProps {
                repository_name: format!("{}-{}", self.profile.repository_prefix, ctx.label),
                image_scan_on_push: true,
                tag_mutability: TagMutability::Mutable,
                lifecycle_rules: vec![LifecycleRule {
                    max_image_count: RETAINED_IMAGES,
                    description: format!("Keep only {} images", RETAINED_IMAGES),
                }],
            },
        )?;

        let secrets = BTreeMap::from([(
            self.profile.credential_variable.clone(),
            credential.secret_arn().clone(),
        )]);

        let service = ctx.provisioner.load_balanced_service(
            scope,
            "AppService",
            LoadBalancedServiceProps {
                cluster: cluster.name().clone(),
                cpu: config.cpu,
                memory_mib: config.memory,
                desired_count: config.desired_count,
                task_image: TaskImage {
                    repository_uri: repository.uri().clone(),
                    tag: self.profile.image_tag.clone(),
                    container_port: self.profile.container_port,
                    environment: self.profile.environment.clone(),
                    secrets,
                },
                public_load_balancer: true,
                assign_public_ip: false,
                task_subnets: network.select_subnets(SubnetTier::PrivateWithEgress),
                circuit_breaker: CircuitBreaker {
                    enable: true,
                    rollback: true,
                },
                min_healthy_percent: 100,
                max_healthy_percent: 200,
                health_check_grace_period_secs: 60,
                health_check: self.health_check(),
                grants: vec![Grant::BucketReadWrite {
                    bucket: bucket.arn().clone(),
                }],
                scaling: ScalingProps {
                    min_capacity: config.min_count,
                    max_capacity: config.max_count,
                    triggers: vec![
                        scaling_trigger("CpuScaling", ScalingMetric::CpuUtilization),
                        scaling_trigger("MemoryScaling", ScalingMetric::MemoryUtilization),
                    ],
                },
            },
        )?;

        let exports: [(&str, &str, &Reference, &str); 4] = [
            (
                "LoadBalancerDNS",
                "AlbDns",
                service.endpoint(),
                "Application Load Balancer DNS",
            ),
            (
                "EcrRepositoryUri",
                "EcrUri",
                repository.uri(),
                "ECR Repository URI",
            ),
            ("ClusterName", "ClusterName", cluster.name(), "ECS Cluster Name"),
            ("ServiceName", "ServiceName", service.name(), "ECS Service Name"),
        ];
        for (name, suffix, value, description) in exports {
            let export = ExportProps {
                name: name.to_string(),
                value: value.clone(),
                description: description.to_string(),
                export_name: scope.stack().export_name(suffix),
            };
            ctx.provisioner.export(scope, export)?;
        }

        Ok(vec![
            Output::ContainerCluster(cluster),
            Output::Service(service),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::test_support::build;
    use crate::stacks::{DataStage, NetworkStage};
    use envstack_config::EnvironmentConfig;

    fn build_service(
        environment: &str,
        role: RegionRole,
        config: &EnvironmentConfig,
    ) -> (Vec<Output>, envstack_provision::StackDeclaration) {
        let (network, _) = build(&NetworkStage, environment, role, config, &StageInputs::empty());
        let network_inputs = StageInputs::new(BTreeMap::from([(OutputKind::Network, &network[0])]));
        let (data, _) = build(&DataStage::default(), environment, role, config, &network_inputs);

        let mut available = BTreeMap::from([(OutputKind::Network, &network[0])]);
        for output in &data {
            available.insert(output.kind(), output);
        }
        build(
            &ServiceStage::default(),
            environment,
            role,
            config,
            &StageInputs::new(available),
        )
    }

    #[test]
    fn test_service_declaration() {
        let config = EnvironmentConfig::new(1024, 2048, 3, 2, 10, "r6g.large");
        let (outputs, decl) = build_service("production", RegionRole::Primary, &config);

        assert_eq!(decl.stack.as_str(), "production-app-django-api");
        assert_eq!(decl.description, "Django API service for production");
        assert_eq!(outputs.len(), 2);

        let service = &decl.resource("AppService").unwrap().properties;
        assert_eq!(service["desired_count"], 3);
        assert_eq!(service["scaling"]["min_capacity"], 2);
        assert_eq!(service["scaling"]["max_capacity"], 10);
        assert_eq!(service["assign_public_ip"], false);
        assert_eq!(service["task_subnets"]["tier"], "private_with_egress");
        assert_eq!(service["min_healthy_percent"], 100);
        assert_eq!(service["max_healthy_percent"], 200);
        assert_eq!(service["circuit_breaker"]["rollback"], true);
        assert_eq!(service["health_check"]["path"], "/health/");
        assert_eq!(service["task_image"]["environment"]["ALLOWED_HOSTS"], "*");
        assert_eq!(
            service["task_image"]["secrets"]["DATABASE_URL"]["logical_id"],
            "AuroraClusterSecret"
        );

        let triggers = service["scaling"]["triggers"].as_array().unwrap();
        assert_eq!(triggers.len(), 2);
        for trigger in triggers {
            assert_eq!(trigger["target_utilization_percent"], 70);
            assert_eq!(trigger["scale_in_cooldown_secs"], 60);
            assert_eq!(trigger["scale_out_cooldown_secs"], 60);
        }

        assert_eq!(
            decl.export("LoadBalancerDNS").unwrap().export_name,
            "production-app-django-api-AlbDns"
        );
        assert_eq!(
            decl.export("EcrRepositoryUri").unwrap().export_name,
            "production-app-django-api-EcrUri"
        );
    }

    #[test]
    fn test_dr_service_uses_dr_label() {
        let config = EnvironmentConfig::new(256, 512, 1, 1, 2, "t3.small")
            .with_dr("us-west-2")
            .derive_dr();
        let (_, decl) = build_service("uat", RegionRole::Dr, &config);

        assert_eq!(decl.stack.as_str(), "uat-dr-app-django-api");
        assert_eq!(decl.description, "DR Django API service for uat");
        let repo = &decl.resource("AppRepo").unwrap().properties;
        assert_eq!(repo["repository_name"], "django-uat-dr");
    }

    #[test]
    fn test_dependency_reason() {
        let reason = ServiceStage::default().dependency_reason(&DataStage::default());
        assert_eq!(reason, "service stack requires database and bucket from data stack");
    }
}
