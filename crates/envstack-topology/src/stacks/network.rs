//! Shared network stage

use crate::stage::{Stage, StageContext, StageError, StageInputs};
use envstack_common::{OutputKind, RegionRole};
use envstack_config::MAX_AVAILABILITY_ZONES;
use envstack_provision::props::{
    ExportProps, FlowLogDestination, FlowLogProps, SubnetConfiguration, TrafficType, VpcProps,
};
use envstack_provision::{Output, StackScope, SubnetTier};

const VPC_ID: &str = "Vpc";

/// Two-AZ network with public, private-with-egress and isolated tiers.
#[derive(Debug, Clone, Default)]
pub struct NetworkStage;

impl NetworkStage {
    pub fn new() -> Self {
        Self
    }
}

impl Stage for NetworkStage {
    fn name(&self) -> &str {
        "network"
    }

    fn segment(&self) -> &str {
        "shared-network"
    }

    fn requires(&self) -> &[OutputKind] {
        &[]
    }

    fn produces(&self) -> &[OutputKind] {
        &[OutputKind::Network]
    }

    fn description(&self, environment: &str, role: RegionRole) -> String {
        role.describe(&format!("Shared network infrastructure for {}", environment))
    }

    fn build(
        &self,
        ctx: &StageContext<'_>,
        _inputs: &StageInputs<'_>,
        scope: &mut StackScope,
    ) -> Result<Vec<Output>, StageError> {
        let props = VpcProps {
            cidr: ctx.config.vpc_cidr,
            max_azs: MAX_AVAILABILITY_ZONES,
            nat_gateways: ctx.config.nat_gateways,
            subnet_configuration: vec![
                SubnetConfiguration::new("Public", SubnetTier::Public, 24),
                SubnetConfiguration::new("Private", SubnetTier::PrivateWithEgress, 24),
                SubnetConfiguration::new("Isolated", SubnetTier::PrivateIsolated, 24),
            ],
            flow_log: Some(FlowLogProps {
                destination: FlowLogDestination::CloudWatchLogs,
                traffic_type: TrafficType::All,
            }),
        };
        let network = ctx.provisioner.vpc(scope, VPC_ID, props)?;

        let export = ExportProps {
            name: "VpcId".to_string(),
            value: network.id().clone(),
            description: "VPC ID".to_string(),
            export_name: scope.stack().export_name("VpcId"),
        };
        ctx.provisioner.export(scope, export)?;

        Ok(vec![Output::Network(network)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::test_support::build;
    use envstack_config::EnvironmentConfig;
    use envstack_provision::ResourceKind;

    #[test]
    fn test_network_declaration() {
        let config = EnvironmentConfig::new(1024, 2048, 3, 2, 10, "r6g.large").with_nat_gateways(2);
        let (outputs, decl) = build(
            &NetworkStage,
            "production",
            RegionRole::Primary,
            &config,
            &StageInputs::empty(),
        );

        assert_eq!(decl.stack.as_str(), "production-shared-network");
        assert_eq!(decl.description, "Shared network infrastructure for production");
        assert_eq!(decl.resource("Vpc").unwrap().properties["nat_gateways"], 2);
        assert_eq!(decl.resource("VpcFlowLog").unwrap().kind, ResourceKind::FlowLog);
        assert_eq!(
            decl.export("VpcId").unwrap().export_name,
            "production-shared-network-VpcId"
        );

        let Output::Network(network) = &outputs[0] else {
            panic!("expected network output");
        };
        assert_eq!(network.subnets().len(), 6);
        assert_eq!(network.select_subnets(SubnetTier::PrivateIsolated).subnet_ids.len(), 2);
    }

    #[test]
    fn test_dr_description() {
        assert_eq!(
            NetworkStage.description("uat", RegionRole::Dr),
            "DR shared network infrastructure for uat"
        );
        assert_eq!(
            NetworkStage.stack_id("uat", RegionRole::Dr).as_str(),
            "uat-dr-shared-network"
        );
    }
}
