//! Built-in stages: shared network, shared data, application service.

mod data;
mod network;
mod service;

pub use data::DataStage;
pub use network::NetworkStage;
pub use service::ServiceStage;

/// Long-lived environments whose databases are deletion-protected.
///
/// Matched against the exact label a stage receives, so `production-dr` is not
/// protected.
pub const PROTECTED_ENVIRONMENTS: [&str; 2] = ["production", "sandbox"];

pub fn deletion_protected(label: &str) -> bool {
    PROTECTED_ENVIRONMENTS.contains(&label)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::stage::{Stage, StageContext, StageInputs};
    use envstack_common::{RegionRole, StackPlacement};
    use envstack_config::EnvironmentConfig;
    use envstack_provision::{DeclarativeProvisioner, Output, StackDeclaration, StackScope};

    /// Build one stage against the reference backend
    pub fn build(
        stage: &dyn Stage,
        environment: &str,
        role: RegionRole,
        config: &EnvironmentConfig,
        inputs: &StageInputs<'_>,
    ) -> (Vec<Output>, StackDeclaration) {
        let provisioner = DeclarativeProvisioner::new();
        let label = role.environment_label(environment);
        let ctx = StageContext {
            environment,
            label: &label,
            role,
            config,
            provisioner: &provisioner,
        };
        let mut scope = StackScope::new(
            stage.stack_id(environment, role),
            StackPlacement::new("123456789012", "us-east-1"),
            stage.description(environment, role),
        );
        let outputs = stage.build(&ctx, inputs, &mut scope).unwrap();
        (outputs, scope.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_protection_uses_exact_label() {
        assert!(deletion_protected("production"));
        assert!(deletion_protected("sandbox"));
        assert!(!deletion_protected("uat"));
        assert!(!deletion_protected("demo"));
        assert!(!deletion_protected("production-dr"));
    }
}
