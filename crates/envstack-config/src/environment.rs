//! Per-environment sizing and behavior

use crate::error::{ConfigError, ConfigResult};
use ipnet::Ipv4Net;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Availability zones every network spans
pub const MAX_AVAILABILITY_ZONES: u32 = 2;

/// Desired and minimum task count of a DR warm standby
pub const WARM_STANDBY_COUNT: u32 = 1;

/// Sizing and behavior parameters for one environment.
///
/// Immutable once read from the table; the DR variant is produced by
/// [`EnvironmentConfig::derive_dr`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    /// Task CPU units (1024 = one vCPU)
    pub cpu: u32,
    /// Task memory in MiB
    pub memory: u32,
    /// Desired running task count
    pub desired_count: u32,
    /// Autoscaling lower bound
    pub min_count: u32,
    /// Autoscaling upper bound
    pub max_count: u32,
    /// Database instance class, e.g. `r6g.large`
    pub db_instance_class: String,
    /// Replicate into a DR region
    #[serde(default)]
    pub enable_dr: bool,
    /// DR region code (required when `enable_dr`)
    #[serde(default)]
    pub dr_region: String,
    /// NAT gateways for the private-with-egress tier
    #[serde(default = "default_nat_gateways")]
    pub nat_gateways: u32,
    /// Address space of the environment's network
    #[serde(default = "default_vpc_cidr")]
    pub vpc_cidr: Ipv4Net,
}

fn default_nat_gateways() -> u32 {
    1
}

fn default_vpc_cidr() -> Ipv4Net {
    Ipv4Net::new(std::net::Ipv4Addr::new(10, 0, 0, 0), 16).expect("/16 is a valid prefix")
}

fn instance_class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]*\.[a-z0-9]+$").expect("static pattern"))
}

impl EnvironmentConfig {
    /// Create a single-region config with default network sizing
    pub fn new(
        cpu: u32,
        memory: u32,
        desired_count: u32,
        min_count: u32,
        max_count: u32,
        db_instance_class: &str,
    ) -> Self {
        Self {
            cpu,
            memory,
            desired_count,
            min_count,
            max_count,
            db_instance_class: db_instance_class.to_string(),
            enable_dr: false,
            dr_region: String::new(),
            nat_gateways: default_nat_gateways(),
            vpc_cidr: default_vpc_cidr(),
        }
    }

    /// Enable DR replication into `region`
    pub fn with_dr(mut self, region: &str) -> Self {
        self.enable_dr = true;
        self.dr_region = region.to_string();
        self
    }

    /// Set NAT gateway count
    pub fn with_nat_gateways(mut self, nat_gateways: u32) -> Self {
        self.nat_gateways = nat_gateways;
        self
    }

    /// Set network address space
    pub fn with_vpc_cidr(mut self, cidr: Ipv4Net) -> Self {
        self.vpc_cidr = cidr;
        self
    }

    /// Check every invariant of the entry named `environment`.
    pub fn validate(&self, environment: &str, primary_region: &str) -> ConfigResult<()> {
        if self.cpu == 0 || self.memory == 0 {
            return Err(ConfigError::NonPositiveCompute {
                environment: environment.to_string(),
                cpu: self.cpu,
                memory: self.memory,
            });
        }

        if self.min_count > self.desired_count || self.desired_count > self.max_count {
            return Err(ConfigError::InvalidScalingBounds {
                environment: environment.to_string(),
                min: self.min_count,
                desired: self.desired_count,
                max: self.max_count,
            });
        }

        if !instance_class_pattern().is_match(&self.db_instance_class) {
            return Err(ConfigError::InvalidInstanceClass {
                environment: environment.to_string(),
                class: self.db_instance_class.clone(),
            });
        }

        if self.nat_gateways == 0 || self.nat_gateways > MAX_AVAILABILITY_ZONES {
            return Err(ConfigError::NatGatewaysOutOfRange {
                environment: environment.to_string(),
                nat_gateways: self.nat_gateways,
                max: MAX_AVAILABILITY_ZONES,
            });
        }

        if self.enable_dr {
            let region = self.dr_region.trim();
            if region.is_empty() {
                return Err(ConfigError::MissingDrRegion {
                    environment: environment.to_string(),
                });
            }
            if region == primary_region.trim() {
                return Err(ConfigError::DrRegionMatchesPrimary {
                    environment: environment.to_string(),
                    region: region.to_string(),
                });
            }
            if self.max_count < WARM_STANDBY_COUNT {
                return Err(ConfigError::WarmStandbyExceedsMax {
                    environment: environment.to_string(),
                    max: self.max_count,
                });
            }
        }

        Ok(())
    }

    /// Warm-standby variant used for the DR region.
    ///
    /// Only desired and minimum counts change; everything else is copied.
    pub fn derive_dr(&self) -> Self {
        Self {
            desired_count: WARM_STANDBY_COUNT,
            min_count: WARM_STANDBY_COUNT,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn production() -> EnvironmentConfig {
        EnvironmentConfig::new(1024, 2048, 3, 2, 10, "r6g.large").with_nat_gateways(2)
    }

    #[test]
    fn test_valid_config() {
        assert!(production().validate("production", "us-east-1").is_ok());
        assert!(production()
            .with_dr("us-west-2")
            .validate("production", "us-east-1")
            .is_ok());
    }

    #[test]
    fn test_scaling_bounds() {
        let cfg = EnvironmentConfig::new(256, 512, 1, 3, 2, "t3.small");
        let err = cfg.validate("uat", "us-east-1").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidScalingBounds { min: 3, max: 2, .. }));
        assert_eq!(err.environment(), Some("uat"));

        let cfg = EnvironmentConfig::new(256, 512, 5, 1, 2, "t3.small");
        assert!(matches!(
            cfg.validate("uat", "us-east-1"),
            Err(ConfigError::InvalidScalingBounds { desired: 5, .. })
        ));
    }

    #[test]
    fn test_compute_must_be_positive() {
        let cfg = EnvironmentConfig::new(0, 512, 1, 1, 2, "t3.small");
        assert!(matches!(
            cfg.validate("demo", "us-east-1"),
            Err(ConfigError::NonPositiveCompute { cpu: 0, .. })
        ));
    }

    #[test]
    fn test_dr_region_rules() {
        let mut cfg = production();
        cfg.enable_dr = true;
        assert!(matches!(
            cfg.validate("production", "us-east-1"),
            Err(ConfigError::MissingDrRegion { .. })
        ));

        let cfg = production().with_dr("us-east-1");
        assert!(matches!(
            cfg.validate("production", "us-east-1"),
            Err(ConfigError::DrRegionMatchesPrimary { .. })
        ));

        // Surrounding whitespace on either side does not hide a match
        let cfg = production().with_dr(" us-east-1");
        assert!(matches!(
            cfg.validate("production", "us-east-1 "),
            Err(ConfigError::DrRegionMatchesPrimary { .. })
        ));

        // DR region is irrelevant while DR is disabled
        let mut cfg = production();
        cfg.dr_region = "us-east-1".into();
        assert!(cfg.validate("production", "us-east-1").is_ok());
    }

    #[test]
    fn test_warm_standby_needs_capacity() {
        let cfg = EnvironmentConfig::new(256, 512, 0, 0, 0, "t3.small").with_dr("us-west-2");
        assert!(matches!(
            cfg.validate("scratch", "us-east-1"),
            Err(ConfigError::WarmStandbyExceedsMax { max: 0, .. })
        ));
    }

    #[test]
    fn test_instance_class_and_nat() {
        let cfg = EnvironmentConfig::new(256, 512, 1, 1, 2, "large");
        assert!(matches!(
            cfg.validate("uat", "us-east-1"),
            Err(ConfigError::InvalidInstanceClass { .. })
        ));

        let cfg = EnvironmentConfig::new(256, 512, 1, 1, 2, "t3.small").with_nat_gateways(3);
        assert!(matches!(
            cfg.validate("uat", "us-east-1"),
            Err(ConfigError::NatGatewaysOutOfRange { nat_gateways: 3, .. })
        ));
    }

    #[test]
    fn test_derive_dr_overrides_counts_only() {
        let cidr: Ipv4Net = "10.40.0.0/16".parse().unwrap();
        let primary = production().with_dr("us-west-2").with_vpc_cidr(cidr);
        let dr = primary.derive_dr();

        assert_eq!(dr.desired_count, 1);
        assert_eq!(dr.min_count, 1);
        assert_eq!(dr.max_count, primary.max_count);
        assert_eq!(dr.cpu, primary.cpu);
        assert_eq!(dr.db_instance_class, primary.db_instance_class);
        assert_eq!(dr.dr_region, primary.dr_region);
        assert_eq!(dr.nat_gateways, primary.nat_gateways);
        assert_eq!(dr.vpc_cidr, cidr);
    }

    proptest! {
        #[test]
        fn prop_derive_dr_is_warm_standby(
            cpu in 1u32..8192,
            memory in 1u32..30720,
            min in 0u32..20,
            extra_desired in 0u32..20,
            extra_max in 0u32..20,
            nat in 1u32..=2,
        ) {
            let desired = min + extra_desired;
            let max = desired + extra_max;
            let primary = EnvironmentConfig::new(cpu, memory, desired, min, max, "r6g.large")
                .with_nat_gateways(nat)
                .with_dr("eu-west-1");
            let dr = primary.derive_dr();

            prop_assert_eq!(dr.desired_count, WARM_STANDBY_COUNT);
            prop_assert_eq!(dr.min_count, WARM_STANDBY_COUNT);
            let restored = EnvironmentConfig {
                desired_count: primary.desired_count,
                min_count: primary.min_count,
                ..dr.clone()
            };
            prop_assert_eq!(restored, primary);
            // Idempotent
            prop_assert_eq!(dr.derive_dr(), dr);
        }
    }
}
