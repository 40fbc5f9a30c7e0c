//! Configuration errors

use std::path::PathBuf;
use thiserror::Error;

/// A config entry that violates an invariant, or a config file that cannot be read.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Scaling bounds out of order
    #[error("{environment}: instance counts must satisfy min <= desired <= max (min={min}, desired={desired}, max={max})")]
    InvalidScalingBounds {
        environment: String,
        min: u32,
        desired: u32,
        max: u32,
    },

    /// The DR warm standby needs room for one task
    #[error("{environment}: DR warm standby needs max count >= 1 (max={max})")]
    WarmStandbyExceedsMax { environment: String, max: u32 },

    /// Zero CPU or memory
    #[error("{environment}: cpu and memory must be positive (cpu={cpu}, memory={memory})")]
    NonPositiveCompute {
        environment: String,
        cpu: u32,
        memory: u32,
    },

    /// DR enabled without a region
    #[error("{environment}: DR is enabled but no DR region is set")]
    MissingDrRegion { environment: String },

    /// DR region equal to the primary region
    #[error("{environment}: DR region {region} is the primary region")]
    DrRegionMatchesPrimary { environment: String, region: String },

    /// Instance class not of the form `<family>.<size>`
    #[error("{environment}: invalid database instance class {class:?}")]
    InvalidInstanceClass { environment: String, class: String },

    /// NAT gateway count outside 1..=availability zones
    #[error("{environment}: nat_gateways must be between 1 and {max} (got {nat_gateways})")]
    NatGatewaysOutOfRange {
        environment: String,
        nat_gateways: u32,
        max: u32,
    },

    /// Environment name unusable as a stack name prefix
    #[error("invalid environment name {0:?}: use lowercase letters, digits and '-'")]
    InvalidEnvironmentName(String),

    /// Environment name that would collide with another environment's DR stacks
    #[error("environment name {0:?} ends with the reserved DR suffix \"-dr\"")]
    ReservedSuffix(String),

    /// Primary region empty or padded with whitespace
    #[error("invalid primary region {0:?}")]
    InvalidPrimaryRegion(String),

    /// Invalid service profile
    #[error("invalid service profile: {0}")]
    InvalidServiceProfile(String),

    /// Config file could not be read
    #[error("cannot read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("cannot parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Environment the violation belongs to, if it is environment-scoped
    pub fn environment(&self) -> Option<&str> {
        match self {
            Self::InvalidScalingBounds { environment, .. }
            | Self::WarmStandbyExceedsMax { environment, .. }
            | Self::NonPositiveCompute { environment, .. }
            | Self::MissingDrRegion { environment }
            | Self::DrRegionMatchesPrimary { environment, .. }
            | Self::InvalidInstanceClass { environment, .. }
            | Self::NatGatewaysOutOfRange { environment, .. } => Some(environment),
            Self::InvalidEnvironmentName(name) | Self::ReservedSuffix(name) => Some(name),
            _ => None,
        }
    }
}

/// Result type for configuration
pub type ConfigResult<T> = Result<T, ConfigError>;
