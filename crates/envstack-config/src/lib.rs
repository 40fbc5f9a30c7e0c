//! envstack Config - Environment config table
//!
//! Pure data: which environments exist, how large each one is, and whether it
//! is replicated into a DR region. Nothing here touches a provisioning backend.
//!
//! | Environment | CPU  | Memory | Desired | Min | Max | DB class   |
//! |-------------|------|--------|---------|-----|-----|------------|
//! | production  | 1024 | 2048   | 3       | 2   | 10  | r6g.large  |
//! | sandbox     | 1024 | 2048   | 2       | 1   | 5   | r6g.medium |
//! | demo        | 512  | 1024   | 1       | 1   | 2   | r6g.medium |
//! | uat         | 256  | 512    | 1       | 1   | 2   | t3.small   |

pub mod deployment;
pub mod environment;
pub mod error;
pub mod profile;
pub mod table;

pub use deployment::{validate_primary_region, DeploymentConfig, DEFAULT_PRIMARY_REGION};
pub use environment::{EnvironmentConfig, MAX_AVAILABILITY_ZONES, WARM_STANDBY_COUNT};
pub use error::{ConfigError, ConfigResult};
pub use profile::{DatabaseSettings, ServiceProfile};
pub use table::{validate_entry, EnvironmentTable};
