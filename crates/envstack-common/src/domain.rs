//! Domain primitives

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which half of an environment's topology a stack belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionRole {
    /// The environment's home region
    Primary,
    /// Warm-standby replica in the configured DR region
    Dr,
}

impl RegionRole {
    /// Both roles, primary first
    pub const ALL: [RegionRole; 2] = [RegionRole::Primary, RegionRole::Dr];

    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Dr => "dr",
        }
    }

    /// Label handed to stack builders for an environment in this role.
    ///
    /// Primary stacks see the bare environment name; DR stacks see `<env>-dr`.
    pub fn environment_label(&self, environment: &str) -> String {
        match self {
            Self::Primary => environment.to_string(),
            Self::Dr => format!("{}-dr", environment),
        }
    }

    /// Prefix a human-readable description with the role marker.
    pub fn describe(&self, text: &str) -> String {
        match self {
            Self::Primary => text.to_string(),
            Self::Dr => format!("DR {}", lowercase_first(text)),
        }
    }
}

impl fmt::Display for RegionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn lowercase_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Stable stack identifier, e.g. `production-dr-shared-data`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StackId(String);

impl StackId {
    /// Build the identifier for `segment` (e.g. `shared-network`) of an environment/role.
    pub fn new(environment: &str, role: RegionRole, segment: &str) -> Self {
        Self(format!("{}-{}", role.environment_label(environment), segment))
    }

    /// Wrap an already-formatted identifier
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Export name for a named output of this stack (`<stack-id>-<suffix>`).
    pub fn export_name(&self, suffix: &str) -> String {
        format!("{}-{}", self.0, suffix)
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account and region a stack is deployed into.
///
/// Resolved once at process entry and threaded through every builder call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StackPlacement {
    /// Cloud account identifier (may be empty: resolved by the backend)
    pub account: String,
    /// Region code, e.g. `us-east-1`
    pub region: String,
}

impl StackPlacement {
    /// Create placement
    pub fn new(account: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for StackPlacement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.account.is_empty() {
            write!(f, "<unresolved>/{}", self.region)
        } else {
            write!(f, "{}/{}", self.account, self.region)
        }
    }
}

/// Kinds of typed output handle a stack can expose to downstream stacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Virtual network with subnet selection
    Network,
    /// Managed relational database cluster
    DatabaseCluster,
    /// Object storage bucket
    Bucket,
    /// Generated database credential reference
    Credential,
    /// Container orchestration cluster
    ContainerCluster,
    /// Load-balanced application service
    Service,
}

impl OutputKind {
    /// All output kinds in declaration order
    pub const ALL: [OutputKind; 6] = [
        OutputKind::Network,
        OutputKind::DatabaseCluster,
        OutputKind::Bucket,
        OutputKind::Credential,
        OutputKind::ContainerCluster,
        OutputKind::Service,
    ];

    /// Short noun used in dependency justifications
    pub fn noun(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::DatabaseCluster => "database",
            Self::Bucket => "bucket",
            Self::Credential => "credential",
            Self::ContainerCluster => "container cluster",
            Self::Service => "service",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.noun())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_id_naming() {
        let primary = StackId::new("production", RegionRole::Primary, "shared-network");
        let dr = StackId::new("production", RegionRole::Dr, "shared-network");

        assert_eq!(primary.as_str(), "production-shared-network");
        assert_eq!(dr.as_str(), "production-dr-shared-network");
        assert_eq!(dr.export_name("VpcId"), "production-dr-shared-network-VpcId");
    }

    #[test]
    fn test_role_labels_and_descriptions() {
        assert_eq!(RegionRole::Primary.environment_label("uat"), "uat");
        assert_eq!(RegionRole::Dr.environment_label("uat"), "uat-dr");
        assert_eq!(
            RegionRole::Dr.describe("Shared network infrastructure for uat"),
            "DR shared network infrastructure for uat"
        );
        assert_eq!(
            RegionRole::Primary.describe("Shared data infrastructure for uat"),
            "Shared data infrastructure for uat"
        );
    }

    #[test]
    fn test_serialized_forms() {
        assert_eq!(serde_json::to_string(&RegionRole::Dr).unwrap(), "\"dr\"");
        assert_eq!(
            serde_json::to_string(&OutputKind::DatabaseCluster).unwrap(),
            "\"database_cluster\""
        );
        let id = StackId::new("demo", RegionRole::Primary, "shared-data");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"demo-shared-data\"");
    }

    #[test]
    fn test_every_variant_is_distinct() {
        let labels: std::collections::HashSet<String> = RegionRole::ALL
            .iter()
            .map(|role| role.environment_label("uat"))
            .collect();
        assert_eq!(labels.len(), RegionRole::ALL.len());

        let nouns: std::collections::HashSet<&str> =
            OutputKind::ALL.iter().map(OutputKind::noun).collect();
        assert_eq!(nouns.len(), OutputKind::ALL.len());
        assert!(nouns.iter().all(|noun| !noun.is_empty()));
    }

    #[test]
    fn test_placement_display() {
        assert_eq!(StackPlacement::new("123", "us-east-1").to_string(), "123/us-east-1");
        assert_eq!(StackPlacement::new("", "us-west-2").to_string(), "<unresolved>/us-west-2");
    }
}
