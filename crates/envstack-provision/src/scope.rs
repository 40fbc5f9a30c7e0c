//! Per-stack declaration scope
//!
//! A [`StackScope`] collects everything one stack declares. It is owned by the
//! single stage invocation filling it and is frozen into a [`StackDeclaration`]
//! once that stage returns.

use crate::error::{ProvisionResult, ProvisioningError};
use crate::handles::Reference;
use crate::props::ExportProps;
use envstack_common::{StackId, StackPlacement};
use serde::Serialize;

/// Kind of a declared resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Vpc,
    FlowLog,
    SecurityGroup,
    DatabaseCluster,
    Secret,
    Bucket,
    Repository,
    ContainerCluster,
    LoadBalancedService,
}

/// One declared resource with its recorded properties
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    pub logical_id: String,
    pub kind: ResourceKind,
    pub properties: serde_json::Value,
}

/// Recorded named output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Export {
    pub name: String,
    pub export_name: String,
    pub value: Reference,
    pub description: String,
}

impl From<ExportProps> for Export {
    fn from(props: ExportProps) -> Self {
        Self {
            name: props.name,
            export_name: props.export_name,
            value: props.value,
            description: props.description,
        }
    }
}

/// In-progress declaration of one stack
#[derive(Debug)]
pub struct StackScope {
    stack: StackId,
    placement: StackPlacement,
    description: String,
    resources: Vec<Resource>,
    exports: Vec<Export>,
}

impl StackScope {
    pub fn new(stack: StackId, placement: StackPlacement, description: impl Into<String>) -> Self {
        Self {
            stack,
            placement,
            description: description.into(),
            resources: Vec::new(),
            exports: Vec::new(),
        }
    }

    pub fn stack(&self) -> &StackId {
        &self.stack
    }

    pub fn placement(&self) -> &StackPlacement {
        &self.placement
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn exports(&self) -> &[Export] {
        &self.exports
    }

    /// Deferred attribute of a resource in this stack
    pub fn reference(&self, logical_id: &str, attribute: &str) -> Reference {
        Reference::new(&self.stack, logical_id, attribute)
    }

    /// Whether a logical id is taken
    pub fn contains(&self, logical_id: &str) -> bool {
        self.resources.iter().any(|r| r.logical_id == logical_id)
    }

    /// Record a resource. Logical ids are unique within a stack.
    pub fn declare<P: Serialize>(
        &mut self,
        logical_id: &str,
        kind: ResourceKind,
        properties: &P,
    ) -> ProvisionResult<()> {
        if self.contains(logical_id) {
            return Err(ProvisioningError::NamingCollision {
                logical_id: format!("{}/{}", self.stack, logical_id),
            });
        }
        let properties = serde_json::to_value(properties)?;
        self.resources.push(Resource {
            logical_id: logical_id.to_string(),
            kind,
            properties,
        });
        Ok(())
    }

    /// Record a named output. Output ids and export names are unique within a stack.
    pub fn record_export(&mut self, export: Export) -> ProvisionResult<()> {
        if let Some(existing) = self
            .exports
            .iter()
            .find(|e| e.name == export.name || e.export_name == export.export_name)
        {
            return Err(ProvisioningError::NamingCollision {
                logical_id: format!("{}/{}", self.stack, existing.name),
            });
        }
        self.exports.push(export);
        Ok(())
    }

    /// Freeze into an immutable declaration
    pub fn finish(self) -> StackDeclaration {
        StackDeclaration {
            stack: self.stack,
            placement: self.placement,
            description: self.description,
            resources: self.resources,
            exports: self.exports,
        }
    }
}

/// Frozen declaration of one stack, ready for synthesis
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackDeclaration {
    pub stack: StackId,
    pub placement: StackPlacement,
    pub description: String,
    pub resources: Vec<Resource>,
    pub exports: Vec<Export>,
}

impl StackDeclaration {
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use envstack_common::RegionRole;
    use serde_json::json;

    fn scope() -> StackScope {
        StackScope::new(
            StackId::new("demo", RegionRole::Primary, "shared-data"),
            StackPlacement::new("123456789012", "us-east-1"),
            "Shared data infrastructure for demo",
        )
    }

    #[test]
    fn test_declare_and_finish() {
        let mut scope = scope();
        scope
            .declare("MediaBucket", ResourceKind::Bucket, &json!({"versioned": true}))
            .unwrap();
        let value = scope.reference("MediaBucket", "BucketName");
        scope
            .record_export(Export {
                name: "BucketName".into(),
                export_name: scope.stack().export_name("BucketName"),
                value,
                description: "Bucket name".into(),
            })
            .unwrap();

        let decl = scope.finish();
        assert_eq!(decl.resources.len(), 1);
        assert_eq!(decl.resource("MediaBucket").unwrap().properties["versioned"], true);
        assert_eq!(
            decl.export("BucketName").unwrap().export_name,
            "demo-shared-data-BucketName"
        );
    }

    #[test]
    fn test_logical_id_collision() {
        let mut scope = scope();
        scope.declare("Db", ResourceKind::DatabaseCluster, &json!({})).unwrap();
        let err = scope.declare("Db", ResourceKind::Bucket, &json!({})).unwrap_err();
        assert!(matches!(
            err,
            ProvisioningError::NamingCollision { ref logical_id } if logical_id == "demo-shared-data/Db"
        ));
    }

    #[test]
    fn test_export_collision() {
        let mut scope = scope();
        let export = Export {
            name: "BucketName".into(),
            export_name: "x".into(),
            value: scope.reference("MediaBucket", "BucketName"),
            description: String::new(),
        };
        scope.record_export(export.clone()).unwrap();
        assert!(scope.record_export(export).is_err());
    }
}
