//! Provisioning errors

use thiserror::Error;

/// The backend rejected a requested declaration.
///
/// Surfaced to the caller unchanged; retry semantics belong to the backend.
#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// A property value the backend does not accept
    #[error("{resource}: invalid parameter: {message}")]
    InvalidParameter { resource: String, message: String },

    /// Logical id or export name already used
    #[error("naming collision: {logical_id} is already declared")]
    NamingCollision { logical_id: String },

    /// Backend limit reached
    #[error("{resource}: quota exceeded (limit {limit})")]
    QuotaExceeded { resource: String, limit: usize },

    /// Backend refused the declaration for another reason
    #[error("declaration rejected: {0}")]
    Rejected(String),

    /// Declaration could not be recorded
    #[error("cannot serialize declaration: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProvisioningError {
    pub(crate) fn invalid(resource: &str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            resource: resource.to_string(),
            message: message.into(),
        }
    }
}

/// Result type for provisioning calls
pub type ProvisionResult<T> = Result<T, ProvisioningError>;
