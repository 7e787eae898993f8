//! Cloud provider trait definition

use crate::error::Result;
use crate::resource::ResourceRecord;
use crate::state::{ResourceState, StackState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Cloud provider abstraction trait
///
/// A provider knows how to look up, create, and delete each resource kind.
/// The orchestrator drives the dependency ordering; the provider only deals
/// with one resource at a time.
///
/// Idempotency contract: [`create`](CloudProvider::create) on a resource
/// that already exists and [`delete`](CloudProvider::delete) on a resource
/// that is already gone must both succeed.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Returns the provider name (e.g., "aws")
    fn name(&self) -> &str;

    /// Returns the provider display name for UI
    fn display_name(&self) -> &str;

    /// Check if the provider is properly configured and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    /// Look up an existing resource by its cloud-side name.
    ///
    /// Returns `None` when the resource does not exist. `recorded` carries
    /// the identifiers of resources already provisioned in this run.
    async fn lookup(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> Result<Option<ResourceState>>;

    /// Create the resource with its fixed configuration and wait until it
    /// is ready for dependents. Returns the identifiers to record.
    async fn create(
        &self,
        record: &ResourceRecord,
        recorded: &StackState,
    ) -> Result<ResourceState>;

    /// Delete the resource. A resource that no longer exists is success.
    async fn delete(&self, record: &ResourceRecord, recorded: &StackState) -> Result<()>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account/user information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}
