//! Script Repository Port

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{errors::DomainError, Script};

/// Repository interface for Script entities
#[async_trait]
pub trait ScriptRepository: Send + Sync {
    /// Find a Script by ID
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Script>, DomainError>;

    /// Find all Scripts, newest first
    async fn find_all(&self) -> Result<Vec<Script>, DomainError>;

    /// Save a Script (insert or update)
    async fn save(&self, script: &Script) -> Result<Script, DomainError>;

    /// Delete a Script by ID
    async fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
}
