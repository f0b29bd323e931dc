//! Script Application Service (Use Case)
//!
//! Orchestrates domain operations for saved call scripts.

use std::sync::Arc;
use uuid::Uuid;

use callflow::{DomainError, Script, ScriptFlow, ScriptRepository};

/// Application service for Script operations
pub struct ScriptService<R: ScriptRepository> {
    repo: Arc<R>,
}

impl<R: ScriptRepository> ScriptService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// Get all scripts, newest first
    pub async fn list_all(&self) -> Result<Vec<Script>, DomainError> {
        let mut scripts = self.repo.find_all().await?;
        scripts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(scripts)
    }

    pub async fn get_by_id(&self, id: Uuid) -> Result<Script, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Script", id))
    }

    /// Create a new script after validating its flow
    pub async fn create(
        &self,
        name: String,
        flow: ScriptFlow,
        language: Option<String>,
        voice: Option<String>,
    ) -> Result<Script, DomainError> {
        let script = Script::new(name, flow, language, voice)?;
        let saved = self.repo.save(&script).await?;

        tracing::info!("📝 Created script: {} ({})", saved.name, saved.id);

        Ok(saved)
    }

    /// Delete a script; running calls keep their own copy of the flow
    pub async fn delete(&self, id: Uuid) -> Result<(), DomainError> {
        if !self.repo.delete(id).await? {
            return Err(DomainError::not_found("Script", id));
        }
        tracing::info!("🗑️  Deleted script {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::InMemoryScripts;
    use callflow::ScriptStep;

    fn service() -> ScriptService<InMemoryScripts> {
        ScriptService::new(Arc::new(InMemoryScripts::default()))
    }

    fn flow() -> ScriptFlow {
        ScriptFlow::new(
            vec![ScriptStep::new("Press 1 to confirm.", 1, 10)],
            "Goodbye.",
        )
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let service = service();
        let script = service
            .create("Reminder".to_string(), flow(), None, Some("Amy".to_string()))
            .await
            .unwrap();

        let fetched = service.get_by_id(script.id).await.unwrap();
        assert_eq!(fetched.name, "Reminder");
        assert_eq!(fetched.voice, "Amy");
        assert_eq!(service.list_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_rejects_empty_flow() {
        let service = service();
        let result = service
            .create(
                "Empty".to_string(),
                ScriptFlow::new(Vec::new(), "Bye."),
                None,
                None,
            )
            .await;
        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert!(service.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let service = service();
        assert!(matches!(
            service.delete(Uuid::new_v4()).await,
            Err(DomainError::NotFound { .. })
        ));
    }
}
