//! Admin inventory control plane: per-category implementation status and
//! free-form comments.
//!
//! Writes go straight to the [`InventoryStore`] with no buffering. A write
//! that fails is logged and reported back; it is never retried.

use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use cloudaudit_model::{
    CategoryId, InventoryCommand, InventoryComment, InventoryEntry,
    InventoryResponse, InventorySnapshot, InventoryStatus,
};
use parking_lot::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{AuditError, Result, ValidationError};

#[async_trait]
pub trait InventoryStore: Send + Sync {
    async fn put_status(&self, entry: InventoryEntry) -> Result<()>;

    async fn get_comment(&self, id: Uuid) -> Result<Option<InventoryComment>>;

    async fn put_comment(&self, comment: InventoryComment) -> Result<()>;

    /// Returns `false` when nothing was stored under `id`.
    async fn delete_comment(&self, id: Uuid) -> Result<bool>;

    async fn snapshot(&self) -> Result<InventorySnapshot>;
}

#[derive(Default)]
struct InventoryState {
    entries: BTreeMap<CategoryId, InventoryEntry>,
    comments: BTreeMap<Uuid, InventoryComment>,
}

#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    state: Arc<RwLock<InventoryState>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for InMemoryInventoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("InMemoryInventoryStore")
            .field("entries", &state.entries.len())
            .field("comments", &state.comments.len())
            .finish()
    }
}

#[async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn put_status(&self, entry: InventoryEntry) -> Result<()> {
        self.state.write().entries.insert(entry.category, entry);
        Ok(())
    }

    async fn get_comment(&self, id: Uuid) -> Result<Option<InventoryComment>> {
        Ok(self.state.read().comments.get(&id).cloned())
    }

    async fn put_comment(&self, comment: InventoryComment) -> Result<()> {
        self.state.write().comments.insert(comment.id, comment);
        Ok(())
    }

    async fn delete_comment(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().comments.remove(&id).is_some())
    }

    async fn snapshot(&self) -> Result<InventorySnapshot> {
        let state = self.state.read();
        Ok(InventorySnapshot {
            taken_at: Utc::now(),
            entries: state.entries.values().cloned().collect(),
            comments: state.comments.values().cloned().collect(),
        })
    }
}

/// Applies [`InventoryCommand`]s against a store.
#[derive(Clone)]
pub struct InventoryService {
    store: Arc<dyn InventoryStore>,
}

impl fmt::Debug for InventoryService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryService").finish_non_exhaustive()
    }
}

fn parse_category(raw: &str) -> Result<CategoryId> {
    raw.parse::<CategoryId>()
        .map_err(|err| ValidationError::UnknownCategory(err).into())
}

fn require_text(text: &str) -> Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "text",
            message: "comment text must not be empty".into(),
        }
        .into());
    }
    Ok(trimmed.to_string())
}

fn written(message: String) -> InventoryResponse {
    InventoryResponse {
        success: true,
        message,
        persisted: true,
        comment: None,
        backup: None,
    }
}

fn not_written(message: String) -> InventoryResponse {
    InventoryResponse {
        success: false,
        message,
        persisted: false,
        comment: None,
        backup: None,
    }
}

impl InventoryService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn snapshot(&self) -> Result<InventorySnapshot> {
        self.store.snapshot().await
    }

    pub async fn handle(
        &self,
        command: InventoryCommand,
    ) -> Result<InventoryResponse> {
        match command {
            InventoryCommand::UpdateStatus { category, status } => {
                self.update_status(parse_category(&category)?, status).await
            }
            InventoryCommand::AddComment {
                category,
                text,
                author,
            } => {
                let category = parse_category(&category)?;
                let comment = InventoryComment {
                    id: Uuid::now_v7(),
                    category,
                    text: require_text(&text)?,
                    author: author.filter(|a| !a.trim().is_empty()),
                    created_at: Utc::now(),
                    updated_at: None,
                };
                Ok(self.write_comment(comment, "added").await)
            }
            InventoryCommand::UpdateComment { comment_id, text } => {
                let text = require_text(&text)?;
                let mut comment = self
                    .store
                    .get_comment(comment_id)
                    .await?
                    .ok_or_else(|| {
                        AuditError::NotFound(format!("comment {comment_id}"))
                    })?;
                comment.text = text;
                comment.updated_at = Some(Utc::now());
                Ok(self.write_comment(comment, "updated").await)
            }
            InventoryCommand::DeleteComment { comment_id } => {
                match self.store.delete_comment(comment_id).await {
                    Ok(true) => {
                        Ok(written(format!("Comment {comment_id} deleted")))
                    }
                    Ok(false) => Err(AuditError::NotFound(format!(
                        "comment {comment_id}"
                    ))),
                    Err(err) => {
                        warn!(%comment_id, error = %err, "comment delete not persisted");
                        Ok(not_written(format!(
                            "Comment {comment_id} could not be deleted: {err}"
                        )))
                    }
                }
            }
            InventoryCommand::CreateBackup => {
                let backup = self.store.snapshot().await?;
                info!(
                    entries = backup.entries.len(),
                    comments = backup.comments.len(),
                    "inventory backup created"
                );
                let mut response = written(format!(
                    "Backup created with {} entries and {} comments",
                    backup.entries.len(),
                    backup.comments.len()
                ));
                response.backup = Some(backup);
                Ok(response)
            }
        }
    }

    async fn update_status(
        &self,
        category: CategoryId,
        status: InventoryStatus,
    ) -> Result<InventoryResponse> {
        let entry = InventoryEntry {
            category,
            status,
            updated_at: Utc::now(),
        };
        match self.store.put_status(entry).await {
            Ok(()) => {
                info!(%category, ?status, "inventory status updated");
                Ok(written(format!("Status of {category} updated")))
            }
            Err(err) => {
                warn!(%category, error = %err, "inventory status not persisted");
                Ok(not_written(format!(
                    "Status of {category} could not be persisted: {err}"
                )))
            }
        }
    }

    async fn write_comment(
        &self,
        comment: InventoryComment,
        verb: &str,
    ) -> InventoryResponse {
        let id = comment.id;
        let mut response = match self.store.put_comment(comment.clone()).await
        {
            Ok(()) => written(format!("Comment {id} {verb}")),
            Err(err) => {
                warn!(comment_id = %id, error = %err, "comment not persisted");
                not_written(format!("Comment {id} could not be persisted: {err}"))
            }
        };
        response.comment = Some(comment);
        response
    }
}
