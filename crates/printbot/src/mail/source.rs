//! Abstract mailbox interface consumed by the pipeline.

use async_trait::async_trait;
use serde::Deserialize;

use super::error::Result;
use super::message::Message;

/// Opaque provider folder identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderId(String);

impl FolderId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for FolderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A folder as listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MailFolder {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub unread_item_count: Option<u64>,
    #[serde(default)]
    pub total_item_count: Option<u64>,
    #[serde(default)]
    pub child_folder_count: Option<u64>,
}

impl MailFolder {
    pub fn folder_id(&self) -> FolderId {
        FolderId::new(self.id.clone())
    }
}

/// Operations the ingestion pipeline needs from a mailbox.
#[async_trait]
pub trait MailSource: Send + Sync {
    /// Resolves a folder by display name.
    ///
    /// Search order: top-level folders, then children of the inbox, then the
    /// inbox itself. Never fails because the name is missing.
    async fn resolve_folder(&self, display_name: &str) -> Result<FolderId>;

    /// Returns the child of `parent` named `display_name`, creating it when absent.
    async fn get_or_create_child_folder(
        &self,
        parent: &FolderId,
        display_name: &str,
    ) -> Result<FolderId>;

    /// Lists up to `limit` unread messages in `folder`, oldest first.
    /// When `sender` is set, only messages from that address are returned.
    async fn list_unread(
        &self,
        folder: &FolderId,
        sender: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Message>>;

    /// Moves message `message_id` into `destination`.
    async fn move_message(&self, message_id: &str, destination: &FolderId) -> Result<()>;

    /// Lists the top-level folders of the mailbox.
    async fn list_folders(&self) -> Result<Vec<MailFolder>>;

    /// Lists the direct children of `parent`.
    async fn list_child_folders(&self, parent: &FolderId) -> Result<Vec<MailFolder>>;
}
