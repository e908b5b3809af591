//! Remote mailbox access.

pub mod auth;
mod error;
pub mod graph;
mod message;
mod source;

pub use auth::ClientCredentials;
pub use error::{MailError, MailErrorKind, Result};
pub use graph::{GraphMailSource, GraphSettings, RetryPolicy};
pub use message::{ContentType, Message};
pub use source::{FolderId, MailFolder, MailSource};
