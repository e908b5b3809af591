//! Mailbox folder diagnostics.

use std::io::{self, Write};

use crate::mail::{MailFolder, MailSource, Result};
use crate::pipeline::config::INBOX_FOLDER;

/// Where a configured folder name was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderMatch {
    TopLevel,
    UnderInbox,
    /// Not found; the worker would read the inbox instead.
    InboxFallback,
}

#[derive(Debug, Clone)]
pub struct FolderReport {
    pub top_level: Vec<MailFolder>,
    pub inbox_children: Vec<MailFolder>,
    pub configured: String,
    pub configured_match: FolderMatch,
}

/// Lists top-level and inbox folders and locates `configured` among them.
pub async fn load_report(source: &dyn MailSource, configured: &str) -> Result<FolderReport> {
    let top_level = source.list_folders().await?;
    let inbox = source.resolve_folder(INBOX_FOLDER).await?;
    let inbox_children = source.list_child_folders(&inbox).await?;

    let configured_match = if top_level.iter().any(|f| f.display_name == configured) {
        FolderMatch::TopLevel
    } else if inbox_children.iter().any(|f| f.display_name == configured) {
        FolderMatch::UnderInbox
    } else {
        FolderMatch::InboxFallback
    };

    Ok(FolderReport {
        top_level,
        inbox_children,
        configured: configured.to_string(),
        configured_match,
    })
}

fn write_folder<W: Write>(out: &mut W, indent: &str, folder: &MailFolder) -> io::Result<()> {
    write!(out, "{}{}", indent, folder.display_name)?;
    if let (Some(unread), Some(total)) = (folder.unread_item_count, folder.total_item_count) {
        write!(out, " ({} unread / {} total)", unread, total)?;
    }
    writeln!(out)
}

pub fn write_report<W: Write>(report: &FolderReport, out: &mut W) -> io::Result<()> {
    writeln!(out, "Top-level folders:")?;
    for folder in &report.top_level {
        write_folder(out, "  ", folder)?;
    }

    writeln!(out)?;
    writeln!(out, "{} children:", INBOX_FOLDER)?;
    if report.inbox_children.is_empty() {
        writeln!(out, "  (none)")?;
    }
    for folder in &report.inbox_children {
        write_folder(out, "  ", folder)?;
    }

    writeln!(out)?;
    let location = match report.configured_match {
        FolderMatch::TopLevel => "found at top level".to_string(),
        FolderMatch::UnderInbox => format!("found under {}", INBOX_FOLDER),
        FolderMatch::InboxFallback => {
            format!("NOT FOUND, the worker will read {} instead", INBOX_FOLDER)
        }
    };
    writeln!(out, "Configured folder '{}': {}", report.configured, location)
}
