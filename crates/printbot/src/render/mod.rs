pub mod html;
pub mod pdf;

use crate::error::RenderError;
use crate::mail::{ContentType, Message};

/// Subject used when a message has none.
pub const DEFAULT_SUBJECT: &str = "Order";

/// A message turned into something the printer accepts.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    /// `"{subject} — {received}"`.
    pub title: String,
    /// Plain text laid out in the PDF, kept for previews.
    pub text: String,
    pub pdf_bytes: Vec<u8>,
}

/// Pure conversion from a message to a printable document.
pub trait Renderer: Send + Sync {
    fn render(&self, message: &Message) -> Result<RenderedDocument, RenderError>;
}

/// Renders message bodies as monospaced A4 PDFs.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfRenderer;

impl PdfRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for PdfRenderer {
    fn render(&self, message: &Message) -> Result<RenderedDocument, RenderError> {
        let title = document_title(&message.subject, &message.received);
        let text = printable_text(message);
        let pdf_bytes = pdf::text_to_pdf(&title, &text)?;

        Ok(RenderedDocument {
            title,
            text,
            pdf_bytes,
        })
    }
}

fn subject_or_default(subject: &str) -> &str {
    let subject = subject.trim();
    if subject.is_empty() {
        DEFAULT_SUBJECT
    } else {
        subject
    }
}

/// Print job title for a message.
pub fn document_title(subject: &str, received: &str) -> String {
    format!("{} — {}", subject_or_default(subject), received)
}

/// Placeholder printed for messages without any content.
pub fn placeholder_text(subject: &str, sender: &str) -> String {
    format!(
        "(No content)\nSubject: {}\nFrom: {}",
        subject_or_default(subject),
        sender
    )
}

/// Text to print: the body, else the provider preview, else a placeholder.
pub fn printable_text(message: &Message) -> String {
    if !message.body.trim().is_empty() {
        let text = match message.content_type {
            ContentType::Html => html::html_to_text(&message.body),
            ContentType::Text => message.body.clone(),
        };
        if !text.trim().is_empty() {
            return text;
        }
    }

    if !message.body_preview.trim().is_empty() {
        return message.body_preview.clone();
    }

    placeholder_text(&message.subject, &message.sender)
}
