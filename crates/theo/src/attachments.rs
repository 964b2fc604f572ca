//! File attachments folded into a query.

use std::path::Path;
use tracing::{debug, warn};

/// Separator between the typed question and attached file contents
pub const ATTACHMENT_SEPARATOR: &str = "--- Dateiinhalt ---";

#[derive(Debug, Clone, PartialEq)]
pub enum AttachmentContent {
    Text(String),
    /// Not sent to any model, only labeled
    Binary,
    /// Read failed; carries the error message
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    pub content: AttachmentContent,
}

impl Attachment {
    pub fn text(name: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            mime: "text/plain".to_string(),
            content: AttachmentContent::Text(content.to_string()),
        }
    }

    /// Read a file from disk. Never fails: read errors become `Unreadable`.
    pub async fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let guessed = mime_for(path);

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Attachment {}: read failed: {}", name, e);
                return Self {
                    name,
                    mime: guessed.unwrap_or("application/octet-stream").to_string(),
                    content: AttachmentContent::Unreadable(e.to_string()),
                };
            }
        };
        debug!("Attachment {}: {} bytes", name, bytes.len());

        let mime = match guessed {
            Some(m) => m,
            None if std::str::from_utf8(&bytes).is_ok() => "text/plain",
            None => "application/octet-stream",
        };

        let content = if !mime.starts_with("text/") {
            AttachmentContent::Binary
        } else {
            match String::from_utf8(bytes) {
                Ok(text) => AttachmentContent::Text(text),
                Err(e) => AttachmentContent::Unreadable(e.to_string()),
            }
        };

        Self {
            name,
            mime: mime.to_string(),
            content,
        }
    }

    /// Markdown block for this attachment
    pub fn render(&self, max_chars: usize) -> String {
        match &self.content {
            AttachmentContent::Text(text) => {
                format!("**{}:**\n```\n{}\n```", self.name, cut(text, max_chars))
            }
            AttachmentContent::Binary => {
                format!("**{}:** [Datei hochgeladen - {}]", self.name, self.mime)
            }
            AttachmentContent::Unreadable(err) => {
                format!("**{}:** [Fehler beim Lesen: {}]", self.name, err)
            }
        }
    }
}

fn mime_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "txt" | "log" | "rs" | "py" | "toml" | "yaml" | "yml" | "ini" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "xml" => "text/xml",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "zip" => "application/zip",
        _ => return None,
    };
    Some(mime)
}

fn cut(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// All attachments as one markdown section body
pub fn render_attachments(attachments: &[Attachment], max_chars: usize) -> String {
    attachments
        .iter()
        .map(|a| a.render(max_chars))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Query text with attachment contents appended
pub fn compose_input(text: &str, attachments: &[Attachment], max_chars: usize) -> String {
    if attachments.is_empty() {
        return text.to_string();
    }
    let files = render_attachments(attachments, max_chars);
    debug!(
        "Composed input: {} attachments, {} chars",
        attachments.len(),
        files.chars().count()
    );
    format!("{}\n\n{}\n{}", text, ATTACHMENT_SEPARATOR, files)
}
