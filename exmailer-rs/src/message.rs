//! Outgoing message and attachment types

use crate::error::{ExMailerError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, warn};

/// Exchange rejects larger attachments on most deployments
pub const MAX_ATTACHMENT_SIZE: u64 = 25 * 1024 * 1024;

/// Message importance flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Importance {
    Low,
    #[default]
    Normal,
    High,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "Low",
            Importance::Normal => "Normal",
            Importance::High => "High",
        }
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Importance::Low),
            "normal" => Ok(Importance::Normal),
            "high" => Ok(Importance::High),
            other => Err(format!("invalid importance '{}' (expected low, normal or high)", other)),
        }
    }
}

/// Where an attachment's content comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    Path(PathBuf),
    Bytes { name: String, content: Vec<u8> },
}

impl From<PathBuf> for AttachmentSource {
    fn from(path: PathBuf) -> Self {
        AttachmentSource::Path(path)
    }
}

impl From<&Path> for AttachmentSource {
    fn from(path: &Path) -> Self {
        AttachmentSource::Path(path.to_path_buf())
    }
}

impl From<&str> for AttachmentSource {
    fn from(path: &str) -> Self {
        AttachmentSource::Path(PathBuf::from(path))
    }
}

/// A file attached to an outgoing message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub content_type: String,
    pub content: Vec<u8>,
}

impl Attachment {
    /// Load an attachment, inferring the MIME type from the file name
    pub fn load(source: &AttachmentSource) -> Result<Self> {
        match source {
            AttachmentSource::Path(path) => Self::from_path(path),
            AttachmentSource::Bytes { name, content } => {
                Ok(Self::from_bytes(name.clone(), content.clone()))
            }
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let path = expand_home(path);
        let attachment_error = |reason: String| ExMailerError::Attachment {
            path: path.clone(),
            reason,
        };

        if !path.exists() {
            return Err(attachment_error("file not found".to_string()));
        }
        if !path.is_file() {
            return Err(attachment_error("not a regular file".to_string()));
        }

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| attachment_error("path has no file name".to_string()))?;

        let content = std::fs::read(&path)
            .map_err(|e| attachment_error(format!("failed to read file: {}", e)))?;

        let size = content.len() as u64;
        if size > MAX_ATTACHMENT_SIZE {
            warn!(
                "Attachment {} is {:.1} MB (exceeds {} MB limit), the server may reject it",
                name,
                size as f64 / 1024.0 / 1024.0,
                MAX_ATTACHMENT_SIZE / 1024 / 1024
            );
        }

        let attachment = Self::from_bytes(name, content);
        debug!(
            "Attached {} ({} KB, {})",
            attachment.name,
            size / 1024,
            attachment.content_type
        );
        Ok(attachment)
    }

    pub fn from_bytes(name: impl Into<String>, content: Vec<u8>) -> Self {
        let name = name.into();
        let content_type = content_type_for(&name);
        Self {
            name,
            content_type,
            content,
        }
    }

    pub fn size(&self) -> usize {
        self.content.len()
    }
}

/// MIME type for a file name
///
/// Common office formats are mapped explicitly, everything else goes through
/// `mime_guess` and defaults to `application/octet-stream`.
pub fn content_type_for(filename: &str) -> String {
    let extension = Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let known = match extension.as_str() {
        "pdf" => Some("application/pdf"),
        "xlsx" => Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"),
        "xls" => Some("application/vnd.ms-excel"),
        "docx" => Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
        "doc" => Some("application/msword"),
        "pptx" => {
            Some("application/vnd.openxmlformats-officedocument.presentationml.presentation")
        }
        "zip" => Some("application/zip"),
        "txt" => Some("text/plain"),
        "csv" => Some("text/csv"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "rtf" => Some("application/rtf"),
        "msg" => Some("application/vnd.ms-outlook"),
        _ => None,
    };

    match known {
        Some(content_type) => content_type.to_string(),
        None => mime_guess::from_path(filename)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    }
}

fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Fully rendered message ready for the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub subject: String,
    pub html_body: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub attachments: Vec<Attachment>,
    pub importance: Importance,
}

impl EmailMessage {
    /// Every address the message is delivered to
    pub fn all_recipients(&self) -> impl Iterator<Item = &str> {
        self.to
            .iter()
            .chain(self.cc.iter())
            .chain(self.bcc.iter())
            .map(String::as_str)
    }
}
