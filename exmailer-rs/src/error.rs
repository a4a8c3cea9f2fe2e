use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExMailerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required configuration fields in {origin}: {}", fields.join(", "))]
    MissingFields { origin: String, fields: Vec<String> },

    #[error("Invalid boolean value '{value}' for {field} (expected true/yes/1 or false/no/0)")]
    InvalidBoolean { field: String, value: String },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Template '{name}' not found. Available: {}", available.join(", "))]
    TemplateNotFound { name: String, available: Vec<String> },

    #[error("Layout '{name}' must contain exactly one {{body}} placeholder, found {markers}")]
    InvalidLayout { name: String, markers: usize },

    #[error("Template name '{0}' is reserved")]
    ReservedTemplateName(String),

    #[error("Missing template variable: {0}")]
    MissingVariable(String),

    #[error("Attachment error for {}: {reason}", path.display())]
    Attachment { path: PathBuf, reason: String },

    #[error("At least one recipient is required")]
    NoRecipients,

    #[error("Failed to send email: {0}")]
    Send(String),
}

/// Coarse classification of [`ExMailerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Authentication,
    Connection,
    Template,
    Attachment,
    Request,
    Send,
}

impl ExMailerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExMailerError::Config(_)
            | ExMailerError::MissingFields { .. }
            | ExMailerError::InvalidBoolean { .. } => ErrorKind::Configuration,
            ExMailerError::Authentication(_) => ErrorKind::Authentication,
            ExMailerError::Connection(_) => ErrorKind::Connection,
            ExMailerError::TemplateNotFound { .. }
            | ExMailerError::InvalidLayout { .. }
            | ExMailerError::ReservedTemplateName(_)
            | ExMailerError::MissingVariable(_) => ErrorKind::Template,
            ExMailerError::Attachment { .. } => ErrorKind::Attachment,
            ExMailerError::NoRecipients => ErrorKind::Request,
            ExMailerError::Send(_) => ErrorKind::Send,
        }
    }
}

pub type Result<T> = std::result::Result<T, ExMailerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_message_lists_every_field() {
        let err = ExMailerError::MissingFields {
            origin: "environment variables".to_string(),
            fields: vec!["password".to_string(), "server".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "Missing required configuration fields in environment variables: password, server"
        );
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_layout_error_mentions_placeholder() {
        let err = ExMailerError::InvalidLayout {
            name: "newsletter".to_string(),
            markers: 0,
        };

        assert_eq!(
            err.to_string(),
            "Layout 'newsletter' must contain exactly one {body} placeholder, found 0"
        );
        assert_eq!(err.kind(), ErrorKind::Template);
    }

    #[test]
    fn test_attachment_error_names_file() {
        let err = ExMailerError::Attachment {
            path: PathBuf::from("/tmp/report.pdf"),
            reason: "file not found".to_string(),
        };

        assert!(err.to_string().contains("/tmp/report.pdf"));
        assert_eq!(err.kind(), ErrorKind::Attachment);
    }
}
