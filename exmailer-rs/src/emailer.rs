//! Send orchestration
//!
//! [`Emailer`] owns an open transport for its whole lifetime. Creating it
//! connects, dropping it (or calling [`Emailer::close`]) releases the
//! connection exactly once.

use crate::config::{ConfigResolver, Settings};
use crate::error::{ExMailerError, Result};
use crate::message::{Attachment, AttachmentSource, EmailMessage, Importance};
use crate::templates::{TemplateRegistry, TemplateRenderer, TemplateSelector};
use crate::transport::{SendDisposition, Transport};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Everything needed for one `send_email` call
#[derive(Debug, Clone)]
pub struct SendRequest {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    /// `None` sends the body without a layout
    pub template: Option<TemplateSelector>,
    /// Applied to subject and body when present
    pub template_vars: Option<HashMap<String, String>>,
    pub attachments: Vec<AttachmentSource>,
    pub importance: Importance,
}

impl SendRequest {
    /// Request using the default (Persian) layout and no variables
    pub fn new<I, S>(subject: impl Into<String>, body: impl Into<String>, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            subject: subject.into(),
            body: body.into(),
            recipients: recipients.into_iter().map(Into::into).collect(),
            cc: Vec::new(),
            bcc: Vec::new(),
            template: Some(TemplateSelector::default()),
            template_vars: None,
            attachments: Vec::new(),
            importance: Importance::default(),
        }
    }

    pub fn cc<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cc = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn bcc<I, S>(mut self, addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bcc = addresses.into_iter().map(Into::into).collect();
        self
    }

    pub fn template(mut self, selector: impl Into<TemplateSelector>) -> Self {
        self.template = Some(selector.into());
        self
    }

    /// Send the body as is
    pub fn plain(mut self) -> Self {
        self.template = None;
        self
    }

    pub fn var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.template_vars
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn vars(mut self, vars: HashMap<String, String>) -> Self {
        self.template_vars = Some(vars);
        self
    }

    pub fn attach(mut self, source: impl Into<AttachmentSource>) -> Self {
        self.attachments.push(source.into());
        self
    }

    pub fn importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }
}

/// Sends templated email over a connected [`Transport`]
pub struct Emailer<T: Transport> {
    settings: Settings,
    transport: T,
    registry: Arc<TemplateRegistry>,
    connected: bool,
}

impl<T: Transport> Emailer<T> {
    /// Connect `transport` with `settings`
    ///
    /// Nothing needs releasing when this fails.
    pub fn connect(settings: Settings, mut transport: T) -> Result<Self> {
        info!(
            "Connecting to {} as {}",
            settings.ews_endpoint(),
            settings.login_name()
        );

        if let Err(e) = transport.connect(&settings) {
            error!("Failed to connect to {}: {}", settings.server(), e);
            return Err(e);
        }

        Ok(Self {
            settings,
            transport,
            registry: TemplateRegistry::global(),
            connected: true,
        })
    }

    /// Resolve settings, then connect
    pub fn from_resolver(resolver: &ConfigResolver, transport: T) -> Result<Self> {
        let settings = resolver.resolve()?;
        Self::connect(settings, transport)
    }

    /// Use `registry` instead of the process-wide one
    pub fn with_registry(mut self, registry: Arc<TemplateRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Render, assemble and submit one message
    ///
    /// Returns `Ok(true)` once the transport accepted the message. Every
    /// failure is returned as an error.
    pub fn send_email(&mut self, request: SendRequest) -> Result<bool> {
        match self.try_send(&request) {
            Ok(()) => {
                info!(
                    "Email sent successfully to {}",
                    request.recipients.join(", ")
                );
                Ok(true)
            }
            Err(e) => {
                error!("Failed to send email: {}", e);
                Err(e)
            }
        }
    }

    /// Build the message `send_email` would submit, without sending it
    pub fn compose(&self, request: &SendRequest) -> Result<EmailMessage> {
        if request.recipients.is_empty() {
            return Err(ExMailerError::NoRecipients);
        }

        let layout = self.registry.resolve(request.template.as_ref())?;
        let vars = request.template_vars.as_ref();

        let subject = match vars {
            Some(vars) => TemplateRenderer::interpolate(&request.subject, vars)?,
            None => request.subject.clone(),
        };
        let html_body = TemplateRenderer::render(&request.body, vars, layout.as_deref())?;
        debug!(
            "Rendered body with layout {}",
            layout.as_ref().map(|l| l.name()).unwrap_or("plain")
        );

        let attachments = request
            .attachments
            .iter()
            .map(Attachment::load)
            .collect::<Result<Vec<_>>>()?;

        Ok(EmailMessage {
            subject,
            html_body,
            to: request.recipients.clone(),
            cc: request.cc.clone(),
            bcc: request.bcc.clone(),
            attachments,
            importance: request.importance,
        })
    }

    /// Release the connection now instead of on drop
    pub fn close(mut self) {
        self.release();
    }

    fn try_send(&mut self, request: &SendRequest) -> Result<()> {
        let message = self.compose(request)?;
        let disposition = SendDisposition::for_save_copy(self.settings.save_copy());
        debug!(
            "Submitting '{}' to {} recipient(s) with {} attachment(s), {:?}",
            message.subject,
            message.all_recipients().count(),
            message.attachments.len(),
            disposition
        );

        self.transport.submit(&message, disposition)
    }

    fn release(&mut self) {
        if self.connected {
            self.connected = false;
            self.transport.close();
            info!("Released connection to {}", self.settings.server());
        }
    }
}

impl<T: Transport> Drop for Emailer<T> {
    fn drop(&mut self) {
        self.release();
    }
}
