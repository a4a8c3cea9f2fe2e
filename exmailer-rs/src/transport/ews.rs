//! Exchange Web Services transport
//!
//! Posts SOAP envelopes to `https://{server}/EWS/Exchange.asmx` with a
//! blocking HTTP client. Only BASIC authentication is handled here; NTLM
//! needs a transport that implements the handshake.

use crate::config::{AuthType, Settings};
use crate::error::{ExMailerError, Result};
use crate::message::{Attachment, EmailMessage};
use crate::transport::{SendDisposition, Transport};
use base64::Engine;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::fmt::Write;
use std::time::Duration;
use tracing::{debug, info};

const SERVER_VERSION: &str = "Exchange2016";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

struct Session {
    client: Client,
    endpoint: String,
    login: String,
    password: String,
    mailbox: String,
}

/// [`Transport`] speaking EWS SOAP over HTTPS
pub struct EwsTransport {
    timeout: Duration,
    session: Option<Session>,
}

impl EwsTransport {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            session: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    fn post(session: &Session, envelope: String) -> Result<String> {
        let response = session
            .client
            .post(&session.endpoint)
            .basic_auth(&session.login, Some(&session.password))
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .body(envelope)
            .send()
            .map_err(|e| {
                ExMailerError::Connection(format!("{}: {}", session.endpoint, e))
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ExMailerError::Authentication(format!(
                "server rejected credentials for {} ({})",
                session.login, status
            )));
        }

        let text = response.text().map_err(|e| {
            ExMailerError::Connection(format!("failed to read response: {}", e))
        })?;

        if !status.is_success() {
            let detail = extract_element(&text, "faultstring")
                .or_else(|| extract_element(&text, "MessageText"))
                .unwrap_or_default();
            return Err(ExMailerError::Send(
                format!("server returned {} {}", status, detail)
                    .trim_end()
                    .to_string(),
            ));
        }

        check_response(&text)?;
        Ok(text)
    }
}

impl Default for EwsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for EwsTransport {
    fn connect(&mut self, settings: &Settings) -> Result<()> {
        if settings.auth_type() == AuthType::Ntlm {
            return Err(ExMailerError::Config(
                "NTLM authentication is not available in the built-in EWS transport; \
                 set auth_type to BASIC or provide a Transport implementation"
                    .to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ExMailerError::Connection(format!("failed to build HTTP client: {}", e)))?;

        let session = Session {
            client,
            endpoint: settings.ews_endpoint(),
            login: settings.login_name(),
            password: settings.password().to_string(),
            mailbox: settings.primary_address(),
        };

        debug!("Probing {} as {}", session.endpoint, session.login);
        Self::post(&session, get_folder_envelope(&session.mailbox)).map_err(|e| match e {
            ExMailerError::Send(message) => ExMailerError::Connection(message),
            other => other,
        })?;

        info!("Connected to Exchange server {}", settings.server());
        self.session = Some(session);
        Ok(())
    }

    fn submit(&mut self, message: &EmailMessage, disposition: SendDisposition) -> Result<()> {
        let session = self.session.as_ref().ok_or_else(|| {
            ExMailerError::Connection("transport is not connected".to_string())
        })?;

        let envelope = create_item_envelope(message, disposition, &session.mailbox);
        Self::post(session, envelope)?;
        Ok(())
    }

    fn close(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Closed Exchange session for {}", session.mailbox);
        }
    }
}

fn envelope(body: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" xmlns:t="http://schemas.microsoft.com/exchange/services/2006/types" xmlns:m="http://schemas.microsoft.com/exchange/services/2006/messages">
<soap:Header><t:RequestServerVersion Version="{}"/></soap:Header>
<soap:Body>{}</soap:Body>
</soap:Envelope>"#,
        SERVER_VERSION, body
    )
}

fn sent_items(mailbox: &str) -> String {
    format!(
        r#"<t:DistinguishedFolderId Id="sentitems"><t:Mailbox><t:EmailAddress>{}</t:EmailAddress></t:Mailbox></t:DistinguishedFolderId>"#,
        escape_xml(mailbox)
    )
}

fn get_folder_envelope(mailbox: &str) -> String {
    envelope(&format!(
        "<m:GetFolder><m:FolderShape><t:BaseShape>IdOnly</t:BaseShape></m:FolderShape>\
         <m:FolderIds>{}</m:FolderIds></m:GetFolder>",
        sent_items(mailbox)
    ))
}

fn create_item_envelope(
    message: &EmailMessage,
    disposition: SendDisposition,
    mailbox: &str,
) -> String {
    let mut body = String::new();

    match disposition {
        SendDisposition::SendAndSaveCopy => {
            let _ = write!(
                body,
                r#"<m:CreateItem MessageDisposition="SendAndSaveCopy"><m:SavedItemFolderId>{}</m:SavedItemFolderId>"#,
                sent_items(mailbox)
            );
        }
        SendDisposition::SendOnly => {
            body.push_str(r#"<m:CreateItem MessageDisposition="SendOnly">"#);
        }
    }

    body.push_str("<m:Items><t:Message>");
    let _ = write!(body, "<t:Subject>{}</t:Subject>", escape_xml(&message.subject));
    let _ = write!(
        body,
        r#"<t:Body BodyType="HTML">{}</t:Body>"#,
        escape_xml(&message.html_body)
    );

    if !message.attachments.is_empty() {
        body.push_str("<t:Attachments>");
        for attachment in &message.attachments {
            write_attachment(&mut body, attachment);
        }
        body.push_str("</t:Attachments>");
    }

    let _ = write!(body, "<t:Importance>{}</t:Importance>", message.importance);
    write_recipients(&mut body, "ToRecipients", &message.to);
    write_recipients(&mut body, "CcRecipients", &message.cc);
    write_recipients(&mut body, "BccRecipients", &message.bcc);
    body.push_str("</t:Message></m:Items></m:CreateItem>");

    envelope(&body)
}

fn write_attachment(out: &mut String, attachment: &Attachment) {
    let _ = write!(
        out,
        "<t:FileAttachment><t:Name>{}</t:Name><t:ContentType>{}</t:ContentType><t:Content>{}</t:Content></t:FileAttachment>",
        escape_xml(&attachment.name),
        escape_xml(&attachment.content_type),
        base64::engine::general_purpose::STANDARD.encode(&attachment.content)
    );
}

fn write_recipients(out: &mut String, element: &str, addresses: &[String]) {
    if addresses.is_empty() {
        return;
    }

    let _ = write!(out, "<t:{}>", element);
    for address in addresses {
        let _ = write!(
            out,
            "<t:Mailbox><t:EmailAddress>{}</t:EmailAddress></t:Mailbox>",
            escape_xml(address)
        );
    }
    let _ = write!(out, "</t:{}>", element);
}

/// Fail on any `ResponseClass="Error"` in an EWS response
fn check_response(xml: &str) -> Result<()> {
    if xml.contains(r#"ResponseClass="Error""#) {
        let detail = extract_element(xml, "MessageText")
            .or_else(|| extract_element(xml, "ResponseCode"))
            .unwrap_or_else(|| "unknown EWS error".to_string());
        return Err(ExMailerError::Send(detail));
    }
    Ok(())
}

/// Text of the first element with the given local name, prefix ignored
fn extract_element(xml: &str, local_name: &str) -> Option<String> {
    let open = [format!(":{}>", local_name), format!("<{}>", local_name)]
        .into_iter()
        .filter_map(|tag| xml.find(&tag).map(|pos| pos + tag.len()))
        .min()?;
    let rest = &xml[open..];
    let end = rest.find("</")?;
    Some(rest[..end].trim().to_string())
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigResolver;
    use crate::message::Importance;

    fn message() -> EmailMessage {
        EmailMessage {
            subject: "Q3 <report> & notes".to_string(),
            html_body: "<p>Hello</p>".to_string(),
            to: vec!["ann@corp.com".to_string()],
            cc: vec![],
            bcc: vec!["audit@corp.com".to_string()],
            attachments: vec![Attachment::from_bytes("a.txt", b"hi".to_vec())],
            importance: Importance::High,
        }
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(
            escape_xml(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &apos;Jerry&apos;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_create_item_save_copy() {
        let xml = create_item_envelope(
            &message(),
            SendDisposition::SendAndSaveCopy,
            "john@corp.com",
        );

        assert!(xml.contains(r#"MessageDisposition="SendAndSaveCopy""#));
        assert!(xml.contains("<m:SavedItemFolderId>"));
        assert!(xml.contains("<t:EmailAddress>john@corp.com</t:EmailAddress>"));
        assert!(xml.contains("<t:Subject>Q3 &lt;report&gt; &amp; notes</t:Subject>"));
        assert!(xml.contains(r#"<t:Body BodyType="HTML">&lt;p&gt;Hello&lt;/p&gt;</t:Body>"#));
        assert!(xml.contains("<t:Importance>High</t:Importance>"));
        assert!(xml.contains("<t:Content>aGk=</t:Content>"));
        assert!(xml.contains("<t:ContentType>text/plain</t:ContentType>"));
    }

    #[test]
    fn test_create_item_send_only_omits_empty_lists() {
        let xml = create_item_envelope(&message(), SendDisposition::SendOnly, "john@corp.com");

        assert!(xml.contains(r#"MessageDisposition="SendOnly""#));
        assert!(!xml.contains("SavedItemFolderId"));
        assert!(!xml.contains("CcRecipients"));
        assert!(xml.contains(
            "<t:BccRecipients><t:Mailbox><t:EmailAddress>audit@corp.com</t:EmailAddress></t:Mailbox></t:BccRecipients>"
        ));
    }

    #[test]
    fn test_check_response_error() {
        let xml = r#"<m:CreateItemResponseMessage ResponseClass="Error"><m:MessageText>Mailbox is full.</m:MessageText><m:ResponseCode>ErrorQuotaExceeded</m:ResponseCode></m:CreateItemResponseMessage>"#;

        let err = check_response(xml).unwrap_err();
        assert_eq!(err.to_string(), "Failed to send email: Mailbox is full.");
        assert!(check_response(r#"<m:X ResponseClass="Success"/>"#).is_ok());
    }

    #[test]
    fn test_ntlm_rejected_before_network() {
        let settings = ConfigResolver::empty()
            .with_settings([
                ("domain", "corp"),
                ("username", "john"),
                ("password", "pw"),
                ("server", "mail.invalid"),
                ("email_domain", "corp.com"),
            ])
            .resolve()
            .unwrap();

        let mut transport = EwsTransport::new();
        let err = transport.connect(&settings).unwrap_err();
        assert!(err.to_string().contains("NTLM"));
        assert!(!transport.is_connected());
    }

    #[test]
    fn test_submit_requires_connection() {
        let mut transport = EwsTransport::new();
        let err = transport
            .submit(&message(), SendDisposition::SendOnly)
            .unwrap_err();

        assert!(matches!(err, ExMailerError::Connection(_)));
    }
}
