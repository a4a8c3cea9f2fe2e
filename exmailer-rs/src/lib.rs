//! exmailer-rs: templated email through Microsoft Exchange
//!
//! Wraps an Exchange transport with layered configuration, an HTML layout
//! registry and a single send call.
//!
//! # Features
//!
//! - **Configuration**: programmatic settings, an explicit file, discovered
//!   JSON/YAML files or `EXCHANGE_*` environment variables
//! - **Templates**: built-in English, Persian (RTL) and minimal layouts plus
//!   custom ones registered at runtime
//! - **Attachments**: files or in-memory blobs with inferred MIME types
//! - **Transport**: Exchange Web Services over HTTPS, or any [`Transport`]
//!
//! # Example
//!
//! ```no_run
//! use exmailer::config::ConfigResolver;
//! use exmailer::emailer::{Emailer, SendRequest};
//! use exmailer::templates::WellKnownTemplate;
//! use exmailer::transport::EwsTransport;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = ConfigResolver::new().resolve()?;
//!     let mut emailer = Emailer::connect(settings, EwsTransport::new())?;
//!
//!     emailer.send_email(
//!         SendRequest::new("Weekly report", "Hello {name}", ["ann@corp.com"])
//!             .template(WellKnownTemplate::Default)
//!             .var("name", "Ann"),
//!     )?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: Settings resolution
//! - [`error`]: Error types and handling
//! - [`templates`]: Layout registry and renderer
//! - [`message`]: Outgoing messages and attachments
//! - [`transport`]: Exchange transport trait and EWS implementation
//! - [`emailer`]: Send orchestration

pub mod config;
pub mod emailer;
pub mod error;
pub mod message;
pub mod templates;
pub mod transport;

// Re-export commonly used types
pub use config::{AuthType, ConfigResolver, Settings};
pub use emailer::{Emailer, SendRequest};
pub use error::{ErrorKind, ExMailerError, Result};
pub use templates::{register_custom_template, TemplateSelector, WellKnownTemplate};
pub use transport::{EwsTransport, SendDisposition, Transport};
