//! Exchange transport abstraction
//!
//! The emailer never talks to the server itself. It hands fully resolved
//! settings and fully assembled messages to a [`Transport`].

use crate::config::Settings;
use crate::error::Result;
use crate::message::EmailMessage;

pub mod ews;

pub use ews::EwsTransport;

/// What the server does with a submitted message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendDisposition {
    SendOnly,
    /// Send and keep a copy in Sent Items
    SendAndSaveCopy,
}

impl SendDisposition {
    pub fn for_save_copy(save_copy: bool) -> Self {
        if save_copy {
            SendDisposition::SendAndSaveCopy
        } else {
            SendDisposition::SendOnly
        }
    }
}

/// Connection to an Exchange server
///
/// Implementations report rejected credentials as
/// [`ExMailerError::Authentication`](crate::ExMailerError::Authentication) and
/// an unreachable server as
/// [`ExMailerError::Connection`](crate::ExMailerError::Connection).
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Open the connection using the resolved settings
    fn connect(&mut self, settings: &Settings) -> Result<()>;

    /// Deliver one message
    fn submit(&mut self, message: &EmailMessage, disposition: SendDisposition) -> Result<()>;

    /// Release the connection
    fn close(&mut self);
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn connect(&mut self, settings: &Settings) -> Result<()> {
        (**self).connect(settings)
    }

    fn submit(&mut self, message: &EmailMessage, disposition: SendDisposition) -> Result<()> {
        (**self).submit(message, disposition)
    }

    fn close(&mut self) {
        (**self).close()
    }
}
