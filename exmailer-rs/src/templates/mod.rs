//! Email layouts
//!
//! Built-in and user-registered HTML layouts, and the renderer that fills
//! them with a message body.

pub mod builtin;
pub mod registry;
pub mod renderer;
pub mod types;

pub use registry::{register_custom_template, TemplateRegistry};
pub use renderer::TemplateRenderer;
pub use types::{Layout, TemplateSelector, WellKnownTemplate, BODY_MARKER};
