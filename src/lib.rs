//! # certidian – PDF generation service
//!
//! Two independent pipelines behind one `bytes-or-error` contract:
//!
//! 1. **Passthrough** – raw HTML in, PDF out, by driving the external
//!    `wkhtmltopdf` binary over stdin/stdout ([`engine`])
//! 2. **Form 220** – withholding-certificate records in, PDF out, through an
//!    embedded grid renderer: records → page descriptors ([`form`], [`grid`])
//!    → PDF bytes ([`render`])
//!
//! The HTTP boundary ([`http`]) exposes both behind a shared-secret header
//! and relays the result as JSON.

pub mod config;
pub mod engine;
pub mod form;
pub mod grid;
pub mod http;
pub mod metrics;
pub mod money;
pub mod render;

// Re-exports for convenience
pub use engine::HtmlEngine;
pub use form::{FormRecord, FormRenderer};
