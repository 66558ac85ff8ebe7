//! # Writer Suite Common Library
//!
//! Shared code for the callback mailbox service and the copilot client:
//! - Callback kinds and the normalized response envelope
//! - Session identifiers
//! - Configuration loading (TOML with graceful fallback)
//! - Error types and time helpers

pub mod config;
pub mod envelope;
pub mod error;
pub mod session;
pub mod time;

pub use envelope::{CallbackKind, Envelope};
pub use error::{Error, Result};
pub use session::SessionId;
