//! HTTP API handlers for wsc-mailbox

pub mod callbacks;
pub mod health;

pub use callbacks::{callback_routes, retrieve_callback, submit_callback};
pub use health::health_routes;
