//! Web API module for Nimbus.
//!
//! REST API over the file service: JSON for metadata, raw bytes for
//! downloads, JWT bearer tokens for authentication.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
