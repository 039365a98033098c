//! HTTP API Layer
//!
//! JSON endpoints for creating tests and polling their progress.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use server::{router, HttpServer, HttpServerConfig};
