//! MCP (Model Context Protocol) adapter.
//!
//! This module provides the MCP server implementation using the official rmcp
//! SDK: the tool router forwarding calls to the NTDoc backend, the bearer
//! token gate in front of it, and the streamable-HTTP runtime assembly.

pub mod auth;
pub mod runtime;
pub mod server;

// Re-export the commonly used types for convenience
pub use auth::{AccessToken, AuthGate, JwtTokenVerifier};
pub use server::NtdocBridgeServer;
