//! # NTDoc MCP
//!
//! MCP gateway for the NTDoc document management platform. Exposes the REST
//! backend's team, document, log, and auth operations as MCP tools over a
//! streamable-HTTP transport, forwarding the caller's bearer token verbatim.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                 MCP client (agent/IDE)                 │
//! ├───────────────────────────────────────────────────────┤
//! │        axum + rmcp StreamableHttpService (/mcp)        │
//! │  ┌──────────┐  ┌─────────────┐  ┌──────────────────┐  │
//! │  │ AuthGate │──│ Tool router │──│  BackendClient   │  │
//! │  │ (bearer) │  │ (20 tools)  │  │   (reqwest)      │  │
//! │  └──────────┘  └─────────────┘  └──────────────────┘  │
//! └───────────────────────────┬───────────────────────────┘
//!                             │ Authorization passthrough
//!                      NTDoc REST backend
//! ```

// Public modules
pub mod backend;
pub mod config;
pub mod mcp;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
