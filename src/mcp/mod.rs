//! MCP (Model Context Protocol) surface of the toolbox.
//!
//! Exposes the analysis queries and schema explainers as MCP tools over a
//! JSON-RPC 2.0 stdio connection.

/// Schema explainer operations.
pub mod explainers;

/// MCP server implementation.
pub mod server;

/// Query tool operations.
pub mod tools;

/// JSON-RPC 2.0 transport types.
pub mod transport;

pub use server::McpServer;
pub use transport::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolDefinition};

use crate::errors::Result;
use crate::registry::{Candidate, Registry};

/// Every operation offered for registration: tools first, then explainers.
pub fn candidates() -> Vec<Candidate> {
    tools::TOOLS
        .iter()
        .chain(explainers::EXPLAINERS.iter())
        .copied()
        .collect()
}

/// Builds the registry served to clients.
pub fn build_registry() -> Result<Registry> {
    Registry::discover(&candidates())
}
