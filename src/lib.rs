pub mod analysis;
pub mod codec;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod mcp;
pub mod registry;
