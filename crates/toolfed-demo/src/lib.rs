//! Demo MCP tool servers.
//!
//! Each profile is a small business backend with static data. A server
//! speaks MCP over newline-delimited JSON-RPC on stdin/stdout, so a
//! federation can register it as a stdio tool server.

pub mod profiles;
pub mod protocol;
mod server;

pub use server::DemoServer;
