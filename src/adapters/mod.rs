// Adapters layer: concrete implementations for external systems (upstream API, MCP server, files).

pub mod fmp;
pub mod mcp_client;
pub mod storage;
