pub mod mcp;
pub mod metadata;
