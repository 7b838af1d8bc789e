/*
 * Responsibility
 * - Library root shared by the MCP server and the upstream-api binary
 */
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
pub mod tools;
