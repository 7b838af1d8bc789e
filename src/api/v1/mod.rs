/*
 * Responsibility
 * - v1 public surface (routes, handlers, wire types, extractors)
 */
pub mod dto;
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::{METADATA_PATH, root_routes, routes};
