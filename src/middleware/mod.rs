/*
 * Responsibility
 * - Public middleware interface
 * - auth (bearer access gate, route scope guard), cors, http transport layers
 */
pub mod auth;
pub mod cors;
pub mod http;
