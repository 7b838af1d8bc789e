pub mod access;
pub mod scope;

pub use access::AccessGuard;
