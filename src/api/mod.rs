pub mod upstream;
pub mod v1;
