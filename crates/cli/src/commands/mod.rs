pub mod collections;
pub mod download;
pub mod import;
pub mod pending;
pub mod status;
