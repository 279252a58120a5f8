pub mod config;
pub mod demo;
pub mod status;
pub mod summary;
