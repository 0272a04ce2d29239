pub mod admission_handler;
pub mod annotations;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod mutation;
pub mod patch;
