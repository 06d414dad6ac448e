pub mod config;
pub mod error;
pub mod logger;
pub mod sanitize;
pub mod server;
pub mod service;
pub mod validate;
