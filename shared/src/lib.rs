pub mod db;
pub mod memory;
pub mod models;
