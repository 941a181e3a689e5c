pub mod cache;
pub mod db;
pub mod gateway;
pub mod memory;
pub mod store;
