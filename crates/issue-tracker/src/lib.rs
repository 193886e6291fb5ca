pub mod client;
pub mod daemon;
pub mod db;
pub mod error;
pub mod handler;
pub mod id;
pub mod output;
pub mod store;
pub mod types;
