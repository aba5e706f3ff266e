pub mod app;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod mapping;
pub mod memory;
pub mod routing;
pub mod state;
pub mod trips;
