pub mod api;
pub mod config;
pub mod router;
pub mod send;
pub mod server;
