pub mod config;
pub mod consumer;
pub mod processor;
pub mod shutdown;
