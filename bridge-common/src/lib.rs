pub mod client;
pub mod config;
pub mod kafka_consumer;
pub mod kafka_producer;
pub mod message;
pub mod metrics;
pub mod signals;


pub use client::{BrokerError, MessageReader, MessageWriter};
pub use message::Message;
