pub mod config;
pub mod deck;
pub mod error;
pub mod llm;
pub mod model;
pub mod pipeline;
pub mod response;
pub mod server;
pub mod workflow;
