//! Concierge - self-hosted assistant chat service with an OpenAI-compatible backend

pub mod config;
pub mod error;
pub mod types;

pub mod store;
pub mod model;
pub mod assistant;
pub mod api;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
