//! Assistant lifecycle and conversation orchestration

mod service;

pub use service::{AssistantService, DEFAULT_INSTRUCTIONS};
