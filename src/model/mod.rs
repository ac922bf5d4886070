//! Chat model invocation

mod client;

pub use client::{ChatClient, OpenAiClient, PromptMessage};
