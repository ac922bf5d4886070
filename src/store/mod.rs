//! Storage layer for assistants and their conversations

mod chat_db;

pub use chat_db::ChatStore;
