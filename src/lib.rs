//! Smart Reply: three channel-aware reply drafts for an incoming message.

pub mod api;
pub mod config;
pub mod drafts;
pub mod error;
pub mod llm;
pub mod text;
