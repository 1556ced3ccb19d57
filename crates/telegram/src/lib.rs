//! Telegram gateway adapter for taskling.
//!
//! Receives chat events via long polling with the teloxide library, decodes
//! them into dialog inputs and task actions, and renders prompts, keyboards,
//! and the pending task list back to the chat.

pub mod bot;
pub mod config;
pub mod error;
pub mod handlers;
pub mod outbound;
pub mod render;
pub mod state;

pub use {bot::start_polling, config::BotConfig};
