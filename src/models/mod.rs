//! Data models for the chat widget backend.
//!
//! The settings record mirrors the stored option; the front-end models match
//! the object the chat script reads.

mod frontend;
mod settings;

pub use frontend::*;
pub use settings::*;
