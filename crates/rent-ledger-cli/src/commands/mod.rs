pub mod adjust;
pub mod auth;
pub mod contracts;
pub mod index;

/// JSON value handed to the output layer, or a message for stderr.
pub type CommandResult = Result<serde_json::Value, Box<dyn std::error::Error>>;
