use thiserror::Error;

#[derive(Debug, Error)]
pub enum RentLedgerError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Contract not found: no contract at index {index}")]
    ContractNotFound { index: usize },

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Authentication failed: invalid username or password")]
    AuthenticationFailed,

    #[error("Not logged in: run `rent login` first")]
    NotLoggedIn,

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for RentLedgerError {
    fn from(e: serde_json::Error) -> Self {
        RentLedgerError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for RentLedgerError {
    fn from(e: std::io::Error) -> Self {
        RentLedgerError::Storage(e.to_string())
    }
}

impl From<toml::de::Error> for RentLedgerError {
    fn from(e: toml::de::Error) -> Self {
        RentLedgerError::Config(e.to_string())
    }
}
