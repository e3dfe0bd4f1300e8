pub mod adjustment;
pub mod config;
pub mod error;
pub mod index_series;
pub mod ledger;
pub mod provider;
pub mod schedule;
pub mod session;
pub mod store;
pub mod types;
pub mod users;

pub use error::RentLedgerError;
pub use types::*;

/// Standard result type for all rent-ledger operations
pub type RentLedgerResult<T> = Result<T, RentLedgerError>;
