//! Type definitions for the scoring service

pub mod alert;
pub mod record;
pub mod risk;
pub mod transaction;

pub use alert::FraudAlert;
pub use record::{NewRecord, TransactionRecord};
pub use risk::RiskResult;
pub use transaction::RawTransaction;
