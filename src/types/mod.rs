//! Types for the user-facing API

pub mod transaction;

pub use transaction::{RecordUpdate, TransactionKind, TransactionRecord, TransactionState};
