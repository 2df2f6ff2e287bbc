//! The transaction ledger: domain types, balance maintenance, and contact
//! resolution.

pub mod contacts;
pub mod model;
pub mod service;

pub use contacts::ContactResolver;
pub use service::TransactionLedger;
