//! Persistence layer: the `LedgerStore` trait and its libSQL backend.

mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlStore;
pub use traits::{LedgerStore, TransactionFilter};
