//! Khata — a conversational ledger over WhatsApp.
//!
//! Inbound chat messages ("Gave 500 to Raju", a voice note, a button tap)
//! become structured ledger entries, balance reports, and two-phase delete
//! confirmations. The pipeline is: webhook → dedup → orchestrator →
//! classifier (with backend fallback) → processor router → messenger.

pub mod classifier;
pub mod config;
pub mod error;
pub mod ledger;
pub mod messenger;
pub mod pipeline;
pub mod server;
pub mod store;
pub mod transcribe;

pub use error::{Error, Result};
