//! External API registry + test harness.
//!
//! This crate holds everything needed to describe a third-party HTTP API, turn a stored
//! definition plus ad-hoc overrides into one concrete request, execute it, and exchange
//! definitions with the cURL and JSON text formats.
//!
//! It intentionally contains **no** persistence of definitions; history storage is reached only
//! through the [`history::HistoryRecorder`] trait.

pub mod curl;
pub mod error;
pub mod executor;
pub mod export;
pub mod harness;
pub mod history;
pub mod import;
pub mod mcp;
pub mod model;
pub mod resolver;
pub mod safety;
