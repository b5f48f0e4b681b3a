//! License tracking and carrier form lookup for insurance agents.
//!
//! The crate answers two questions for the agent portal: which forms and
//! licensing status apply to an agent in a given state, and which stored PDF
//! a form id refers to. Data is produced by external tooling; everything here
//! reads it.

pub mod config;
pub mod error;
pub mod licensing;
pub mod telemetry;
