//! examflow-core — Timed exam session engine.
//!
//! This crate defines the data model, the session state machine, and
//! the async service traits the rest of the examflow system builds on.

pub mod answers;
pub mod clock;
pub mod cursor;
pub mod error;
pub mod model;
pub mod parser;
pub mod session;
pub mod traits;
