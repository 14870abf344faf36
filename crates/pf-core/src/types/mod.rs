//! Core data types: feed records and the control messages sent upstream.

pub mod control;
pub mod record;

pub use control::*;
pub use record::*;
