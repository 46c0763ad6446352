//! # orbis-core
//!
//! Primitives shared by every orbis crate: the [`Console`] that all
//! operator-facing output is written through, and the clock helpers that
//! produce session timestamps and script timing summaries.

pub mod clock;
pub mod console;

pub use clock::{elapsed_seconds, format_timestamp, process_start_millis, TIMESTAMP_FORMAT};
pub use console::{CapturedOutput, Console, SharedWriter};
