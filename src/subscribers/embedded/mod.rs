//! # Built-in subscribers
//!
//! - [`LogWriter`]: renders events through `tracing` (enable the `logging` feature).

mod log;

pub use log::LogWriter;
