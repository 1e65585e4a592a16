//! # Transport seam: how accepted files leave the intake.
//!
//! - [`Transport`] the async upload trait implemented by the host application
//! - [`TransportFn`] closure-backed transport (handy for tests and small hosts)
//! - [`TransportRef`] shared handle (`Arc<dyn Transport>`)
//! - [`Progress`] per-task progress reporter handed to every upload call
//!
//! Retries, authentication and the wire protocol belong to the transport, never
//! to the intake.

mod progress;
#[allow(clippy::module_inception)]
mod transport;
mod transport_fn;

pub use progress::Progress;
pub use transport::{Transport, TransportRef};
pub use transport_fn::TransportFn;
