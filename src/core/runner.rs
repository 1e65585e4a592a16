//! # Run a single upload attempt.
//!
//! [`upload_once`] executes exactly one [`Transport::upload`] call for one task and
//! normalizes every way it can end into a `Result<(), TransportError>`.
//!
//! ```text
//! transport.upload(file, progress, child) ──┬─► Ok(())              → Ok(())
//!                                           ├─► Err(e)              → Err(e)
//!                                           └─► panic (caught)      → Err(Unrecognized)
//! ```
//!
//! ## Rules
//! - Panics inside the transport future never unwind into the driver.
//! - No retry and no timeout: a stalled transport keeps the task `Uploading`.
//! - The token is passed through untouched; cancelling it is the caller's job.

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::subscribers::panic_info;
use crate::tasks::FileHandle;
use crate::transport::{Progress, Transport};

/// Executes one upload of `file`, catching panics.
pub async fn upload_once<T: Transport + ?Sized>(
    transport: &T,
    file: &FileHandle,
    progress: Progress,
    ctx: CancellationToken,
) -> Result<(), TransportError> {
    let fut = transport.upload(file, progress, ctx);
    match std::panic::AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(panic) => {
            tracing::warn!(
                transport = transport.name(),
                file = file.name(),
                info = %panic_info(panic.as_ref()),
                "transport panicked"
            );
            Err(TransportError::Unrecognized)
        }
    }
}
