use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::tasks::FileHandle;
use crate::transport::Progress;

/// Shared handle to a transport.
pub type TransportRef = Arc<dyn Transport>;

/// # Asynchronous, cancelable upload of one file.
///
/// Called once per accepted file. The outcome settles the task:
/// `Ok(())` → `Succeeded`, `Err(e)` → `Failed` with [`TransportError::failure_message`].
///
/// `ctx` is cancelled when the task is removed or the intake shuts down.
/// Honoring it is optional: a late result for a removed task is ignored.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use intakevisor::{FileHandle, Progress, Transport, TransportError};
///
/// struct Null;
///
/// #[async_trait]
/// impl Transport for Null {
///     async fn upload(
///         &self,
///         file: &FileHandle,
///         progress: Progress,
///         ctx: CancellationToken,
///     ) -> Result<(), TransportError> {
///         if ctx.is_cancelled() {
///             return Err(TransportError::Canceled);
///         }
///         progress.bytes(file.size(), file.size()).await;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Returns a human-readable transport name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Uploads `file`, reporting progress through `progress`.
    async fn upload(
        &self,
        file: &FileHandle,
        progress: Progress,
        ctx: CancellationToken,
    ) -> Result<(), TransportError>;
}
