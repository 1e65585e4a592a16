//! # Function-backed transport (`TransportFn`)
//!
//! [`TransportFn`] wraps a closure `F: Fn(FileHandle, Progress, CancellationToken) -> Fut`,
//! producing a fresh future per upload. The closure receives an owned (cheaply
//! cloned) [`FileHandle`], so the future can be `'static`.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use intakevisor::{FileHandle, Progress, TransportError, TransportFn, TransportRef};
//!
//! let t: TransportRef = TransportFn::arc(
//!     "always-ok",
//!     |_file: FileHandle, _progress: Progress, _ctx: CancellationToken| async {
//!         Ok::<_, TransportError>(())
//!     },
//! );
//! assert_eq!(t.name(), "always-ok");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::TransportError;
use crate::tasks::FileHandle;
use crate::transport::{Progress, Transport};

/// Closure-backed transport implementation.
pub struct TransportFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> TransportFn<F> {
    /// Creates a new function-backed transport.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the transport and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F> std::fmt::Debug for TransportFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportFn").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> Transport for TransportFn<F>
where
    F: Fn(FileHandle, Progress, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), TransportError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(
        &self,
        file: &FileHandle,
        progress: Progress,
        ctx: CancellationToken,
    ) -> Result<(), TransportError> {
        (self.f)(file.clone(), progress, ctx).await
    }
}
