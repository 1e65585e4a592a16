//! # Upload data model.
//!
//! This module provides the types that flow through the intake pipeline:
//! - [`FileHandle`] / [`Payload`] - a selected file and where its bytes live
//! - [`UploadTask`] - snapshot of one tracked upload
//! - [`TaskId`] - opaque, collision-free task identifier
//! - [`TaskStatus`] - `Queued → Uploading → {Succeeded, Failed}`

mod file;
mod task;

pub use file::{FileHandle, Payload};
pub use task::{TaskId, TaskStatus, UploadTask};
