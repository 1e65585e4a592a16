//! # Intake demo
//!
//! Feeds two selections into an intake backed by a simulated transport:
//! - the first mixes valid documents, an executable and an oversized scan
//! - one upload fails with a server message and stays `FAILED`
//! - succeeded uploads disappear after the cleanup delay
//!
//! ## Run
//! ```bash
//! RUST_LOG=debug cargo run --example intake_demo --features logging
//! ```

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use intakevisor::{
    DrivePolicy, FileHandle, IntakeConfig, LogWriter, Orchestrator, Progress, Subscribe,
    TransportError, TransportFn, ValidationPolicy,
};

/// Pretends to stream the file in four chunks.
async fn simulated_upload(
    file: FileHandle,
    progress: Progress,
    ctx: CancellationToken,
) -> Result<(), TransportError> {
    let total = file.size();
    for chunk in 1..=4u64 {
        tokio::select! {
            _ = ctx.cancelled() => return Err(TransportError::Canceled),
            _ = tokio::time::sleep(Duration::from_millis(150)) => {}
        }
        progress.bytes(total * chunk / 4, total).await;
        if file.name().starts_with("flaky") && chunk == 2 {
            return Err(TransportError::fail("502 Bad Gateway"));
        }
    }
    Ok(())
}

async fn print_tasks(intake: &Orchestrator, title: &str) {
    println!("\n{title}");
    for task in intake.list().await {
        println!(
            " ├─► {:<14} {:<10} {:>3}% {}",
            task.name(),
            task.status(),
            task.progress(),
            task.error().unwrap_or_default()
        );
    }
    let stats = intake.stats().await;
    println!(" └─► total={} uploading={}", stats.total(), stats.uploading);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cfg = IntakeConfig {
        policy: ValidationPolicy::default().with_max_file_size(5 * 1024 * 1024),
        drive: DrivePolicy::Pooled(2),
        cleanup_delay: Duration::from_secs(2),
        ..IntakeConfig::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    let intake = Orchestrator::builder(cfg)
        .with_subscribers(subs)
        .with_transport(TransportFn::arc("simulated", simulated_upload))
        .build()?;

    let batch = intake
        .accept(vec![
            FileHandle::from_bytes("report.pdf", "application/pdf", vec![0u8; 2 * 1024 * 1024]),
            FileHandle::from_bytes("notes.md", "", vec![b'#'; 4096]),
            FileHandle::from_bytes("flaky.docx", "", vec![0u8; 64 * 1024]),
            FileHandle::from_bytes("setup.exe", "application/x-msdownload", vec![0u8; 512]),
            FileHandle::from_bytes("scan.png", "image/png", vec![0u8; 6 * 1024 * 1024]),
        ])
        .await?;

    if let Some(notice) = intake.rejection() {
        println!("\nRejected:\n{notice}");
    }
    batch.settled().await;
    print_tasks(&intake, "After upload:").await;

    tokio::time::sleep(Duration::from_millis(2500)).await;
    print_tasks(&intake, "After cleanup:").await;

    intake.dismiss_rejection();
    let removed = intake.remove_finished().await;
    println!("\nRemoved {} finished task(s)", removed.len());

    intake.shutdown().await?;
    Ok(())
}
