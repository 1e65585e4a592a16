use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use intakevisor::{
    DrivePolicy, Event, EventKind, FileHandle, GENERIC_FAILURE_MESSAGE, IntakeConfig, IntakeError,
    Orchestrator, Progress, RejectionReason, Subscribe, TaskRegistry, TaskStatus, TransportError,
    TransportFn, TransportRef,
};

const MB: usize = 1024 * 1024;

fn pdf(name: &str, size: usize) -> FileHandle {
    FileHandle::from_bytes(name.to_string(), "application/pdf", vec![0u8; size])
}

fn ok_transport() -> TransportRef {
    TransportFn::arc(
        "ok",
        |_file: FileHandle, _progress: Progress, _ctx: CancellationToken| async {
            Ok::<_, TransportError>(())
        },
    )
}

/// Transport that blocks until cancelled, then reports `Canceled`.
fn cooperative_transport() -> TransportRef {
    TransportFn::arc(
        "cooperative",
        |_file: FileHandle, _progress: Progress, ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err::<(), _>(TransportError::Canceled)
        },
    )
}

fn build(cfg: IntakeConfig, transport: TransportRef) -> Arc<Orchestrator> {
    Orchestrator::builder(cfg)
        .with_transport(transport)
        .build()
        .expect("transport is set")
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<Event> {
    std::iter::from_fn(|| rx.try_recv().ok()).collect()
}

#[tokio::test(start_paused = true)]
async fn two_documents_succeed_and_are_cleaned_up() {
    let intake = build(IntakeConfig::default(), ok_transport());

    let batch = intake
        .accept(vec![pdf("a.pdf", 2 * MB), pdf("b.pdf", 3 * MB)])
        .await
        .unwrap();
    assert_eq!(batch.accepted().len(), 2);
    assert!(batch.rejected().is_empty());
    batch.settled().await;

    let tasks = intake.list().await;
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t.status() == TaskStatus::Succeeded));
    assert_eq!(tasks[0].name(), "a.pdf");
    assert_eq!(tasks[1].name(), "b.pdf");

    sleep(Duration::from_millis(2900)).await;
    assert_eq!(intake.list().await.len(), 2);

    sleep(Duration::from_millis(200)).await;
    assert!(intake.list().await.is_empty());
}

#[tokio::test]
async fn unsupported_type_creates_no_task() {
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let transport = TransportFn::arc(
        "counting",
        move |_file: FileHandle, _progress: Progress, _ctx: CancellationToken| {
            c.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, TransportError>(()) }
        },
    );
    let intake = build(IntakeConfig::default(), transport);

    let batch = intake
        .accept(vec![FileHandle::from_bytes("virus.exe", "", vec![0u8; 64])])
        .await
        .unwrap();

    assert!(batch.is_fully_rejected());
    assert_eq!(batch.rejected().len(), 1);
    assert_eq!(batch.rejected()[0].reason(), RejectionReason::UnsupportedType);
    assert_eq!(batch.rejected()[0].file_name(), Some("virus.exe"));
    batch.settled().await;

    assert!(intake.list().await.is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let notice = intake.rejection().expect("notice");
    assert!(notice.message().contains("virus.exe"));
}

#[tokio::test]
async fn count_overflow_rejects_whole_batch() {
    let registry = Arc::new(TaskRegistry::new());
    let files: Vec<_> = (0..19).map(|i| pdf(&format!("f{i}.pdf"), 16)).collect();
    registry.enqueue(files).await;
    let before: Vec<_> = registry.list().await.iter().map(|t| t.id().clone()).collect();

    let intake = Orchestrator::builder(IntakeConfig::default())
        .with_transport(ok_transport())
        .with_registry(Arc::clone(&registry))
        .build()
        .unwrap();

    let batch = intake
        .accept(vec![pdf("x.pdf", 16), pdf("y.pdf", 16)])
        .await
        .unwrap();

    assert!(batch.is_fully_rejected());
    assert_eq!(batch.rejected().len(), 1);
    assert_eq!(batch.rejected()[0].reason(), RejectionReason::CountExceeded);
    assert_eq!(batch.rejected()[0].file_name(), None);

    let after = intake.list().await;
    let ids: Vec<_> = after.iter().map(|t| t.id().clone()).collect();
    assert_eq!(ids, before);
    assert!(after.iter().all(|t| t.status() == TaskStatus::Queued));
}

#[tokio::test]
async fn count_overflow_applies_while_uploads_are_live() {
    let intake = build(IntakeConfig::default(), cooperative_transport());
    let mut gate = intake.subscribe_gate();

    let files: Vec<_> = (0..19).map(|i| pdf(&format!("f{i}.pdf"), 16)).collect();
    intake.accept(files).await.unwrap();
    timeout(Duration::from_secs(1), gate.wait_for(|disabled| *disabled))
        .await
        .expect("upload starts")
        .unwrap();
    let before: Vec<_> = intake.list().await.iter().map(|t| t.id().clone()).collect();

    let batch = intake
        .accept(vec![pdf("x.pdf", 16), pdf("y.pdf", 16)])
        .await
        .expect("gate is left to the surface by default");

    assert!(batch.is_fully_rejected());
    assert_eq!(batch.rejected().len(), 1);
    assert_eq!(batch.rejected()[0].reason(), RejectionReason::CountExceeded);
    let notice = intake.rejection().expect("notice");
    assert_eq!(notice.records().len(), 1);
    assert_eq!(notice.records()[0].reason(), RejectionReason::CountExceeded);

    let stats = intake.stats().await;
    assert_eq!((stats.queued, stats.uploading), (18, 1));
    let after: Vec<_> = intake.list().await.iter().map(|t| t.id().clone()).collect();
    assert_eq!(after, before);

    intake.shutdown().await.unwrap();
}

#[tokio::test]
async fn one_failure_does_not_affect_siblings() {
    let transport = TransportFn::arc(
        "flaky",
        |file: FileHandle, _progress: Progress, _ctx: CancellationToken| async move {
            if file.name() == "b.pdf" {
                return Err(TransportError::fail("503 Service Unavailable"));
            }
            Ok(())
        },
    );
    let cfg = IntakeConfig {
        cleanup_delay: Duration::ZERO,
        ..IntakeConfig::default()
    };
    let intake = build(cfg, transport);

    intake
        .accept(vec![pdf("a.pdf", 16), pdf("b.pdf", 16), pdf("c.pdf", 16)])
        .await
        .unwrap()
        .settled()
        .await;

    let tasks = intake.list().await;
    let statuses: Vec<_> = tasks.iter().map(|t| t.status()).collect();
    assert_eq!(
        statuses,
        [TaskStatus::Succeeded, TaskStatus::Failed, TaskStatus::Succeeded]
    );
    assert_eq!(tasks[1].error(), Some("503 Service Unavailable"));
    assert_eq!(tasks[0].error(), None);
    assert!(!intake.is_disabled());
}

#[tokio::test]
async fn failure_isolation_holds_under_every_drive_policy() {
    for drive in [DrivePolicy::Sequential, DrivePolicy::Pooled(2), DrivePolicy::Unbounded] {
        // Under concurrent drives the failing file settles first.
        let transport = TransportFn::arc(
            "interleaved",
            |file: FileHandle, _progress: Progress, _ctx: CancellationToken| async move {
                if file.name() == "b.pdf" {
                    return Err(TransportError::fail("connection reset"));
                }
                sleep(Duration::from_millis(20)).await;
                Ok(())
            },
        );
        let cfg = IntakeConfig {
            drive,
            cleanup_delay: Duration::ZERO,
            ..IntakeConfig::default()
        };
        let intake = build(cfg, transport);

        intake
            .accept(vec![pdf("a.pdf", 16), pdf("b.pdf", 16), pdf("c.pdf", 16)])
            .await
            .unwrap()
            .settled()
            .await;

        let tasks = intake.list().await;
        let names: Vec<_> = tasks.iter().map(|t| t.name().to_string()).collect();
        let statuses: Vec<_> = tasks.iter().map(|t| t.status()).collect();
        assert_eq!(names, ["a.pdf", "b.pdf", "c.pdf"], "{drive:?}");
        assert_eq!(
            statuses,
            [TaskStatus::Succeeded, TaskStatus::Failed, TaskStatus::Succeeded],
            "{drive:?}"
        );
        assert_eq!(tasks[1].error(), Some("connection reset"), "{drive:?}");
        assert!(!intake.is_disabled(), "{drive:?}");
    }
}

#[tokio::test]
async fn unrecognized_failures_use_generic_message() {
    let transport = TransportFn::arc(
        "broken",
        |file: FileHandle, _progress: Progress, _ctx: CancellationToken| async move {
            match file.name() {
                "blank.pdf" => Err::<(), _>(TransportError::fail("   ")),
                "panic.pdf" => panic!("transport bug"),
                _ => Err(TransportError::Unrecognized),
            }
        },
    );
    let cfg = IntakeConfig {
        cleanup_delay: Duration::ZERO,
        ..IntakeConfig::default()
    };
    let intake = build(cfg, transport);

    intake
        .accept(vec![pdf("blank.pdf", 8), pdf("panic.pdf", 8), pdf("opaque.pdf", 8)])
        .await
        .unwrap()
        .settled()
        .await;

    for task in intake.list().await {
        assert_eq!(task.status(), TaskStatus::Failed);
        assert_eq!(task.error(), Some(GENERIC_FAILURE_MESSAGE));
    }
}

#[tokio::test]
async fn gate_is_disabled_while_uploading() {
    let release = Arc::new(Notify::new());
    let r = Arc::clone(&release);
    let transport = TransportFn::arc(
        "gated",
        move |_file: FileHandle, _progress: Progress, _ctx: CancellationToken| {
            let r = Arc::clone(&r);
            async move {
                r.notified().await;
                Ok::<_, TransportError>(())
            }
        },
    );
    let cfg = IntakeConfig {
        enforce_gate: true,
        ..IntakeConfig::default()
    };
    let intake = build(cfg, transport);
    let mut gate = intake.subscribe_gate();
    assert!(!intake.is_disabled());

    let batch = intake.accept(vec![pdf("a.pdf", 16)]).await.unwrap();
    timeout(Duration::from_secs(1), gate.wait_for(|disabled| *disabled))
        .await
        .expect("gate closes")
        .unwrap();
    assert!(intake.is_disabled());
    assert_eq!(intake.stats().await.uploading, 1);

    let refused = intake.accept(vec![pdf("b.pdf", 16)]).await;
    assert!(matches!(refused, Err(IntakeError::GateClosed)));
    assert_eq!(intake.list().await.len(), 1);

    let invalid = intake
        .accept(vec![FileHandle::from_bytes("virus.exe", "", vec![0u8; 4])])
        .await
        .expect("rejections are reported while gated");
    assert!(invalid.is_fully_rejected());
    assert!(intake.rejection().expect("notice").message().contains("virus.exe"));

    release.notify_one();
    timeout(Duration::from_secs(1), batch.settled())
        .await
        .expect("batch settles");
    assert!(!intake.is_disabled());
    assert!(!*gate.borrow_and_update());
}

#[tokio::test(start_paused = true)]
async fn manual_removal_cancels_cleanup_timer() {
    let intake = build(IntakeConfig::default(), ok_transport());
    let mut events = intake.events();

    let batch = intake.accept(vec![pdf("a.pdf", 16)]).await.unwrap();
    let id = batch.accepted()[0].clone();
    batch.settled().await;
    assert_eq!(intake.get(&id).await.unwrap().status(), TaskStatus::Succeeded);

    let removed = intake.remove(&id).await.expect("present");
    assert_eq!(removed.id(), &id);
    assert!(intake.remove(&id).await.is_none());

    sleep(Duration::from_secs(5)).await;
    assert!(intake.list().await.is_empty());

    let kinds: Vec<_> = drain(&mut events).into_iter().map(|e| e.kind).collect();
    assert!(kinds.contains(&EventKind::CleanupScheduled));
    assert!(kinds.contains(&EventKind::CleanupCancelled));
    let removals = kinds.iter().filter(|k| **k == EventKind::TaskRemoved).count();
    assert_eq!(removals, 1);
}

#[tokio::test]
async fn removing_an_uploading_task_signals_its_transport() {
    let intake = build(IntakeConfig::default(), cooperative_transport());
    let mut gate = intake.subscribe_gate();

    let batch = intake.accept(vec![pdf("a.pdf", 16)]).await.unwrap();
    let id = batch.accepted()[0].clone();
    timeout(Duration::from_secs(1), gate.wait_for(|disabled| *disabled))
        .await
        .expect("upload starts")
        .unwrap();

    let removed = intake.remove(&id).await.expect("present");
    assert_eq!(removed.status(), TaskStatus::Uploading);
    assert!(!intake.is_disabled());

    timeout(Duration::from_secs(1), batch.settled())
        .await
        .expect("transport honors cancellation");
    assert!(intake.list().await.is_empty());
}

#[tokio::test]
async fn sequential_drive_preserves_creation_order() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(Mutex::new(Vec::new()));
    let (a, p, o) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&order));

    let transport = TransportFn::arc(
        "recording",
        move |file: FileHandle, _progress: Progress, _ctx: CancellationToken| {
            let (a, p, o) = (Arc::clone(&a), Arc::clone(&p), Arc::clone(&o));
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                o.lock().unwrap().push(file.name().to_string());
                sleep(Duration::from_millis(5)).await;
                a.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, TransportError>(())
            }
        },
    );
    let intake = build(IntakeConfig::default(), transport);

    intake
        .accept(vec![pdf("1.pdf", 8), pdf("2.pdf", 8), pdf("3.pdf", 8), pdf("4.pdf", 8)])
        .await
        .unwrap()
        .settled()
        .await;

    assert_eq!(*order.lock().unwrap(), ["1.pdf", "2.pdf", "3.pdf", "4.pdf"]);
    assert_eq!(peak.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn pooled_drive_bounds_concurrency() {
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let (a, p) = (Arc::clone(&active), Arc::clone(&peak));

    let transport = TransportFn::arc(
        "pooled",
        move |_file: FileHandle, _progress: Progress, _ctx: CancellationToken| {
            let (a, p) = (Arc::clone(&a), Arc::clone(&p));
            async move {
                let now = a.fetch_add(1, Ordering::SeqCst) + 1;
                p.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(20)).await;
                a.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, TransportError>(())
            }
        },
    );
    let cfg = IntakeConfig {
        drive: DrivePolicy::Pooled(2),
        ..IntakeConfig::default()
    };
    let intake = build(cfg, transport);

    let files: Vec<_> = (0..6).map(|i| pdf(&format!("{i}.pdf"), 8)).collect();
    intake.accept(files).await.unwrap().settled().await;

    assert_eq!(peak.load(Ordering::SeqCst), 2);
    assert_eq!(intake.stats().await.succeeded, 6);
}

#[tokio::test]
async fn progress_is_reported_and_published() {
    let transport = TransportFn::arc(
        "chunked",
        |file: FileHandle, progress: Progress, _ctx: CancellationToken| async move {
            let total = file.size();
            for sent in [total / 4, total / 2, total / 4, total] {
                progress.bytes(sent, total).await;
            }
            Ok::<_, TransportError>(())
        },
    );
    let intake = build(IntakeConfig::default(), transport);
    let mut events = intake.events();

    let batch = intake.accept(vec![pdf("a.pdf", 400)]).await.unwrap();
    let id = batch.accepted()[0].clone();
    batch.settled().await;

    let progress: Vec<_> = drain(&mut events)
        .into_iter()
        .filter(|e| e.kind == EventKind::TaskProgress)
        .filter_map(|e| e.progress)
        .collect();
    assert_eq!(progress, [25, 50, 100]);
    assert_eq!(intake.get(&id).await.unwrap().progress(), 100);
}

#[tokio::test]
async fn rejection_notice_survives_until_dismissed() {
    let intake = build(IntakeConfig::default(), ok_transport());
    let mut notices = intake.subscribe_rejections();

    intake
        .accept(vec![FileHandle::from_bytes("setup.exe", "application/x-msdownload", vec![0u8; 4])])
        .await
        .unwrap();
    assert!(notices.has_changed().unwrap());
    assert!(notices.borrow_and_update().is_some());

    intake.accept(vec![pdf("ok.pdf", 8)]).await.unwrap().settled().await;
    assert!(intake.rejection().is_some());
    assert!(!notices.has_changed().unwrap());

    assert!(intake.dismiss_rejection());
    assert!(intake.rejection().is_none());
    assert!(!intake.dismiss_rejection());
}

#[tokio::test]
async fn shutdown_closes_intake_and_cancels_uploads() {
    let intake = build(IntakeConfig::default(), cooperative_transport());
    let mut gate = intake.subscribe_gate();

    intake.accept(vec![pdf("a.pdf", 16)]).await.unwrap();
    timeout(Duration::from_secs(1), gate.wait_for(|disabled| *disabled))
        .await
        .expect("upload starts")
        .unwrap();

    intake.shutdown().await.unwrap();
    assert!(intake.is_closed());

    let tasks = intake.list().await;
    let task = &tasks[0];
    assert_eq!(task.status(), TaskStatus::Failed);
    assert_eq!(task.error(), Some("Upload cancelled"));

    let refused = intake.accept(vec![pdf("b.pdf", 16)]).await;
    assert!(matches!(refused, Err(IntakeError::Closed)));
}

#[tokio::test(start_paused = true)]
async fn shutdown_reports_stuck_uploads_after_grace() {
    let transport = TransportFn::arc(
        "stalled",
        |_file: FileHandle, _progress: Progress, _ctx: CancellationToken| async {
            std::future::pending::<()>().await;
            Ok::<_, TransportError>(())
        },
    );
    let cfg = IntakeConfig {
        grace: Duration::from_secs(2),
        ..IntakeConfig::default()
    };
    let intake = build(cfg, transport);
    let mut gate = intake.subscribe_gate();

    let batch = intake.accept(vec![pdf("a.pdf", 16)]).await.unwrap();
    let id = batch.accepted()[0].clone();
    gate.wait_for(|disabled| *disabled).await.unwrap();

    match intake.shutdown().await {
        Err(IntakeError::GraceExceeded { grace, stuck }) => {
            assert_eq!(grace, Duration::from_secs(2));
            assert_eq!(stuck, vec![id]);
        }
        other => panic!("expected GraceExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn builder_requires_a_transport() {
    let res = Orchestrator::builder(IntakeConfig::default()).build();
    assert!(matches!(res, Err(IntakeError::MissingTransport)));
}

struct Recorder(Mutex<Vec<EventKind>>);

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn subscribers_observe_the_lifecycle() {
    let recorder = Arc::new(Recorder(Mutex::new(Vec::new())));
    let intake = Orchestrator::builder(IntakeConfig::default())
        .with_transport(ok_transport())
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build()
        .unwrap();

    intake.accept(vec![pdf("a.pdf", 16)]).await.unwrap().settled().await;

    let seen = timeout(Duration::from_secs(1), async {
        loop {
            if recorder.0.lock().unwrap().contains(&EventKind::TaskSucceeded) {
                break recorder.0.lock().unwrap().clone();
            }
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("events delivered");

    let pos = |k: EventKind| seen.iter().position(|s| *s == k).unwrap();
    assert!(pos(EventKind::TaskQueued) < pos(EventKind::TaskUploading));
    assert!(pos(EventKind::TaskUploading) < pos(EventKind::TaskSucceeded));
    assert!(seen.contains(&EventKind::BatchAccepted));
}

struct SlowRecorder(Mutex<Vec<EventKind>>);

#[async_trait]
impl Subscribe for SlowRecorder {
    async fn on_event(&self, ev: &Event) {
        sleep(Duration::from_millis(2)).await;
        self.0.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "slow-recorder"
    }
}

#[tokio::test]
async fn shutdown_flushes_subscribers() {
    let recorder = Arc::new(SlowRecorder(Mutex::new(Vec::new())));
    let intake = Orchestrator::builder(IntakeConfig::default())
        .with_transport(ok_transport())
        .with_subscribers(vec![recorder.clone() as Arc<dyn Subscribe>])
        .build()
        .unwrap();

    intake
        .accept(vec![pdf("a.pdf", 16), pdf("b.pdf", 16)])
        .await
        .unwrap()
        .settled()
        .await;
    intake.shutdown().await.unwrap();

    let seen = recorder.0.lock().unwrap().clone();
    assert_eq!(seen.last(), Some(&EventKind::AllSettledWithin));
    assert!(seen.contains(&EventKind::ShutdownRequested));
    let succeeded = seen.iter().filter(|k| **k == EventKind::TaskSucceeded).count();
    assert_eq!(succeeded, 2);
}
