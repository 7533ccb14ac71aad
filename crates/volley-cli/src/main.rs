//! End-to-end local demo: validate a task, dispatch it onto the function
//! backend, pace probes against a throwaway HTTP target and watch the
//! status roll up to Done.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::time::{Duration, sleep};
use tracing::info;

use volley_core::app::{
    BackendRegistry, Dispatcher, PacingLoop, StatusTracker, TaskQuery, TaskValidator, WorkerGroup,
};
use volley_core::domain::{Compute, Region, TaskSpec, TaskStatus};
use volley_core::impls::{
    FunctionBackend, HttpProber, InMemoryFanout, InMemoryReportSink, InMemoryTaskStore,
    LocalStepper, StaticRegionOracle,
};
use volley_core::ports::{SystemClock, UlidGenerator};

/// Throwaway target: answers every request with an empty 200.
fn spawn_target() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind demo target");
    let addr = listener.local_addr().expect("local addr");
    std::thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let mut stream = stream;
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf);
            let _ = stream.write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n");
        }
    });
    format!("http://{addr}/")
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let home = Region::new("local");
    let topic = "probes";

    // (A) shared infrastructure: clock, ids, store, fan-out, report sink
    let clock = Arc::new(SystemClock);
    let ids = Arc::new(UlidGenerator::new(SystemClock));
    let store = Arc::new(InMemoryTaskStore::new());
    let fanout = Arc::new(InMemoryFanout::new());
    let reports = Arc::new(InMemoryReportSink::new());
    let prober = Arc::new(HttpProber::new(ids.clone(), clock.clone()));

    // (B) pacing loops run as local tokio tasks behind the stepper; their
    // lifecycle events feed the status tracker
    let pacing = Arc::new(PacingLoop::new(
        clock.clone(),
        fanout.clone(),
        prober.clone(),
        reports.clone(),
        topic,
    ));
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let stepper = Arc::new(LocalStepper::new(pacing, events_tx));
    let tracker = StatusTracker::new(store.clone());
    let pump = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            tracker
                .apply(&event.region, event.task_id, &event.unit, event.state)
                .await;
        }
    });

    // (C) probe workers draining the fan-out topic
    let workers = WorkerGroup::spawn(
        4,
        fanout.clone(),
        topic.into(),
        prober.clone(),
        reports.clone(),
    );

    // (D) validate and dispatch a short rate-mode task
    let target = spawn_target();
    let validator = TaskValidator::new(
        Arc::new(StaticRegionOracle::new(vec![home.clone()])),
        clock.clone(),
        ids.clone(),
        home.clone(),
    );
    let now = chrono::Utc::now();
    let spec = TaskSpec {
        name: Some("demo".into()),
        kind: Some("API".into()),
        url: Some(target),
        method: Some("GET".into()),
        compute: Some(Compute::Function),
        qps: Some(3),
        end_time: Some(now + chrono::Duration::seconds(5)),
        report: true,
        ..TaskSpec::default()
    };
    let task = match validator.validate(spec).await {
        Ok(task) => task,
        Err(e) => {
            eprintln!("invalid task: {e}");
            return;
        }
    };
    info!(task_id = %task.task_id, "task validated");

    let registry =
        Arc::new(BackendRegistry::new().register(Compute::Function, Arc::new(FunctionBackend::new(stepper))));
    let dispatcher = Dispatcher::new(store.clone(), registry);
    let report = dispatcher.dispatch(&task).await;
    if !report.failed().is_empty() {
        eprintln!("dispatch failed in {:?}", report.failed());
        return;
    }

    // (E) poll until the rollup goes terminal
    let query = TaskQuery::new(store.clone(), home);
    loop {
        let copies = query.get(task.task_id, None).await.expect("task exists");
        let status = copies[0].status;
        if matches!(status, TaskStatus::Done | TaskStatus::Failed) {
            let rows = reports.rows().await;
            let ok = rows.iter().filter(|r| r.success).count();
            println!(
                "final status: {status:?}, probes recorded: {} ({} ok)",
                rows.len(),
                ok
            );
            break;
        }
        sleep(Duration::from_millis(200)).await;
    }

    workers.shutdown_and_join().await;
    pump.abort();
}
