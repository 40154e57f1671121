//! Job slot gauges across dropped requests.
//!
//! Kept in its own test binary: the gauges are process-wide statics, so other
//! tests running jobs in parallel would move them.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use soundshift_core::ConverterConfig;
use soundshift_server::metrics::{JOBS_RUNNING, JOBS_WAITING};

use common::TestFixture;

fn convert_body(name: &str) -> serde_json::Value {
    json!({
        "input_path": format!("{name}.wav"),
        "output_path": format!("{name}.mp3"),
        "output_format": "mp3"
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_gauges_settle_after_dropped_requests() {
    let fixture = TestFixture::with_engine(ConverterConfig::default().with_max_parallel(1));
    fixture.runner.set_run_duration(Duration::from_millis(400));

    let first = {
        let fixture = fixture.clone();
        tokio::spawn(async move { fixture.post("/api/v1/convert", convert_body("first")).await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(JOBS_RUNNING.get(), 1);

    // Dropped while queued behind the only slot.
    let queued = fixture.post("/api/v1/convert", convert_body("second"));
    let dropped = tokio::time::timeout(Duration::from_millis(50), queued).await;
    assert!(dropped.is_err());
    assert_eq!(JOBS_WAITING.get(), 0);

    let response = first.await.unwrap();
    assert_status!(response, StatusCode::OK);
    assert_eq!(JOBS_RUNNING.get(), 0);

    // Dropped while its engine run is in progress.
    let running = fixture.post("/api/v1/convert", convert_body("third"));
    let dropped = tokio::time::timeout(Duration::from_millis(50), running).await;
    assert!(dropped.is_err());

    let mut settled = false;
    for _ in 0..100 {
        if JOBS_RUNNING.get() == 0 && JOBS_WAITING.get() == 0 {
            settled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(settled, "Job gauges did not return to zero");
}
