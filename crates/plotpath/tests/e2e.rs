//! End-to-end tests: submit through the job service, run the full
//! pipeline against stub tools, inspect the finished job.

#![cfg(unix)]

mod common;

use common::{TestHarness, TRACED_SVG};

use plotpath::jobs::{JobRequest, JobStatus, RawJobRequest};

fn request(max_width: &str, max_height: &str) -> JobRequest {
    JobRequest::from(RawJobRequest {
        max_width: Some(max_width.into()),
        max_height: Some(max_height.into()),
        ..RawJobRequest::default()
    })
}

fn ai_request() -> JobRequest {
    JobRequest {
        use_ai: true,
        ..JobRequest::default()
    }
}

#[tokio::test]
async fn test_plain_job_produces_gcode() {
    let harness = TestHarness::new(TRACED_SVG);

    let id = harness.submit("cat.png", request("50", "50"), None).await;
    let job = harness.wait_for(id).await;

    assert_eq!(job.status(), JobStatus::Done, "{}", job.log_text());
    assert_eq!(harness.recorded_resolution(&job), "422.6560");

    let svg = std::fs::read_to_string(job.work_dir.join("output.svg")).unwrap();
    assert!(!svg.contains("#fefefe"));
    assert!(svg.contains("stroke:#000000"));

    let log = job.log_text();
    assert!(log.contains("White paths removed: 1"));
    assert!(log.contains("SVG dimensions: 832.00 x 832.00 pixels"));
    assert!(log.contains("Calculated DPI: 422.66"));
    assert!(!log.contains("AI Image Transformation"));
    assert_eq!(harness.transformer.calls(), 0);
}

#[tokio::test]
async fn test_non_square_target_uses_limiting_side() {
    let svg = r#"<svg width="400" height="200"><path style="stroke:#000000" d="M0 0"/></svg>"#;
    let harness = TestHarness::new(svg);

    let id = harness.submit("wide.png", request("100", "100"), None).await;
    let job = harness.wait_for(id).await;

    assert_eq!(job.status(), JobStatus::Done, "{}", job.log_text());
    // Width limits: 400 px over 100 mm.
    assert_eq!(harness.recorded_resolution(&job), "101.6000");
}

#[tokio::test]
async fn test_status_view_exposes_svg_once_finished() {
    let harness = TestHarness::new(TRACED_SVG);

    let id = harness.submit("cat.png", JobRequest::default(), None).await;
    harness.wait_for(id).await;

    let view = harness.service.status(id).await.unwrap();
    assert_eq!(view.status, JobStatus::Done);
    assert_eq!(view.original_name, "cat.png");
    assert!(view.svg.unwrap().contains("<svg"));
    assert!(view.ai_image_url.is_none());
    assert!(!view.ai_image_cached);
}

#[tokio::test]
async fn test_ai_without_key_fails_without_calling_service() {
    let harness = TestHarness::new(TRACED_SVG);

    let id = harness.submit("cat.png", ai_request(), Some("   ")).await;
    let job = harness.wait_for(id).await;

    assert_eq!(job.status(), JobStatus::Error);
    assert!(job
        .log_text()
        .contains("Error: AI transformation enabled but no API key provided"));
    assert_eq!(harness.transformer.calls(), 0);
    assert!(harness.service.artifact(id).is_err());
}

#[tokio::test]
async fn test_ai_result_is_cached_across_jobs() {
    let harness = TestHarness::new(TRACED_SVG);

    let first = harness.submit("cat.png", ai_request(), Some("key-1")).await;
    let first = harness.wait_for(first).await;
    assert_eq!(first.status(), JobStatus::Done, "{}", first.log_text());
    assert!(first.log_text().contains("Cache MISS"));
    assert!(!first.ai_image().unwrap().cached);

    let second = harness.submit("cat.png", ai_request(), Some("key-2")).await;
    let second = harness.wait_for(second).await;
    assert_eq!(second.status(), JobStatus::Done, "{}", second.log_text());
    assert!(second.log_text().contains("Cache HIT"));
    assert!(second.ai_image().unwrap().cached);

    assert_eq!(harness.transformer.calls(), 1);
    assert_eq!(harness.cache().len().unwrap(), 1);

    let view = harness.service.status(second.id).await.unwrap();
    let url = view.ai_image_url.unwrap();
    assert!(url.starts_with("/ai-cache/"));
    assert!(url.ends_with(".png"));
    assert!(view.ai_image_cached);
}

#[tokio::test]
async fn test_different_prompt_misses_cache() {
    let harness = TestHarness::new(TRACED_SVG);

    let id = harness.submit("cat.png", ai_request(), Some("key")).await;
    harness.wait_for(id).await;

    let other = JobRequest {
        prompt: "Bold outlines only".into(),
        ..ai_request()
    };
    let id = harness.submit("cat.png", other, Some("key")).await;
    let job = harness.wait_for(id).await;

    assert!(job.log_text().contains("Cache MISS"));
    assert_eq!(harness.transformer.calls(), 2);
    assert_eq!(harness.cache().len().unwrap(), 2);
}

#[tokio::test]
async fn test_tracer_failure_marks_job_failed() {
    let harness = TestHarness::with_tracer("echo 'unsupported format' >&2\nexit 3");

    let id = harness.submit("cat.png", JobRequest::default(), None).await;
    let job = harness.wait_for(id).await;

    assert_eq!(job.status(), JobStatus::Error);
    let log = job.log_text();
    assert!(log.contains("unsupported format"));
    assert!(log.contains("Error: "));
    assert!(job.artifact_path().is_none());
}

#[tokio::test]
async fn test_artifact_available_only_when_done() {
    let harness = TestHarness::new(TRACED_SVG);

    let id = harness.submit("holiday photo.jpeg", JobRequest::default(), None).await;
    harness.wait_for(id).await;

    let artifact = harness.service.artifact(id).unwrap();
    assert_eq!(artifact.download_name, "holiday photo.gcode");
    assert_eq!(
        std::fs::read_to_string(&artifact.path).unwrap(),
        common::harness::GCODE
    );
}

#[tokio::test]
async fn test_upload_saved_with_sanitized_extension() {
    let harness = TestHarness::new(TRACED_SVG);

    let id = harness.submit("scan.PNG", JobRequest::default(), None).await;
    let job = harness.wait_for(id).await;

    assert!(job.work_dir.join("input.png").is_file());
    assert!(job.work_dir.starts_with(harness.data_dir.join("uploads")));
}

#[tokio::test]
async fn test_shutdown_waits_for_running_jobs() {
    let harness = TestHarness::with_tracer(&format!(
        "sleep 0.2\ncat > \"$5\" <<'SVG'\n{TRACED_SVG}\nSVG"
    ));

    let id = harness.submit("cat.png", JobRequest::default(), None).await;
    harness.service.launcher().shutdown().await;

    let job = harness.service.registry().get(id).unwrap();
    assert_eq!(job.status(), JobStatus::Done, "{}", job.log_text());
    assert_eq!(harness.service.launcher().running(), 0);
}
