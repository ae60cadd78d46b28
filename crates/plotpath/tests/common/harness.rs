//! Isolated job service for integration tests.
//!
//! The tracer and generator are replaced by shell scripts: the tracer
//! writes a fixed SVG to its output file, the generator records the
//! resolution it was given in `dpi.txt` next to its output and writes a
//! one-line G-code program.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use plotpath::jobs::{Job, JobId, JobRequest};
use plotpath::pipeline::{Pipeline, PipelineConfig};
use plotpath::service::{JobService, Upload};
use plotpath::transform::{
    ApiKey, ImageTransformer, TransformError, TransformRequest, TransformedImage,
};
use plotpath::worker::JobLauncher;
use plotpath::{JobRegistry, ResultCache};

/// 832 x 832 document with one near-white and one black stroke.
pub const TRACED_SVG: &str = r#"<?xml version="1.0" standalone="yes"?>
<svg width="832" height="832">
<path style="stroke:#fefefe; fill:none;" d="M0 0L10 10"/>
<path style="stroke:#000000; fill:none;" d="M5 5L20 20"/>
</svg>"#;

pub const GCODE: &str = "G21\nG90\n";

/// Image transformer returning fixed bytes and counting invocations.
pub struct CountingTransformer {
    calls: AtomicUsize,
    bytes: Vec<u8>,
}

impl CountingTransformer {
    pub fn new(bytes: &[u8]) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            bytes: bytes.to_vec(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageTransformer for CountingTransformer {
    async fn transform(
        &self,
        _request: TransformRequest<'_>,
        _credential: &ApiKey,
    ) -> Result<TransformedImage, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(TransformedImage {
            bytes: self.bytes.clone(),
            mime_type: "image/png".to_string(),
        })
    }
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub data_dir: PathBuf,
    pub transformer: Arc<CountingTransformer>,
    pub service: JobService,
}

impl TestHarness {
    /// Harness whose tracer emits `svg`.
    pub fn new(svg: &str) -> Self {
        Self::with_tracer(&format!("cat > \"$5\" <<'SVG'\n{svg}\nSVG\necho traced"))
    }

    /// Harness with a custom tracer script body.
    pub fn with_tracer(tracer_body: &str) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let bin_dir = temp_dir.path().join("bin");
        let data_dir = temp_dir.path().join("data");
        std::fs::create_dir_all(&bin_dir).expect("Failed to create bin dir");

        let tracer = write_script(&bin_dir, "tracer", tracer_body);
        let generator = write_script(
            &bin_dir,
            "generator",
            &format!(
                "printf '%s' \"$6\" > \"$(dirname \"$9\")/dpi.txt\"\nprintf '{}' > \"$9\"",
                GCODE.replace('\n', "\\n")
            ),
        );

        let config = Arc::new(PipelineConfig {
            tracer_program: tracer,
            generator_program: generator,
            ..PipelineConfig::default()
        });
        let cache = ResultCache::open(&data_dir.join("ai_cache.db"), &data_dir.join("ai_cache"))
            .expect("Failed to open cache");
        let transformer = Arc::new(CountingTransformer::new(b"line art png"));
        let pipeline = Arc::new(Pipeline::new(config, cache, transformer.clone()));
        let launcher = JobLauncher::new(pipeline, Arc::new(JobRegistry::new()));
        let service = JobService::new(launcher, data_dir.join("uploads"));

        Self {
            temp_dir,
            data_dir,
            transformer,
            service,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn cache(&self) -> &ResultCache {
        self.service.launcher().pipeline().cache()
    }

    pub async fn submit(&self, filename: &str, request: JobRequest, key: Option<&str>) -> JobId {
        let upload = Upload {
            filename: filename.to_string(),
            bytes: b"raster bytes".to_vec(),
        };
        self.service
            .submit(upload, request, key.and_then(ApiKey::new))
            .await
            .expect("Failed to submit job")
    }

    /// Polls the registry until the job leaves `processing`.
    pub async fn wait_for(&self, id: JobId) -> Job {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
        loop {
            let job = self.service.registry().get(id).expect("Job not registered");
            if job.status().is_terminal() {
                return job;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "Job {} did not finish:\n{}",
                id,
                job.log_text()
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    /// Resolution passed to the generator for a finished job.
    pub fn recorded_resolution(&self, job: &Job) -> String {
        std::fs::read_to_string(job.work_dir.join("dpi.txt")).expect("Generator did not run")
    }
}

pub fn write_script(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to chmod script");
    path.to_string_lossy().into_owned()
}
