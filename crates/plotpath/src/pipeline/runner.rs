use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::cache::key::extension_for_mime;
use crate::cache::{CachedResult, Fingerprint, ResultCache};
use crate::jobs::AiImage;
use crate::sanitize;
use crate::svg::{
    compute_fit_scale, filter_background_file, format_resolution, read_dimensions, resolution_for,
};
use crate::tools::{ToolOutput, ToolpathGenerator, Tracer};
use crate::transform::{
    input_mime_type, ApiKey, GeminiTransformer, ImageTransformer, TransformError,
    TransformRequest, TransformedImage,
};

use super::config::PipelineConfig;
use super::context::PipelineContext;
use super::error::{PipelineError, PipelineWarning};
use super::progress::{ProgressEvent, ProgressReporter};
use super::result::JobResult;

pub struct Pipeline {
    config: Arc<PipelineConfig>,
    cache: ResultCache,
    transformer: Arc<dyn ImageTransformer>,
    tracer: Tracer,
    generator: ToolpathGenerator,
}

impl Pipeline {
    /// Production constructor: talks to the configured transform endpoint.
    pub fn from_config(
        config: Arc<PipelineConfig>,
        cache: ResultCache,
    ) -> Result<Self, TransformError> {
        let transformer =
            GeminiTransformer::new(config.transform_endpoint.clone(), config.transform_timeout)?;
        Ok(Self::new(config, cache, Arc::new(transformer)))
    }

    pub fn new(
        config: Arc<PipelineConfig>,
        cache: ResultCache,
        transformer: Arc<dyn ImageTransformer>,
    ) -> Self {
        Self {
            tracer: Tracer::new(config.tracer_program.clone()),
            generator: ToolpathGenerator::new(config.generator_program.clone()),
            config,
            cache,
            transformer,
        }
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    /// Runs every stage for one job. Failures end up in the returned
    /// result and in the progress stream, never as a panic or `Err`.
    pub async fn run(
        &self,
        ctx: PipelineContext,
        credential: Option<ApiKey>,
        progress: &dyn ProgressReporter,
    ) -> (JobResult, PipelineContext) {
        let span = info_span!("pipeline",
            job_id = %ctx.job.id,
            filename = %sanitize::redact_path(&ctx.input_path),
            use_ai = ctx.job.use_ai,
        );
        self.run_steps(ctx, credential, progress)
            .instrument(span)
            .await
    }

    async fn run_steps(
        &self,
        mut ctx: PipelineContext,
        credential: Option<ApiKey>,
        progress: &dyn ProgressReporter,
    ) -> (JobResult, PipelineContext) {
        // Step 1: AI transform
        if ctx.job.use_ai {
            let outcome = self
                .step_transform(&mut ctx, credential.as_ref(), progress)
                .instrument(info_span!("ai_transform"))
                .await;
            if let Err(e) = outcome {
                return Self::fail(ctx, e, progress);
            }
        }
        drop(credential);

        // Step 2: Trace
        let outcome = self
            .step_trace(&mut ctx, progress)
            .instrument(info_span!("trace"))
            .await;
        if let Err(e) = outcome {
            return Self::fail(ctx, e, progress);
        }

        // Step 3: Filter background strokes
        self.step_filter(&mut ctx, progress)
            .instrument(info_span!("filter"))
            .await;

        // Step 4: Scale
        let resolution = self
            .step_scale(&mut ctx, progress)
            .instrument(info_span!("scale"))
            .await;

        // Step 5: Generate
        let outcome = self
            .step_generate(&ctx, &resolution, progress)
            .instrument(info_span!("generate"))
            .await;
        if let Err(e) = outcome {
            return Self::fail(ctx, e, progress);
        }

        let artifact = ctx.gcode_target();
        ctx.artifact_path = Some(artifact.clone());
        info!(artifact = %sanitize::redact_path(&artifact), "Job finished");
        progress.report(ProgressEvent::Completed {
            artifact_path: artifact.clone(),
        });
        (JobResult::success(ctx.job.id, artifact), ctx)
    }

    fn fail(
        ctx: PipelineContext,
        error: PipelineError,
        progress: &dyn ProgressReporter,
    ) -> (JobResult, PipelineContext) {
        let message = error.to_string();
        warn!(error = %message, "Job failed");
        progress.report(ProgressEvent::Log(format!("Error: {}", message)));
        progress.report(ProgressEvent::Failed {
            error: message.clone(),
        });
        (JobResult::failure(ctx.job.id, message), ctx)
    }

    async fn step_transform(
        &self,
        ctx: &mut PipelineContext,
        credential: Option<&ApiKey>,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        log(progress, "=== Running AI Image Transformation ===");

        let fingerprint = Fingerprint::of_file(&ctx.input_path)
            .await
            .map_err(PipelineError::Fingerprint)?;
        log(progress, format!("Input image hash: {}", fingerprint.short()));

        let prompt = ctx.job.prompt.clone();

        let hit = match self.cache_lookup(&fingerprint, &prompt).await {
            Ok(hit) => hit,
            Err(message) => {
                warn!("Cache lookup failed, treating as miss: {}", message);
                log(progress, format!("Cache lookup error: {}", message));
                ctx.warnings.push(PipelineWarning::CacheLookup(message));
                None
            }
        };

        if let Some(hit) = hit {
            log(
                progress,
                format!("Cache HIT - using cached result: {}", hit.filename),
            );
            ctx.working_image = hit.full_path;
            Self::record_ai_image(
                ctx,
                AiImage {
                    filename: Some(hit.filename),
                    cached: true,
                },
                progress,
            );
            return Ok(());
        }

        log(progress, "Cache MISS - calling image transform service...");
        let credential = credential.ok_or(PipelineError::MissingCredential)?;

        let image = tokio::fs::read(&ctx.input_path)
            .await
            .map_err(|source| PipelineError::ReadInput {
                path: ctx.input_path.clone(),
                source,
            })?;
        let mime_type = input_mime_type(&ctx.input_path);
        debug!(mime_type = %mime_type, bytes = image.len(), "Calling image transform service");

        let transformed = self
            .transformer
            .transform(
                TransformRequest {
                    image: &image,
                    mime_type: &mime_type,
                    prompt: &prompt,
                },
                credential,
            )
            .await?;

        let (stored, transformed) = self.cache_store(fingerprint, prompt, transformed).await?;

        let filename = match stored {
            Ok(entry) => {
                ctx.working_image = entry.full_path;
                Some(entry.filename)
            }
            Err(message) => {
                warn!("Failed to cache transform result: {}", message);
                log(
                    progress,
                    format!("Warning: failed to cache result: {}", message),
                );
                ctx.warnings.push(PipelineWarning::CacheStore(message));

                let fallback = ctx.job.work_dir.join(format!(
                    "ai_generated{}",
                    extension_for_mime(&transformed.mime_type)
                ));
                tokio::fs::write(&fallback, &transformed.bytes)
                    .await
                    .map_err(PipelineError::SaveAiImage)?;
                ctx.working_image = fallback;
                None
            }
        };

        log(
            progress,
            format!(
                "AI transformation complete, saved as: {}",
                sanitize::redact_path(&ctx.working_image)
            ),
        );
        Self::record_ai_image(
            ctx,
            AiImage {
                filename,
                cached: false,
            },
            progress,
        );
        Ok(())
    }

    fn record_ai_image(ctx: &mut PipelineContext, image: AiImage, progress: &dyn ProgressReporter) {
        ctx.ai_image = Some(image.clone());
        progress.report(ProgressEvent::AiImage(image));
    }

    /// Index lookups run on the blocking pool; errors come back as text
    /// since they only ever become log lines.
    async fn cache_lookup(
        &self,
        fingerprint: &Fingerprint,
        prompt: &str,
    ) -> Result<Option<CachedResult>, String> {
        let cache = self.cache.clone();
        let fingerprint = fingerprint.clone();
        let prompt = prompt.to_string();
        tokio::task::spawn_blocking(move || cache.lookup(&fingerprint, &prompt))
            .await
            .map_err(|e| e.to_string())?
            .map_err(|e| e.to_string())
    }

    /// Stores the image, handing it back so a failed store can fall back to
    /// the job directory.
    async fn cache_store(
        &self,
        fingerprint: Fingerprint,
        prompt: String,
        image: TransformedImage,
    ) -> Result<(Result<CachedResult, String>, TransformedImage), PipelineError> {
        let cache = self.cache.clone();
        tokio::task::spawn_blocking(move || {
            let stored = cache
                .store(&fingerprint, &prompt, &image.bytes, &image.mime_type)
                .map_err(|e| e.to_string());
            (stored, image)
        })
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))
    }

    async fn step_trace(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let program = &self.config.tracer_program;
        let svg = ctx.svg_target();

        log(progress, format!("=== Running {} ===", program));
        log(
            progress,
            format!(
                "Command: {}",
                self.tracer.invocation(&ctx.working_image, &svg)
            ),
        );

        match self.tracer.trace(&ctx.working_image, &svg).await {
            Ok(output) => {
                log_output(&output, progress);
                log(progress, format!("{} completed successfully", program));
                ctx.svg_path = Some(svg);
                Ok(())
            }
            Err(e) => {
                if let Some(output) = e.output() {
                    log_output(output, progress);
                }
                Err(e.into())
            }
        }
    }

    async fn step_filter(&self, ctx: &mut PipelineContext, progress: &dyn ProgressReporter) {
        log(progress, "=== Filtering white paths from SVG ===");
        match filter_background_file(&ctx.svg_target()).await {
            Ok(report) => {
                debug!(removed = report.removed, kept = report.kept, "Filtered SVG");
                log(
                    progress,
                    format!("White paths removed: {}", report.removed),
                );
            }
            Err(e) => {
                warn!("Failed to filter SVG, keeping it unchanged: {}", e);
                log(
                    progress,
                    format!("Warning: failed to filter white paths: {}", e),
                );
                ctx.warnings.push(PipelineWarning::Filter(e.to_string()));
            }
        }
    }

    /// Derives the generator resolution so the drawing fits the requested
    /// box. Never fails: unreadable dimensions fall back to defaults.
    async fn step_scale(
        &self,
        ctx: &mut PipelineContext,
        progress: &dyn ProgressReporter,
    ) -> String {
        let dimensions = read_dimensions(&ctx.svg_target()).await;
        let (max_w, max_h) = (ctx.job.max_width, ctx.job.max_height);

        log(
            progress,
            format!(
                "SVG dimensions: {:.2} x {:.2} pixels",
                dimensions.width, dimensions.height
            ),
        );
        log(
            progress,
            format!("Max output dimensions: {:.2} x {:.2} mm", max_w, max_h),
        );

        let (fitted_w, fitted_h) =
            compute_fit_scale(dimensions.width, dimensions.height, max_w, max_h);
        log(
            progress,
            format!(
                "Target output dimensions: {:.2} x {:.2} mm",
                fitted_w, fitted_h
            ),
        );

        let dpi = resolution_for(dimensions.width, fitted_w);
        log(progress, format!("Calculated DPI: {:.2}", dpi));

        let resolution = format_resolution(dpi, self.config.dpi_precision);
        ctx.dimensions = Some(dimensions);
        ctx.fitted = Some((fitted_w, fitted_h));
        ctx.resolution = Some(resolution.clone());
        resolution
    }

    async fn step_generate(
        &self,
        ctx: &PipelineContext,
        resolution: &str,
        progress: &dyn ProgressReporter,
    ) -> Result<(), PipelineError> {
        let program = &self.config.generator_program;
        let svg = ctx.svg_target();
        let gcode = ctx.gcode_target();
        let (tool_on, tool_off) = (&ctx.job.tool_on, &ctx.job.tool_off);

        log(progress, format!("=== Running {} ===", program));
        log(
            progress,
            format!(
                "Command: {}",
                self.generator
                    .invocation(&svg, &gcode, tool_on, tool_off, resolution)
            ),
        );

        match self
            .generator
            .generate(&svg, &gcode, tool_on, tool_off, resolution)
            .await
        {
            Ok(output) => {
                log_output(&output, progress);
                log(progress, format!("{} completed successfully", program));
                Ok(())
            }
            Err(e) => {
                if let Some(output) = e.output() {
                    log_output(output, progress);
                }
                Err(e.into())
            }
        }
    }
}

fn log(progress: &dyn ProgressReporter, line: impl Into<String>) {
    progress.report(ProgressEvent::Log(line.into()));
}

fn log_output(output: &ToolOutput, progress: &dyn ProgressReporter) {
    for (heading, text) in output.sections() {
        log(progress, format!("{}:\n{}", heading, text));
    }
}
