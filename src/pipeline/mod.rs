// Encode -> transcribe -> mux orchestration
//
// - Types: media items, per-item results, output path derivation
// - Batch: sequential driver over many items with failure isolation

pub mod batch;
pub mod types;

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

pub use batch::*;
pub use types::*;

use crate::config::Config;
use crate::encoding::EncodeSpec;
use crate::error::Result;
use crate::media::{Encoder, MediaToolFactory, Muxer};
use crate::platform::HostPlatform;
use crate::subtitle::{is_usable_output, locate_subtitle, subtitle_candidates, subtitle_cue_count};
use crate::transcribe::{TranscribeRequest, Transcriber, TranscriberFactory};

/// Runs one media item through the stages. Holds no per-item state, so one
/// instance serves a whole batch.
pub struct Pipeline {
    encoder: Box<dyn Encoder>,
    transcriber: Box<dyn Transcriber>,
    muxer: Box<dyn Muxer>,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(
        encoder: Box<dyn Encoder>,
        transcriber: Box<dyn Transcriber>,
        muxer: Box<dyn Muxer>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            encoder,
            transcriber,
            muxer,
            options,
        }
    }

    /// Pipeline backed by ffmpeg and whisper-ctranslate2
    pub fn from_config(
        config: &Config,
        options: PipelineOptions,
        platform: Arc<dyn HostPlatform>,
    ) -> Self {
        Self::new(
            MediaToolFactory::create_encoder(&config.encode, &config.media, platform.clone()),
            TranscriberFactory::create_default(&config.transcriber, platform.clone()),
            MediaToolFactory::create_muxer(&config.media, platform),
            options,
        )
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn output_paths(&self, item: &MediaItem) -> Result<OutputPaths> {
        OutputPaths::derive(item, &self.options)
    }

    /// Run every stage for `item`. Stage failures are folded into the
    /// result; an `Err` means the item could not be processed at all.
    pub async fn run(&self, item: &MediaItem, spec: &EncodeSpec) -> Result<PipelineResult> {
        let started = Instant::now();
        let elapsed = || started.elapsed().as_secs_f64();
        let paths = self.output_paths(item)?;
        let stem = item.stem()?;
        let total_stages = match self.options.mode {
            PipelineMode::Full => 3,
            PipelineMode::SubtitlesOnly => 2,
        };
        let mut stage_number = 0;

        tokio::fs::create_dir_all(&paths.dir).await?;

        if self.options.mode == PipelineMode::Full {
            stage_number += 1;
            info!("[{}/{}] Encoding video: {}", stage_number, total_stages, item.display_name());
            remove_stale(&paths.encoded).await?;

            let status = self.encoder.encode(&item.source_path, &paths.encoded, spec).await?;

            // Existence, not the exit code, decides whether the encode worked
            if !is_usable_output(&paths.encoded) {
                warn!("Encoding failed: {} was not produced ({})", paths.encoded.display(), status);
                return Ok(PipelineResult::failed(
                    item.clone(),
                    paths.encoded,
                    format!("Encoder produced no output ({})", status),
                    elapsed(),
                ));
            }
            if !status.success {
                warn!(
                    "Encoder reported {} but {} exists, continuing",
                    status,
                    paths.encoded.display()
                );
            }
            info!("Video encoding complete: {}", paths.encoded.display());
        }

        stage_number += 1;
        info!(
            "[{}/{}] Generating subtitles ({} -> {}): {}",
            stage_number,
            total_stages,
            self.options.language,
            self.options.task,
            item.display_name()
        );
        for candidate in subtitle_candidates(&paths.dir, &stem) {
            remove_stale(&candidate).await?;
        }

        let request = TranscribeRequest {
            language: self.options.language.clone(),
            task: self.options.task.clone(),
            device: self.options.device,
            output_dir: paths.dir.clone(),
        };
        let transcribe_error = match self.transcriber.transcribe(&item.source_path, &request).await {
            Ok(status) if status.success => None,
            Ok(status) => Some(format!("Transcriber finished with {}", status)),
            Err(e) => {
                warn!("Transcription of {} failed: {}", item.display_name(), e);
                Some(e.to_string())
            }
        };

        let Some(subtitle) = locate_subtitle(&paths.dir, &stem) else {
            let message = transcribe_error
                .unwrap_or_else(|| format!("Subtitle file {} was not generated", paths.subtitle.display()));
            warn!("Skipping muxing, keeping {}: {}", paths.encoded.display(), message);
            return Ok(PipelineResult::partial(
                item.clone(),
                paths.encoded,
                None,
                message,
                elapsed(),
            ));
        };
        if let Some(message) = transcribe_error {
            warn!("{}, but {} exists, continuing", message, subtitle.display());
        }
        info!(
            "Subtitles generated: {} ({} cues)",
            subtitle.display(),
            subtitle_cue_count(&subtitle).await
        );

        stage_number += 1;
        info!("[{}/{}] Muxing subtitles into {}", stage_number, total_stages, paths.final_output.display());
        remove_stale(&paths.final_output).await?;

        let mux_error = match self.muxer.mux(&paths.encoded, &subtitle, &paths.final_output).await {
            Ok(status) if status.success && is_usable_output(&paths.final_output) => None,
            Ok(status) if !status.success => Some(format!("Muxer finished with {}", status)),
            Ok(_) => Some(format!("Muxer produced no output at {}", paths.final_output.display())),
            Err(e) => Some(e.to_string()),
        };

        if let Some(message) = mux_error {
            warn!("Muxing failed, keeping {}: {}", paths.encoded.display(), message);
            return Ok(PipelineResult::partial(
                item.clone(),
                paths.encoded,
                Some(subtitle),
                message,
                elapsed(),
            ));
        }

        info!("Final file created: {}", paths.final_output.display());
        Ok(PipelineResult::success(
            item.clone(),
            paths.encoded,
            subtitle,
            paths.final_output,
            elapsed(),
        ))
    }
}

/// Remove a previous run's output so that existence afterwards reflects this run.
async fn remove_stale(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("Removed stale output {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
