use async_trait::async_trait;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use super::{TranscribeRequest, Transcriber};
use crate::config::TranscriberConfig;
use crate::error::Result;
use crate::platform::HostPlatform;
use crate::process::{ToolCommand, ToolStatus};
use crate::tools::resolve_tool;

/// whisper-ctranslate2 (faster-whisper CLI) writing SRT output
pub struct WhisperCtranslate2 {
    binary: PathBuf,
    model: String,
    compute_type: String,
    vad_min_silence_ms: u32,
    beam_size: Option<u32>,
    low_priority: bool,
    platform: Arc<dyn HostPlatform>,
}

impl WhisperCtranslate2 {
    pub fn new(config: &TranscriberConfig, platform: Arc<dyn HostPlatform>) -> Self {
        Self {
            binary: resolve_tool(&config.binary_path),
            model: config.model.clone(),
            compute_type: config.compute_type.clone(),
            vad_min_silence_ms: config.vad_min_silence_ms,
            beam_size: config.beam_size,
            low_priority: config.low_priority,
            platform,
        }
    }

    pub fn build_command(&self, source: &Path, request: &TranscribeRequest) -> ToolCommand {
        // Passed as a single JSON argument; no shell is involved so no escaping
        let vad_parameters = json!({ "min_silence_duration_ms": self.vad_min_silence_ms });

        ToolCommand::new(&self.binary, "Subtitle generation")
            .path_arg(source)
            .arg("--model")
            .arg(&self.model)
            .arg("--task")
            .arg(&request.task)
            .arg("--language")
            .arg(&request.language)
            .arg("--device")
            .arg(request.device.as_tool_arg())
            .opt_arg("--beam_size", self.beam_size.map(|b| b.to_string()))
            .args(["--vad_filter", "True"])
            .arg("--vad_parameters")
            .arg(vad_parameters.to_string())
            .arg("--compute_type")
            .arg(&self.compute_type)
            .args(["--output_format", "srt"])
            .arg("--output_dir")
            .path_arg(&request.output_dir)
            .low_priority(self.low_priority)
    }
}

#[async_trait]
impl Transcriber for WhisperCtranslate2 {
    async fn transcribe(&self, source: &Path, request: &TranscribeRequest) -> Result<ToolStatus> {
        info!(
            "Generating subtitles for {} ({} -> {}, model {}, device {})",
            source.display(),
            request.language,
            request.task,
            self.model,
            request.device.as_tool_arg()
        );

        let status = self
            .build_command(source, request)
            .execute(self.platform.as_ref())
            .await?;

        if !status.success {
            warn!("whisper-ctranslate2 finished with {}", status);
        }
        Ok(status)
    }
}
