// Speech-to-text stage
//
// The transcriber reads the original source and writes `<basename>.srt` into
// the requested output directory. Only whisper-ctranslate2 is implemented;
// another engine plugs in by implementing `Transcriber` and extending the
// factory.

pub mod whisper;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::TranscriberConfig;
use crate::error::Result;
use crate::platform::HostPlatform;
use crate::process::ToolStatus;

/// Inference device hint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Device {
    Cpu,
    /// GPU inference (CUDA)
    #[serde(alias = "cuda", alias = "gpu")]
    #[value(alias = "cuda", alias = "gpu")]
    Accelerated,
}

impl Device {
    /// Value of whisper-ctranslate2's `--device`
    pub fn as_tool_arg(&self) -> &'static str {
        match self {
            Device::Cpu => "cpu",
            Device::Accelerated => "cuda",
        }
    }
}

/// Parameters of one transcription run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscribeRequest {
    /// Spoken language of the source
    pub language: String,
    /// "translate" or "transcribe"
    pub task: String,
    pub device: Device,
    /// Directory the subtitle file is written into
    pub output_dir: PathBuf,
}

/// Stage 2: produce a subtitle file from the audio of `source`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, source: &Path, request: &TranscribeRequest) -> Result<ToolStatus>;
}

/// Transcriber implementation type
#[derive(Debug, Clone)]
pub enum TranscriberImplementation {
    WhisperCtranslate2,
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    pub fn create_transcriber(
        implementation: TranscriberImplementation,
        config: &TranscriberConfig,
        platform: Arc<dyn HostPlatform>,
    ) -> Box<dyn Transcriber> {
        match implementation {
            TranscriberImplementation::WhisperCtranslate2 => {
                Box::new(whisper::WhisperCtranslate2::new(config, platform))
            }
        }
    }

    pub fn create_default(
        config: &TranscriberConfig,
        platform: Arc<dyn HostPlatform>,
    ) -> Box<dyn Transcriber> {
        Self::create_transcriber(TranscriberImplementation::WhisperCtranslate2, config, platform)
    }
}
