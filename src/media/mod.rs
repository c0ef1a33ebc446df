// ffmpeg-backed media stages
//
// - Commands: argument construction for encode, mux and probe invocations
// - Processor: the Encoder and Muxer implementations that run them

pub mod commands;
pub mod processor;

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

pub use commands::*;
pub use processor::*;

use crate::config::{EncodeConfig, MediaConfig};
use crate::encoding::EncodeSpec;
use crate::error::Result;
use crate::platform::HostPlatform;
use crate::process::ToolStatus;

/// Stage 1: transcode `source` into `dest`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Encoder: Send + Sync {
    async fn encode(&self, source: &Path, dest: &Path, spec: &EncodeSpec) -> Result<ToolStatus>;
}

/// Stage 3: combine a video and a subtitle file into `dest` without re-encoding.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn mux(&self, video: &Path, subtitle: &Path, dest: &Path) -> Result<ToolStatus>;
}

/// Factory for the ffmpeg-based stage implementations
pub struct MediaToolFactory;

impl MediaToolFactory {
    pub fn create_encoder(
        encode: &EncodeConfig,
        media: &MediaConfig,
        platform: Arc<dyn HostPlatform>,
    ) -> Box<dyn Encoder> {
        Box::new(FfmpegEncoder::new(encode, media, platform))
    }

    pub fn create_muxer(media: &MediaConfig, platform: Arc<dyn HostPlatform>) -> Box<dyn Muxer> {
        Box::new(FfmpegMuxer::new(media, platform))
    }
}
