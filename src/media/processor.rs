use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use super::{EncodeOptions, Encoder, MediaCommandBuilder, Muxer, SubtitleTrack};
use crate::config::{EncodeConfig, MediaConfig};
use crate::encoding::EncodeSpec;
use crate::error::Result;
use crate::platform::HostPlatform;
use crate::process::ToolStatus;
use crate::tools::resolve_tool;

/// ffmpeg encoder (SVT-AV1 or NVENC HEVC video, Opus audio)
pub struct FfmpegEncoder {
    command_builder: MediaCommandBuilder,
    options: EncodeOptions,
    low_priority: bool,
    platform: Arc<dyn HostPlatform>,
}

impl FfmpegEncoder {
    pub fn new(encode: &EncodeConfig, media: &MediaConfig, platform: Arc<dyn HostPlatform>) -> Self {
        Self {
            command_builder: MediaCommandBuilder::new(
                resolve_tool(&media.ffmpeg_path),
                resolve_tool(&media.ffprobe_path),
            ),
            options: EncodeOptions {
                svtav1_params: encode.svtav1_params.clone(),
                extra_args: encode.extra_args.clone(),
                clip_seconds: None,
            },
            low_priority: media.encode_low_priority,
            platform,
        }
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn encode(&self, source: &Path, dest: &Path, spec: &EncodeSpec) -> Result<ToolStatus> {
        info!("Encoding {} -> {}", source.display(), dest.display());
        info!("Settings: {}", spec.describe());

        let command = self
            .command_builder
            .encode(source, dest, spec, &self.options)
            .low_priority(self.low_priority);

        let status = command.execute(self.platform.as_ref()).await?;
        if !status.success {
            warn!("ffmpeg encode of {} finished with {}", source.display(), status);
        }
        Ok(status)
    }
}

/// ffmpeg stream-copy muxer adding a tagged subtitle track
pub struct FfmpegMuxer {
    command_builder: MediaCommandBuilder,
    track: SubtitleTrack,
    low_priority: bool,
    platform: Arc<dyn HostPlatform>,
}

impl FfmpegMuxer {
    pub fn new(media: &MediaConfig, platform: Arc<dyn HostPlatform>) -> Self {
        Self {
            command_builder: MediaCommandBuilder::new(
                resolve_tool(&media.ffmpeg_path),
                resolve_tool(&media.ffprobe_path),
            ),
            track: SubtitleTrack {
                language: media.subtitle_language.clone(),
                title: media.subtitle_title.clone(),
            },
            low_priority: media.mux_low_priority,
            platform,
        }
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, video: &Path, subtitle: &Path, dest: &Path) -> Result<ToolStatus> {
        info!(
            "Muxing subtitles from {} into {} -> {}",
            subtitle.display(),
            video.display(),
            dest.display()
        );

        let command = self
            .command_builder
            .mux(video, subtitle, dest, &self.track)
            .low_priority(self.low_priority);

        let status = command.execute(self.platform.as_ref()).await?;
        if !status.success {
            warn!("ffmpeg mux into {} finished with {}", dest.display(), status);
        }
        Ok(status)
    }
}
