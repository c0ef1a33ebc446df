use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::encoding::{TargetHeight, VideoCodec, MAX_CRF, MAX_PRESET};
use crate::error::{Error, Result};
use crate::transcribe::Device;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub encode: EncodeConfig,
    pub transcriber: TranscriberConfig,
    pub media: MediaConfig,
    pub system: SystemConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeConfig {
    /// Target height: "source" or a number of lines such as "720", "1080", "1440"
    pub resolution: TargetHeight,
    /// SVT-AV1 preset (0-13, lower = slower and better)
    pub preset: u8,
    /// Constant rate factor (0-63, lower = better quality)
    pub crf: u8,
    /// Opus audio bitrate
    pub audio_bitrate: String,
    /// Video encoder
    pub codec: VideoCodec,
    /// Output container extension for the encoded and final files
    pub container: String,
    /// Value of -svtav1-params
    pub svtav1_params: String,
    /// Extra ffmpeg arguments inserted before the output path
    pub extra_args: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Path or name of the whisper-ctranslate2 binary
    pub binary_path: String,
    /// Whisper model name
    pub model: String,
    /// Spoken language of the source audio
    pub language: String,
    /// "translate" produces English subtitles, "transcribe" keeps the source language
    pub task: String,
    /// Inference device
    pub device: Device,
    /// CTranslate2 compute type
    pub compute_type: String,
    /// Minimum silence the VAD filter splits on
    pub vad_min_silence_ms: u32,
    /// Beam size, left to the tool's default when unset
    pub beam_size: Option<u32>,
    /// Run at below-normal priority
    pub low_priority: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path or name of the ffmpeg binary
    pub ffmpeg_path: String,
    /// Path or name of the ffprobe binary
    pub ffprobe_path: String,
    /// Language tag written on the muxed subtitle track
    pub subtitle_language: String,
    /// Title written on the muxed subtitle track
    pub subtitle_title: String,
    /// Suffix of the muxed output file name
    pub final_suffix: String,
    /// Run the encode at below-normal priority
    pub encode_low_priority: bool,
    /// Run the mux at below-normal priority
    pub mux_low_priority: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    /// Niceness used for low-priority processes on Unix
    pub nice_level: i32,
    /// Delay before a scheduled shutdown
    pub shutdown_delay_secs: u64,
}

impl Default for EncodeConfig {
    fn default() -> Self {
        Self {
            resolution: TargetHeight::Height(1080),
            preset: 6,
            crf: 30,
            audio_bitrate: "128k".to_string(),
            codec: VideoCodec::SvtAv1,
            container: "mkv".to_string(),
            svtav1_params: "tune=0:enable-overlays=1:lookahead=120".to_string(),
            extra_args: vec![],
        }
    }
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            binary_path: "whisper-ctranslate2".to_string(),
            model: "small".to_string(),
            language: "ja".to_string(),
            task: "translate".to_string(),
            device: Device::Accelerated,
            compute_type: "int8".to_string(),
            vad_min_silence_ms: 500,
            beam_size: None,
            low_priority: true,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            subtitle_language: "eng".to_string(),
            subtitle_title: "AI English Translation".to_string(),
            final_suffix: "_final".to_string(),
            encode_low_priority: true,
            mux_low_priority: false,
        }
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            nice_level: 15,
            shutdown_delay_secs: 60,
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.encode.preset > MAX_PRESET {
            return Err(Error::Config(format!(
                "encode.preset must be 0-{}, got {}",
                MAX_PRESET, self.encode.preset
            )));
        }
        if self.encode.crf > MAX_CRF {
            return Err(Error::Config(format!(
                "encode.crf must be 0-{}, got {}",
                MAX_CRF, self.encode.crf
            )));
        }
        if self.encode.container.trim().is_empty() {
            return Err(Error::Config("encode.container must not be empty".to_string()));
        }
        for (key, value) in [
            ("transcriber.binary_path", &self.transcriber.binary_path),
            ("media.ffmpeg_path", &self.media.ffmpeg_path),
            ("media.ffprobe_path", &self.media.ffprobe_path),
        ] {
            if value.trim().is_empty() {
                return Err(Error::Config(format!("{} must not be empty", key)));
            }
        }
        Ok(())
    }
}
