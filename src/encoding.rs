use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::EncodeConfig;
use crate::error::{Error, Result};

pub const MAX_PRESET: u8 = 13;
pub const MAX_CRF: u8 = 63;

/// Output height of the encode. `Source` keeps the original frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TargetHeight {
    Source,
    Height(u32),
}

impl TargetHeight {
    /// ffmpeg scale filter for this height, or `None` when the source size is kept.
    pub fn scale_filter(&self) -> Option<String> {
        match self {
            TargetHeight::Source => None,
            TargetHeight::Height(h) => Some(format!("scale=-2:{}:flags=lanczos", h)),
        }
    }
}

impl fmt::Display for TargetHeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetHeight::Source => write!(f, "source"),
            TargetHeight::Height(h) => write!(f, "{}", h),
        }
    }
}

impl FromStr for TargetHeight {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim().trim_end_matches('p');
        if trimmed.eq_ignore_ascii_case("source") || trimmed.eq_ignore_ascii_case("original") {
            return Ok(TargetHeight::Source);
        }
        match trimmed.parse::<u32>() {
            Ok(h) if h > 0 && h % 2 == 0 => Ok(TargetHeight::Height(h)),
            _ => Err(Error::Usage(format!(
                "Invalid resolution '{}'. Use 'source' or an even height such as 720, 1080, 1440",
                s
            ))),
        }
    }
}

impl TryFrom<String> for TargetHeight {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<TargetHeight> for String {
    fn from(value: TargetHeight) -> Self {
        value.to_string()
    }
}

/// Video encoder used for stage 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum VideoCodec {
    /// CPU encode with libsvtav1
    SvtAv1,
    /// NVIDIA GPU encode with hevc_nvenc
    HevcNvenc,
}

impl VideoCodec {
    pub fn display_name(&self) -> &'static str {
        match self {
            VideoCodec::SvtAv1 => "SVT-AV1",
            VideoCodec::HevcNvenc => "HEVC NVENC",
        }
    }
}

/// Everything that determines one encode invocation. Shared read-only by all
/// items of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeSpec {
    pub target_height: TargetHeight,
    pub preset: u8,
    pub crf: u8,
    pub audio_bitrate: String,
    pub video_codec: VideoCodec,
}

impl EncodeSpec {
    pub fn new(
        target_height: TargetHeight,
        preset: u8,
        crf: u8,
        audio_bitrate: impl Into<String>,
        video_codec: VideoCodec,
    ) -> Result<Self> {
        let spec = Self {
            target_height,
            preset,
            crf,
            audio_bitrate: audio_bitrate.into(),
            video_codec,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn from_config(config: &EncodeConfig) -> Result<Self> {
        Self::new(
            config.resolution,
            config.preset,
            config.crf,
            config.audio_bitrate.clone(),
            config.codec,
        )
    }

    pub fn validate(&self) -> Result<()> {
        if self.preset > MAX_PRESET {
            return Err(Error::Usage(format!(
                "Preset {} is out of range (0-{})",
                self.preset, MAX_PRESET
            )));
        }
        if self.crf > MAX_CRF {
            return Err(Error::Usage(format!(
                "CRF {} is out of range (0-{})",
                self.crf, MAX_CRF
            )));
        }
        if self.audio_bitrate.trim().is_empty() {
            return Err(Error::Usage("Audio bitrate must not be empty".to_string()));
        }
        Ok(())
    }

    /// NVENC has no numeric presets; map the SVT-AV1 scale onto its named ones.
    pub fn nvenc_preset(&self) -> &'static str {
        match self.preset {
            6 => "slow",
            8 => "medium",
            10 => "fast",
            _ => "medium",
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "{} | {} preset {} | CRF {} | audio {}",
            match self.target_height {
                TargetHeight::Source => "source resolution".to_string(),
                TargetHeight::Height(h) => format!("{}p", h),
            },
            self.video_codec.display_name(),
            self.preset,
            self.crf,
            self.audio_bitrate
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_height() {
        assert_eq!("source".parse::<TargetHeight>().unwrap(), TargetHeight::Source);
        assert_eq!("1080".parse::<TargetHeight>().unwrap(), TargetHeight::Height(1080));
        assert_eq!("720p".parse::<TargetHeight>().unwrap(), TargetHeight::Height(720));
        assert!("abc".parse::<TargetHeight>().is_err());
        assert!("0".parse::<TargetHeight>().is_err());
        assert!("721".parse::<TargetHeight>().is_err());
    }

    #[test]
    fn test_scale_filter() {
        assert_eq!(TargetHeight::Source.scale_filter(), None);
        assert_eq!(
            TargetHeight::Height(1080).scale_filter().as_deref(),
            Some("scale=-2:1080:flags=lanczos")
        );
    }

    #[test]
    fn test_encode_spec_range_checks() {
        assert!(EncodeSpec::new(TargetHeight::Source, 13, 63, "128k", VideoCodec::SvtAv1).is_ok());
        assert!(EncodeSpec::new(TargetHeight::Source, 14, 30, "128k", VideoCodec::SvtAv1).is_err());
        assert!(EncodeSpec::new(TargetHeight::Source, 6, 64, "128k", VideoCodec::SvtAv1).is_err());
        assert!(EncodeSpec::new(TargetHeight::Source, 6, 30, " ", VideoCodec::SvtAv1).is_err());
    }

    #[test]
    fn test_nvenc_preset_mapping() {
        let mut spec = EncodeSpec::new(TargetHeight::Source, 6, 30, "128k", VideoCodec::HevcNvenc).unwrap();
        assert_eq!(spec.nvenc_preset(), "slow");
        spec.preset = 10;
        assert_eq!(spec.nvenc_preset(), "fast");
        spec.preset = 3;
        assert_eq!(spec.nvenc_preset(), "medium");
    }
}
