//! Quick encode benchmark over a fixed menu of presets.
//!
//! Each preset encodes a short clip of the input; the measured speed and a
//! CRF-based size factor give rough estimates for the full file. The chosen
//! preset becomes the run's `EncodeSpec`.

use std::io::{BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{EncodeConfig, MediaConfig};
use crate::encoding::{EncodeSpec, TargetHeight};
use crate::error::{Error, Result};
use crate::media::{EncodeOptions, MediaCommandBuilder};
use crate::platform::HostPlatform;
use crate::subtitle::is_usable_output;
use crate::tools::resolve_tool;

/// Length of the benchmark clip in seconds
pub const CLIP_SECONDS: u32 = 8;

/// Output size relative to the source at CRF 30
const BASE_SIZE_FACTOR: f64 = 0.17;
/// Extra size reduction when downscaling to 720p
const SIZE_FACTOR_720P: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BenchmarkPreset {
    pub target_height: TargetHeight,
    pub preset: u8,
    pub crf: u8,
    pub label: &'static str,
}

pub const BENCHMARK_PRESETS: [BenchmarkPreset; 6] = [
    BenchmarkPreset { target_height: TargetHeight::Source, preset: 6, crf: 30, label: "YOUR PREFERRED" },
    BenchmarkPreset { target_height: TargetHeight::Source, preset: 8, crf: 36, label: "Faster Encode" },
    BenchmarkPreset { target_height: TargetHeight::Height(720), preset: 8, crf: 32, label: "Clear/Small" },
    BenchmarkPreset { target_height: TargetHeight::Height(720), preset: 10, crf: 40, label: "Ultra Fast" },
    BenchmarkPreset { target_height: TargetHeight::Height(720), preset: 8, crf: 40, label: "Smallest" },
    BenchmarkPreset { target_height: TargetHeight::Height(720), preset: 6, crf: 40, label: "High Quality Small" },
];

impl BenchmarkPreset {
    /// Spec for this preset, keeping codec and audio settings from `base`
    pub fn to_spec(&self, base: &EncodeSpec) -> Result<EncodeSpec> {
        EncodeSpec::new(
            self.target_height,
            self.preset,
            self.crf,
            base.audio_bitrate.clone(),
            base.video_codec,
        )
    }
}

/// Measurement of one preset
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkResult {
    pub preset: BenchmarkPreset,
    /// `None` when the clip encode failed
    pub estimated_hours: Option<f64>,
    pub estimated_size_gb: f64,
}

/// Hours to encode `duration_secs` of video at the speed measured on the clip.
pub fn estimate_hours(duration_secs: f64, clip_secs: f64, elapsed_secs: f64) -> Option<f64> {
    if elapsed_secs <= 0.0 || clip_secs <= 0.0 {
        return None;
    }
    let speed = clip_secs / elapsed_secs;
    Some(duration_secs / speed / 3600.0)
}

/// Output size estimate: 17% of the source at CRF 30, doubling for every 10
/// CRF above that, and 60% of that again at 720p.
pub fn estimate_size_gb(source_bytes: u64, crf: u8, target_height: TargetHeight) -> f64 {
    let source_gb = source_bytes as f64 / 1024f64.powi(3);
    let mut factor = BASE_SIZE_FACTOR * 2f64.powf((crf as f64 - 30.0) / 10.0);
    if target_height == TargetHeight::Height(720) {
        factor *= SIZE_FACTOR_720P;
    }
    source_gb * factor
}

pub fn parse_duration(output: &str) -> Result<f64> {
    let trimmed = output.trim();
    trimmed
        .lines()
        .next()
        .and_then(|line| line.trim().parse::<f64>().ok())
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| Error::tool_failed("ffprobe", format!("Unexpected duration output '{}'", trimmed)))
}

/// 1-based menu choice to preset
pub fn parse_selection(input: &str) -> Result<&'static BenchmarkPreset> {
    let trimmed = input.trim();
    trimmed
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| BENCHMARK_PRESETS.get(i))
        .ok_or_else(|| {
            Error::InvalidSelection(format!(
                "'{}' (expected 1-{})",
                trimmed,
                BENCHMARK_PRESETS.len()
            ))
        })
}

pub fn render_menu(results: &[BenchmarkResult], duration_secs: f64) -> String {
    let mut lines = vec![format!(
        "\n--- Encode benchmark ({:.1} min video, {} s clips) ---\n",
        duration_secs / 60.0,
        CLIP_SECONDS
    )];

    for (i, result) in results.iter().enumerate() {
        let preset = &result.preset;
        let hours = match result.estimated_hours {
            Some(h) => format!("{:5.1} hrs", h),
            None => "  failed ".to_string(),
        };
        lines.push(format!(
            "{}) {:6} | {:18} (P{}/CRF{}) -> Est: {} | {:5.1} GB",
            i + 1,
            preset.target_height.to_string(),
            preset.label,
            preset.preset,
            preset.crf,
            hours,
            result.estimated_size_gb
        ));
    }
    lines.join("\n")
}

/// Ask for a menu choice on `output`, read it from `input`.
pub fn prompt_selection<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<&'static BenchmarkPreset> {
    write!(output, "\nSelect an option (1-{}): ", BENCHMARK_PRESETS.len())?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    parse_selection(&line)
}

/// Runs the clip encodes with the same ffmpeg settings the pipeline uses.
pub struct Benchmarker {
    command_builder: MediaCommandBuilder,
    options: EncodeOptions,
    platform: Arc<dyn HostPlatform>,
}

impl Benchmarker {
    pub fn new(encode: &EncodeConfig, media: &MediaConfig, platform: Arc<dyn HostPlatform>) -> Self {
        Self {
            command_builder: MediaCommandBuilder::new(
                resolve_tool(&media.ffmpeg_path),
                resolve_tool(&media.ffprobe_path),
            ),
            options: EncodeOptions {
                svtav1_params: encode.svtav1_params.clone(),
                extra_args: encode.extra_args.clone(),
                clip_seconds: Some(CLIP_SECONDS),
            },
            platform,
        }
    }

    pub async fn probe_duration(&self, input: &Path) -> Result<f64> {
        let output = self
            .command_builder
            .probe_duration(input)
            .capture(self.platform.as_ref())
            .await?;
        parse_duration(&output)
    }

    /// Benchmark every menu preset against `input`.
    pub async fn run(&self, input: &Path, base: &EncodeSpec) -> Result<(f64, Vec<BenchmarkResult>)> {
        if !input.is_file() {
            return Err(Error::FileNotFound(input.to_path_buf()));
        }

        let duration = self.probe_duration(input).await?;
        let source_bytes = tokio::fs::metadata(input).await?.len();
        let scratch = tempfile::tempdir()?;

        let mut results = Vec::with_capacity(BENCHMARK_PRESETS.len());
        for (i, preset) in BENCHMARK_PRESETS.iter().enumerate() {
            info!(
                "Benchmark {}/{}: {} (P{}/CRF{})",
                i + 1,
                BENCHMARK_PRESETS.len(),
                preset.label,
                preset.preset,
                preset.crf
            );
            let spec = preset.to_spec(base)?;
            let clip = scratch.path().join(format!("bench_{}.mkv", i + 1));

            let started = Instant::now();
            let status = self
                .command_builder
                .encode(input, clip.as_path(), &spec, &self.options)
                .execute(self.platform.as_ref())
                .await?;
            let elapsed = started.elapsed().as_secs_f64();

            let estimated_hours = if is_usable_output(&clip) {
                estimate_hours(duration, CLIP_SECONDS as f64, elapsed)
            } else {
                warn!("Benchmark clip for '{}' was not produced ({})", preset.label, status);
                None
            };
            debug!("{} took {:.2}s", preset.label, elapsed);

            results.push(BenchmarkResult {
                preset: *preset,
                estimated_hours,
                estimated_size_gb: estimate_size_gb(source_bytes, preset.crf, preset.target_height),
            });
        }

        Ok((duration, results))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::VideoCodec;

    #[test]
    fn test_estimate_hours() {
        // 8 s clip in 16 s: half realtime, so a 1 h video takes 2 h
        let hours = estimate_hours(3600.0, 8.0, 16.0).unwrap();
        assert!((hours - 2.0).abs() < 1e-9);
        assert_eq!(estimate_hours(3600.0, 8.0, 0.0), None);
    }

    #[test]
    fn test_estimate_size() {
        let ten_gb = 10 * 1024u64.pow(3);
        let base = estimate_size_gb(ten_gb, 30, TargetHeight::Source);
        assert!((base - 1.7).abs() < 1e-9);

        let crf40 = estimate_size_gb(ten_gb, 40, TargetHeight::Source);
        assert!((crf40 - 3.4).abs() < 1e-9);

        let small = estimate_size_gb(ten_gb, 30, TargetHeight::Height(720));
        assert!((small - 1.02).abs() < 1e-9);
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("1").unwrap().label, "YOUR PREFERRED");
        assert_eq!(parse_selection(" 6\n").unwrap().label, "High Quality Small");
        assert!(matches!(parse_selection("0"), Err(Error::InvalidSelection(_))));
        assert!(matches!(parse_selection("7"), Err(Error::InvalidSelection(_))));
        assert!(matches!(parse_selection("abc"), Err(Error::InvalidSelection(_))));
        assert!(matches!(parse_selection(""), Err(Error::InvalidSelection(_))));
    }

    #[test]
    fn test_prompt_selection() {
        let mut input = std::io::Cursor::new("3\n");
        let mut output = Vec::new();
        let preset = prompt_selection(&mut input, &mut output).unwrap();

        assert_eq!(preset.target_height, TargetHeight::Height(720));
        assert_eq!((preset.preset, preset.crf), (8, 32));
        assert!(String::from_utf8(output).unwrap().contains("Select an option (1-6)"));
    }

    #[test]
    fn test_preset_keeps_codec() {
        let base = EncodeSpec::new(TargetHeight::Height(1080), 6, 30, "96k", VideoCodec::HevcNvenc).unwrap();
        let spec = BENCHMARK_PRESETS[3].to_spec(&base).unwrap();

        assert_eq!(spec.target_height, TargetHeight::Height(720));
        assert_eq!(spec.preset, 10);
        assert_eq!(spec.crf, 40);
        assert_eq!(spec.audio_bitrate, "96k");
        assert_eq!(spec.video_codec, VideoCodec::HevcNvenc);
    }

    #[test]
    fn test_parse_duration() {
        assert!((parse_duration("1441.534000\n").unwrap() - 1441.534).abs() < 1e-9);
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn test_render_menu() {
        let results = vec![
            BenchmarkResult {
                preset: BENCHMARK_PRESETS[0],
                estimated_hours: Some(1.3),
                estimated_size_gb: 2.5,
            },
            BenchmarkResult {
                preset: BENCHMARK_PRESETS[2],
                estimated_hours: None,
                estimated_size_gb: 1.0,
            },
        ];
        let menu = render_menu(&results, 1440.0);

        assert!(menu.contains("24.0 min video"));
        assert!(menu.contains("1) source | YOUR PREFERRED"));
        assert!(menu.contains("(P6/CRF30) -> Est:   1.3 hrs"));
        assert!(menu.contains("2) 720"));
        assert!(menu.contains("failed"));
    }
}
