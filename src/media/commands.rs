use std::path::{Path, PathBuf};

use crate::encoding::{EncodeSpec, VideoCodec};
use crate::process::ToolCommand;

/// Encoder settings that come from configuration rather than the EncodeSpec
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    pub svtav1_params: String,
    pub extra_args: Vec<String>,
    /// Limit the encode to the first N seconds (benchmark clips)
    pub clip_seconds: Option<u32>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            svtav1_params: "tune=0:enable-overlays=1:lookahead=120".to_string(),
            extra_args: Vec::new(),
            clip_seconds: None,
        }
    }
}

/// Tags written on the muxed subtitle stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleTrack {
    pub language: String,
    pub title: String,
}

impl Default for SubtitleTrack {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            title: "AI English Translation".to_string(),
        }
    }
}

/// Builder for the ffmpeg/ffprobe invocations of the pipeline
#[derive(Debug, Clone)]
pub struct MediaCommandBuilder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl MediaCommandBuilder {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(ffmpeg: P, ffprobe: Q) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    /// Build the stage 1 encode command
    pub fn encode<P: AsRef<Path>>(
        &self,
        source: P,
        dest: P,
        spec: &EncodeSpec,
        options: &EncodeOptions,
    ) -> ToolCommand {
        let mut cmd = ToolCommand::new(&self.ffmpeg, "Video encoding")
            .args(["-hide_banner", "-y"])
            .arg("-i")
            .path_arg(source)
            .opt_arg("-t", options.clip_seconds.map(|s| s.to_string()))
            .opt_arg("-vf", spec.target_height.scale_filter());

        cmd = match spec.video_codec {
            VideoCodec::SvtAv1 => cmd
                .args(["-c:v", "libsvtav1"])
                .arg("-preset")
                .arg(spec.preset.to_string())
                .arg("-crf")
                .arg(spec.crf.to_string())
                .arg("-svtav1-params")
                .arg(&options.svtav1_params)
                .arg("-metadata")
                .arg(format!("comment=Converted SVT-AV1 P{} CRF{}", spec.preset, spec.crf)),
            VideoCodec::HevcNvenc => cmd
                .args(["-c:v", "hevc_nvenc"])
                .arg("-preset")
                .arg(spec.nvenc_preset())
                .args(["-rc", "vbr_hq"])
                .arg("-cq")
                .arg(spec.crf.to_string())
                .args(["-b:v", "0"])
                .arg("-metadata")
                .arg(format!(
                    "comment=Converted HEVC NVENC preset {} CQ{}",
                    spec.nvenc_preset(),
                    spec.crf
                )),
        };

        cmd.args(["-c:a", "libopus"])
            .arg("-b:a")
            .arg(&spec.audio_bitrate)
            .args(options.extra_args.iter())
            .path_arg(dest)
    }

    /// Build the stage 3 mux command: keep every stream of the video, add the
    /// subtitle as a tagged SRT track
    pub fn mux<P: AsRef<Path>>(
        &self,
        video: P,
        subtitle: P,
        dest: P,
        track: &SubtitleTrack,
    ) -> ToolCommand {
        ToolCommand::new(&self.ffmpeg, "Subtitle muxing")
            .args(["-hide_banner", "-y"])
            .arg("-i")
            .path_arg(video)
            .arg("-i")
            .path_arg(subtitle)
            .args(["-map", "0", "-map", "1"])
            .args(["-c", "copy", "-c:s", "srt"])
            .arg("-metadata:s:s:0")
            .arg(format!("language={}", track.language))
            .arg("-metadata:s:s:0")
            .arg(format!("title={}", track.title))
            .path_arg(dest)
    }

    /// Build the ffprobe duration query
    pub fn probe_duration<P: AsRef<Path>>(&self, input: P) -> ToolCommand {
        ToolCommand::new(&self.ffprobe, "Duration probe")
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .path_arg(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::TargetHeight;

    fn builder() -> MediaCommandBuilder {
        MediaCommandBuilder::new("ffmpeg", "ffprobe")
    }

    #[test]
    fn test_svtav1_encode_with_scale() {
        let spec = EncodeSpec::new(TargetHeight::Height(1080), 6, 30, "128k", VideoCodec::SvtAv1).unwrap();
        let cmd = builder().encode(
            Path::new("movie.mp4"),
            Path::new("movie_encoded.mkv"),
            &spec,
            &EncodeOptions::default(),
        );

        assert_eq!(
            cmd.args_lossy(),
            vec![
                "-hide_banner", "-y", "-i", "movie.mp4",
                "-vf", "scale=-2:1080:flags=lanczos",
                "-c:v", "libsvtav1", "-preset", "6", "-crf", "30",
                "-svtav1-params", "tune=0:enable-overlays=1:lookahead=120",
                "-metadata", "comment=Converted SVT-AV1 P6 CRF30",
                "-c:a", "libopus", "-b:a", "128k",
                "movie_encoded.mkv",
            ]
        );
    }

    #[test]
    fn test_source_resolution_has_no_filter() {
        let spec = EncodeSpec::new(TargetHeight::Source, 8, 36, "96k", VideoCodec::SvtAv1).unwrap();
        let cmd = builder().encode(
            Path::new("a.mp4"),
            Path::new("b.mkv"),
            &spec,
            &EncodeOptions::default(),
        );
        let args = cmd.args_lossy();
        assert!(!args.iter().any(|a| a == "-vf"));
        assert!(!args.iter().any(|a| a == "null"));
        assert!(args.windows(2).any(|w| w == ["-b:a", "96k"]));
    }

    #[test]
    fn test_nvenc_encode_with_clip() {
        let spec = EncodeSpec::new(TargetHeight::Height(720), 8, 32, "128k", VideoCodec::HevcNvenc).unwrap();
        let options = EncodeOptions {
            clip_seconds: Some(8),
            extra_args: vec!["-pix_fmt".to_string(), "yuv420p10le".to_string()],
            ..EncodeOptions::default()
        };
        let args = builder()
            .encode(Path::new("a.mp4"), Path::new("bench.mkv"), &spec, &options)
            .args_lossy();

        assert!(args.windows(2).any(|w| w == ["-t", "8"]));
        assert!(args.windows(2).any(|w| w == ["-c:v", "hevc_nvenc"]));
        assert!(args.windows(2).any(|w| w == ["-preset", "medium"]));
        assert!(args.windows(2).any(|w| w == ["-cq", "32"]));
        assert!(!args.iter().any(|a| a == "-svtav1-params"));
        assert_eq!(&args[args.len() - 3..], ["-pix_fmt", "yuv420p10le", "bench.mkv"]);
    }

    #[test]
    fn test_mux_command() {
        let cmd = builder().mux(
            Path::new("movie_encoded.mkv"),
            Path::new("movie.srt"),
            Path::new("movie_final.mkv"),
            &SubtitleTrack::default(),
        );

        assert_eq!(
            cmd.args_lossy(),
            vec![
                "-hide_banner", "-y",
                "-i", "movie_encoded.mkv", "-i", "movie.srt",
                "-map", "0", "-map", "1",
                "-c", "copy", "-c:s", "srt",
                "-metadata:s:s:0", "language=eng",
                "-metadata:s:s:0", "title=AI English Translation",
                "movie_final.mkv",
            ]
        );
        assert!(!cmd.low_priority);
    }

    #[test]
    fn test_probe_duration_command() {
        let cmd = builder().probe_duration(Path::new("a.mp4"));
        assert_eq!(cmd.program, PathBuf::from("ffprobe"));
        assert_eq!(cmd.args_lossy().last().map(String::as_str), Some("a.mp4"));
    }
}
