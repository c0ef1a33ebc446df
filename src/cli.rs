use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::encoding::{TargetHeight, VideoCodec};
use crate::transcribe::Device;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Encode anime videos and add machine-translated English subtitles",
    long_about = None,
    args_conflicts_with_subcommands = true
)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Encode, transcribe and mux one file or a batch
#[derive(ClapArgs, Debug, Default)]
pub struct RunArgs {
    /// Input video file or glob pattern (e.g. "*.mp4")
    #[arg(value_name = "INPUT_PATTERN")]
    pub input_pattern: Option<String>,

    /// Encoded output file (single-file mode only)
    #[arg(value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Output height: source, 720, 1080, 1440 or any even number
    #[arg(long)]
    pub resolution: Option<TargetHeight>,

    /// SVT-AV1 preset: 0 = slowest/best quality, 13 = fastest
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=13))]
    pub preset: Option<u8>,

    /// Constant rate factor: 0 = best quality, 63 = smallest
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=63))]
    pub crf: Option<u8>,

    /// Video encoder
    #[arg(long, value_enum)]
    pub codec: Option<VideoCodec>,

    /// Benchmark the preset menu on the first input and choose interactively
    #[arg(long)]
    pub interactive: bool,

    #[command(flatten)]
    pub batch: BatchArgs,
}

/// Options shared by the full pipeline and subtitle-only runs
#[derive(ClapArgs, Debug, Default)]
pub struct BatchArgs {
    /// Process every supported video in this folder
    #[arg(long, value_name = "DIR", conflicts_with = "input_pattern")]
    pub batch_dir: Option<PathBuf>,

    /// Write all outputs to this folder instead of next to each input
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Transcription device
    #[arg(long, value_enum)]
    pub device: Option<Device>,

    /// Shut the machine down when the batch has finished
    #[arg(long)]
    pub shutdown_on_complete: bool,

    /// Write a JSON report of the run
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that ffmpeg, ffprobe and whisper-ctranslate2 are available
    Check,

    /// Benchmark the encode presets on a file without encoding it
    Bench {
        /// Input video file
        input: PathBuf,
    },

    /// Generate subtitles and mux them into the existing video (no re-encode)
    Subs {
        /// Input video file or glob pattern
        #[arg(value_name = "PATTERN")]
        input_pattern: Option<String>,

        /// Output file (single-file mode only)
        #[arg(value_name = "OUTPUT")]
        output: Option<PathBuf>,

        #[command(flatten)]
        batch: BatchArgs,
    },

    /// Write a configuration file with the default settings
    InitConfig {
        /// Destination path
        #[arg(default_value = "config.toml")]
        path: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_single_file_with_overrides() {
        let args = Args::try_parse_from([
            "encode-and-sub",
            "movie.mp4",
            "out.mkv",
            "--resolution",
            "720",
            "--preset",
            "8",
            "--crf",
            "32",
            "--device",
            "cuda",
            "--shutdown-on-complete",
        ])
        .unwrap();

        assert!(args.command.is_none());
        assert_eq!(args.run.input_pattern.as_deref(), Some("movie.mp4"));
        assert_eq!(args.run.output, Some(PathBuf::from("out.mkv")));
        assert_eq!(args.run.resolution, Some(TargetHeight::Height(720)));
        assert_eq!(args.run.preset, Some(8));
        assert_eq!(args.run.crf, Some(32));
        assert_eq!(args.run.batch.device, Some(Device::Accelerated));
        assert!(args.run.batch.shutdown_on_complete);
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        assert!(Args::try_parse_from(["encode-and-sub", "a.mp4", "--preset", "14"]).is_err());
        assert!(Args::try_parse_from(["encode-and-sub", "a.mp4", "--crf", "64"]).is_err());
        assert!(Args::try_parse_from(["encode-and-sub", "a.mp4", "--resolution", "abc"]).is_err());
    }

    #[test]
    fn test_batch_dir_conflicts_with_pattern() {
        assert!(Args::try_parse_from(["encode-and-sub", "a.mp4", "--batch-dir", "videos"]).is_err());

        let args = Args::try_parse_from(["encode-and-sub", "--batch-dir", "videos", "--codec", "hevc-nvenc"]).unwrap();
        assert_eq!(args.run.batch.batch_dir, Some(PathBuf::from("videos")));
        assert_eq!(args.run.codec, Some(VideoCodec::HevcNvenc));
    }

    #[test]
    fn test_subcommands() {
        let args = Args::try_parse_from(["encode-and-sub", "-v", "check"]).unwrap();
        assert!(args.verbose);
        assert!(matches!(args.command, Some(Commands::Check)));

        let args = Args::try_parse_from(["encode-and-sub", "subs", "*.mkv", "--device", "cpu"]).unwrap();
        match args.command {
            Some(Commands::Subs { input_pattern, batch, .. }) => {
                assert_eq!(input_pattern.as_deref(), Some("*.mkv"));
                assert_eq!(batch.device, Some(Device::Cpu));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let args = Args::try_parse_from(["encode-and-sub", "init-config"]).unwrap();
        assert!(matches!(
            args.command,
            Some(Commands::InitConfig { path }) if path == PathBuf::from("config.toml")
        ));
    }
}
