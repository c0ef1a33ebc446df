//! Runs the real ffmpeg and whisper adapters against shell scripts that log
//! their arguments and create the expected outputs.

#![cfg(unix)]

use assert_fs::TempDir;
use assert_fs::prelude::*;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::sync::Arc;

use encode_and_sub::config::Config;
use encode_and_sub::encoding::EncodeSpec;
use encode_and_sub::pipeline::{MediaItem, Pipeline, PipelineMode, PipelineOptions, Status};
use encode_and_sub::platform::UnixPlatform;

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{}", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn fake_tools(bin: &Path, log: &Path) -> Config {
    let ffmpeg = bin.join("ffmpeg");
    let whisper = bin.join("whisper-ctranslate2");

    // Last argument is always the output file
    write_script(
        &ffmpeg,
        &format!(
            "echo \"ffmpeg $*\" >> '{log}'\nfor last; do :; done\nprintf 'media' > \"$last\"\n",
            log = log.display()
        ),
    );
    write_script(
        &whisper,
        &format!(
            concat!(
                "echo \"whisper $*\" >> '{log}'\n",
                "src=\"$1\"\n",
                "out=.\n",
                "while [ $# -gt 0 ]; do\n",
                "  if [ \"$1\" = \"--output_dir\" ]; then out=\"$2\"; fi\n",
                "  shift\n",
                "done\n",
                "name=$(basename \"$src\")\n",
                "printf '1\\n00:00:01,000 --> 00:00:02,000\\nHello\\n' > \"$out/${{name%.*}}.srt\"\n",
            ),
            log = log.display()
        ),
    );

    let mut config = Config::default();
    config.media.ffmpeg_path = ffmpeg.display().to_string();
    config.media.ffprobe_path = bin.join("ffprobe").display().to_string();
    config.transcriber.binary_path = whisper.display().to_string();
    config
}

#[tokio::test]
async fn pipeline_invokes_tools_with_expected_arguments() {
    let temp = TempDir::new().unwrap();
    let bin = temp.child("bin");
    bin.create_dir_all().unwrap();
    let videos = temp.child("videos");
    videos.create_dir_all().unwrap();
    let source = videos.child("movie.mp4");
    source.write_str("source").unwrap();
    let log = temp.child("calls.log");

    let config = fake_tools(bin.path(), log.path());
    let spec = EncodeSpec::from_config(&config.encode).unwrap();
    let platform = Arc::new(UnixPlatform::with_nice_path(15, None));
    let item = MediaItem::new(source.path()).unwrap();

    // Full pipeline
    let options = PipelineOptions::from_config(&config, PipelineMode::Full);
    let pipeline = Pipeline::from_config(&config, options, platform.clone());
    let result = pipeline.run(&item, &spec).await.unwrap();

    assert_eq!(result.status, Status::Success);
    assert_eq!(result.final_path, Some(videos.path().join("movie_final.mkv")));
    assert_eq!(std::fs::read_to_string(videos.path().join("movie_final.mkv")).unwrap(), "media");

    let calls = std::fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = calls.lines().collect();
    assert_eq!(lines.len(), 3);

    assert!(lines[0].starts_with("ffmpeg -hide_banner -y -i "));
    assert!(lines[0].contains("-vf scale=-2:1080:flags=lanczos"));
    assert!(lines[0].contains("-c:v libsvtav1 -preset 6 -crf 30"));
    assert!(lines[0].contains("-c:a libopus -b:a 128k"));
    assert!(lines[0].ends_with("movie_encoded.mkv"));

    assert!(lines[1].starts_with("whisper "));
    assert!(lines[1].contains("movie.mp4 --model small"));
    assert!(lines[1].contains("--task translate --language ja"));
    assert!(lines[1].contains("--output_format srt"));

    assert!(lines[2].contains("movie_encoded.mkv"));
    assert!(lines[2].contains("movie.srt"));
    assert!(lines[2].contains("-map 0 -map 1 -c copy -c:s srt"));
    assert!(lines[2].contains("-metadata:s:s:0 language=eng"));
    assert!(lines[2].ends_with("movie_final.mkv"));

    // Subtitles only: no encode call, the source is muxed directly
    std::fs::remove_file(log.path()).unwrap();
    let options = PipelineOptions::from_config(&config, PipelineMode::SubtitlesOnly);
    let pipeline = Pipeline::from_config(&config, options, platform);
    let result = pipeline.run(&item, &spec).await.unwrap();

    assert_eq!(result.status, Status::Success);
    assert_eq!(result.final_path, Some(videos.path().join("movie_subbed.mkv")));
    let calls = std::fs::read_to_string(log.path()).unwrap();
    let lines: Vec<&str> = calls.lines().collect();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("whisper "));
    assert!(lines[1].contains("movie.mp4"));
    assert!(lines[1].ends_with("movie_subbed.mkv"));
}
