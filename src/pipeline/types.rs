use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::transcribe::Device;

/// One input video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaItem {
    pub source_path: PathBuf,
    pub working_directory: PathBuf,
    /// Explicit output path, only used in single-file mode
    pub output_override: Option<PathBuf>,
}

impl MediaItem {
    pub fn new(source: impl Into<PathBuf>) -> Result<Self> {
        let source_path = std::path::absolute(source.into())?;
        let working_directory = source_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| {
                Error::Usage(format!("Cannot determine directory of {}", source_path.display()))
            })?;

        Ok(Self {
            source_path,
            working_directory,
            output_override: None,
        })
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Result<Self> {
        self.output_override = Some(std::path::absolute(output.into())?);
        Ok(self)
    }

    /// File name without extension
    pub fn stem(&self) -> Result<String> {
        file_stem(&self.source_path)
    }

    pub fn display_name(&self) -> String {
        self.source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.source_path.display().to_string())
    }
}

pub(crate) fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::Usage(format!("Invalid video filename: {}", path.display())))
}

/// Furthest stage whose output is known to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Encoded,
    Transcribed,
    Muxed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// All stages produced their output
    Success,
    /// The encoded file is usable but subtitles were not muxed
    Partial,
    /// Nothing usable was produced
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Success => write!(f, "SUCCESS"),
            Status::Partial => write!(f, "PARTIAL"),
            Status::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of one item. Never mutated after the pipeline returns it.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub media_item: MediaItem,
    pub encoded_path: PathBuf,
    pub subtitle_path: Option<PathBuf>,
    pub final_path: Option<PathBuf>,
    pub stage_reached: Option<Stage>,
    pub status: Status,
    pub error: Option<String>,
    pub elapsed_secs: f64,
}

impl PipelineResult {
    pub fn success(
        media_item: MediaItem,
        encoded_path: PathBuf,
        subtitle_path: PathBuf,
        final_path: PathBuf,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            media_item,
            encoded_path,
            subtitle_path: Some(subtitle_path),
            final_path: Some(final_path),
            stage_reached: Some(Stage::Muxed),
            status: Status::Success,
            error: None,
            elapsed_secs,
        }
    }

    pub fn partial(
        media_item: MediaItem,
        encoded_path: PathBuf,
        subtitle_path: Option<PathBuf>,
        error: impl Into<String>,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            media_item,
            encoded_path,
            subtitle_path,
            final_path: None,
            stage_reached: Some(Stage::Encoded),
            status: Status::Partial,
            error: Some(error.into()),
            elapsed_secs,
        }
    }

    pub fn failed(
        media_item: MediaItem,
        encoded_path: PathBuf,
        error: impl Into<String>,
        elapsed_secs: f64,
    ) -> Self {
        Self {
            media_item,
            encoded_path,
            subtitle_path: None,
            final_path: None,
            stage_reached: None,
            status: Status::Failed,
            error: Some(error.into()),
            elapsed_secs,
        }
    }

    /// The most complete file this run produced.
    pub fn best_output(&self) -> Option<&Path> {
        match self.status {
            Status::Success => self.final_path.as_deref(),
            Status::Partial => Some(self.encoded_path.as_path()),
            Status::Failed => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineMode {
    /// Encode, transcribe, mux
    Full,
    /// Transcribe and mux into the source as-is
    SubtitlesOnly,
}

/// Per-run settings of the orchestrator
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub mode: PipelineMode,
    pub device: Device,
    /// Destination directory; defaults to each item's own directory
    pub output_dir: Option<PathBuf>,
    pub container: String,
    pub final_suffix: String,
    pub language: String,
    pub task: String,
}

impl PipelineOptions {
    pub fn from_config(config: &Config, mode: PipelineMode) -> Self {
        let final_suffix = match mode {
            PipelineMode::Full => config.media.final_suffix.clone(),
            PipelineMode::SubtitlesOnly => "_subbed".to_string(),
        };

        Self {
            mode,
            device: config.transcriber.device,
            output_dir: None,
            container: config.encode.container.clone(),
            final_suffix,
            language: config.transcriber.language.clone(),
            task: config.transcriber.task.clone(),
        }
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from_config(&Config::default(), PipelineMode::Full)
    }
}

/// Every path one item's run reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub dir: PathBuf,
    pub encoded: PathBuf,
    /// Where the transcriber is expected to write
    pub subtitle: PathBuf,
    pub final_output: PathBuf,
}

impl OutputPaths {
    pub fn derive(item: &MediaItem, options: &PipelineOptions) -> Result<Self> {
        let stem = item.stem()?;
        let container = options.container.trim_start_matches('.');
        let default_dir = || {
            options
                .output_dir
                .clone()
                .unwrap_or_else(|| item.working_directory.clone())
        };

        let paths = match (options.mode, &item.output_override) {
            (PipelineMode::Full, Some(output)) => {
                let dir = output
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(default_dir);
                let output_stem = file_stem(output)?;
                let extension = output
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_else(|| container.to_string());
                Self {
                    subtitle: dir.join(format!("{}.srt", stem)),
                    final_output: dir.join(format!(
                        "{}{}.{}",
                        output_stem, options.final_suffix, extension
                    )),
                    encoded: output.clone(),
                    dir,
                }
            }
            (PipelineMode::Full, None) => {
                let dir = default_dir();
                Self {
                    encoded: dir.join(format!("{}_encoded.{}", stem, container)),
                    subtitle: dir.join(format!("{}.srt", stem)),
                    final_output: dir.join(format!(
                        "{}{}.{}",
                        stem, options.final_suffix, container
                    )),
                    dir,
                }
            }
            (PipelineMode::SubtitlesOnly, output) => {
                let final_output = match output {
                    Some(output) => output.with_extension(container),
                    None => default_dir().join(format!(
                        "{}{}.{}",
                        stem, options.final_suffix, container
                    )),
                };
                let dir = final_output
                    .parent()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(default_dir);
                Self {
                    encoded: item.source_path.clone(),
                    subtitle: dir.join(format!("{}.srt", stem)),
                    final_output,
                    dir,
                }
            }
        };

        paths.check(item, options.mode)?;
        Ok(paths)
    }

    fn check(&self, item: &MediaItem, mode: PipelineMode) -> Result<()> {
        if mode == PipelineMode::Full && self.encoded == item.source_path {
            return Err(Error::Usage(format!(
                "Encoded output would overwrite the source: {}",
                self.encoded.display()
            )));
        }
        if self.final_output == item.source_path || self.final_output == self.encoded {
            return Err(Error::Usage(format!(
                "Final output would overwrite an input: {}",
                self.final_output.display()
            )));
        }
        Ok(())
    }
}
