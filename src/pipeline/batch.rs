use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::{OutputPaths, Pipeline, PipelineMode, PipelineOptions, PipelineResult, Status};
use crate::encoding::EncodeSpec;
use crate::error::{Error, Result};
use crate::pipeline::MediaItem;
use crate::platform::{HostPlatform, schedule_shutdown};

/// Counts over a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub partial: usize,
    pub failed: usize,
    /// File names of the failed items, in processing order
    pub failed_items: Vec<String>,
}

impl BatchSummary {
    pub fn from_results(results: &[PipelineResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };

        for result in results {
            match result.status {
                Status::Success => summary.succeeded += 1,
                Status::Partial => summary.partial += 1,
                Status::Failed => {
                    summary.failed += 1;
                    summary.failed_items.push(result.media_item.display_name());
                }
            }
        }
        summary
    }

    /// At least one item left a usable file behind
    pub fn any_usable(&self) -> bool {
        self.succeeded + self.partial > 0
    }

    /// Every item reached at least Partial
    pub fn all_usable(&self) -> bool {
        self.failed == 0
    }
}

/// Results of a batch, in input order.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub results: Vec<PipelineResult>,
    pub summary: BatchSummary,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

/// Runs the pipeline over many items, one at a time. A failing item never
/// stops the batch.
pub struct BatchDriver<'a> {
    pipeline: &'a Pipeline,
    show_progress: bool,
}

impl<'a> BatchDriver<'a> {
    pub fn new(pipeline: &'a Pipeline) -> Self {
        Self {
            pipeline,
            show_progress: std::io::stderr().is_terminal(),
        }
    }

    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        if !self.show_progress || total < 2 {
            pb.set_draw_target(ProgressDrawTarget::hidden());
            return pb;
        }

        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        pb.set_style(style);
        pb.enable_steady_tick(Duration::from_millis(200));
        pb
    }

    pub async fn run(&self, items: &[MediaItem], spec: &EncodeSpec) -> BatchOutcome {
        let started_at = Local::now();
        let total = items.len();
        let pb = self.progress_bar(total);
        let mut results = Vec::with_capacity(total);

        if total > 1 {
            info!("Batch mode: {} files", total);
        }

        for (index, item) in items.iter().enumerate() {
            info!("[{}/{}] Processing: {}", index + 1, total, item.display_name());
            pb.set_message(item.display_name());

            let started = Instant::now();
            let result = match self.pipeline.run(item, spec).await {
                Ok(result) => result,
                Err(e) => {
                    error!("Failed to process {}: {}", item.display_name(), e);
                    let encoded = self
                        .pipeline
                        .output_paths(item)
                        .map(|paths| paths.encoded)
                        .unwrap_or_else(|_| item.source_path.clone());
                    PipelineResult::failed(
                        item.clone(),
                        encoded,
                        e.to_string(),
                        started.elapsed().as_secs_f64(),
                    )
                }
            };

            match result.status {
                Status::Success => info!(
                    "[{}/{}] {}: {}",
                    index + 1,
                    total,
                    result.status,
                    item.display_name()
                ),
                _ => warn!(
                    "[{}/{}] {}: {} ({})",
                    index + 1,
                    total,
                    result.status,
                    item.display_name(),
                    result.error.as_deref().unwrap_or("unknown error")
                ),
            }

            results.push(result);
            pb.inc(1);
        }

        pb.finish_and_clear();

        let summary = BatchSummary::from_results(&results);
        BatchOutcome {
            results,
            summary,
            started_at,
            finished_at: Local::now(),
        }
    }
}

/// Suffixes this tool appends to the stem of the files it writes.
const GENERATED_SUFFIXES: [&str; 3] = ["_encoded", "_final", "_subbed"];

/// Drop inputs that were written by a previous run over the same set, such as
/// `movie_encoded.mkv`, `movie.srt` and `movie_final.mkv` next to `movie.mp4`.
/// Order is kept.
pub fn exclude_generated_outputs(items: Vec<MediaItem>, options: &PipelineOptions) -> Vec<MediaItem> {
    let derived: Vec<Option<OutputPaths>> = items
        .iter()
        .map(|item| OutputPaths::derive(item, options).ok())
        .collect();
    let stems: Vec<Option<String>> = items.iter().map(|item| item.stem().ok()).collect();

    let generated_by = |index: usize| -> Option<usize> {
        let item = &items[index];
        let stem = stems[index].as_deref()?;
        (0..items.len()).filter(|&other| other != index).find(|&other| {
            let written = derived[other].as_ref().is_some_and(|paths| {
                (options.mode == PipelineMode::Full && paths.encoded == item.source_path)
                    || paths.subtitle == item.source_path
                    || paths.final_output == item.source_path
            });
            let suffixed = items[other].working_directory == item.working_directory
                && stems[other].as_deref().is_some_and(|base| {
                    GENERATED_SUFFIXES
                        .iter()
                        .copied()
                        .chain(std::iter::once(options.final_suffix.as_str()))
                        .filter(|suffix| !suffix.is_empty())
                        .any(|suffix| stem == format!("{}{}", base, suffix))
                });
            written || suffixed
        })
    };

    let skipped: Vec<Option<usize>> = (0..items.len()).map(generated_by).collect();
    let names: Vec<String> = items.iter().map(MediaItem::display_name).collect();

    items
        .into_iter()
        .zip(skipped)
        .filter_map(|(item, source)| match source {
            Some(source) => {
                info!(
                    "Skipping {}: output of {} from an earlier run",
                    item.display_name(),
                    names[source]
                );
                None
            }
            None => Some(item),
        })
        .collect()
}

/// Derive the outputs of every item before anything runs. Fails with a usage
/// error if an output would overwrite an input or two items would write the
/// same file (`ep1.mkv` and `ep1.mp4` share `ep1_encoded.mkv`).
pub fn plan_outputs(items: &[MediaItem], options: &PipelineOptions) -> Result<Vec<OutputPaths>> {
    let planned = items
        .iter()
        .map(|item| OutputPaths::derive(item, options))
        .collect::<Result<Vec<_>>>()?;

    let mut owners: HashMap<PathBuf, usize> = HashMap::new();
    for (index, paths) in planned.iter().enumerate() {
        let mut outputs = vec![&paths.subtitle, &paths.final_output];
        if options.mode == PipelineMode::Full {
            outputs.push(&paths.encoded);
        }
        for output in outputs {
            if let Some(&owner) = owners.get(output) {
                return Err(Error::Usage(format!(
                    "{} and {} would both write {}",
                    items[owner].display_name(),
                    items[index].display_name(),
                    output.display()
                )));
            }
            owners.insert(output.clone(), index);
        }
    }

    for (index, item) in items.iter().enumerate() {
        if let Some(&owner) = owners.get(&item.source_path) {
            if owner != index {
                return Err(Error::Usage(format!(
                    "{} would overwrite the input {}",
                    items[owner].display_name(),
                    item.source_path.display()
                )));
            }
        }
    }

    Ok(planned)
}

/// A shutdown is only worth scheduling if the batch produced something.
pub fn shutdown_allowed(requested: bool, summary: &BatchSummary) -> bool {
    requested && summary.any_usable()
}

/// Schedule the post-batch shutdown if requested. Never fails the run.
pub async fn shutdown_after_batch(
    platform: &dyn HostPlatform,
    requested: bool,
    summary: &BatchSummary,
    delay: Duration,
) -> bool {
    if !requested {
        return false;
    }
    if !shutdown_allowed(requested, summary) {
        warn!("No file was processed successfully, skipping shutdown");
        return false;
    }

    match schedule_shutdown(platform, delay).await {
        Ok(()) => true,
        Err(e) => {
            error!("Could not schedule shutdown: {}", e);
            false
        }
    }
}
