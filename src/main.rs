//! encode-and-sub - anime encode and subtitle pipeline
//!
//! Entry point: parses the command line, resolves configuration and the
//! encode settings, then runs the pipeline over one file or a batch.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use encode_and_sub::benchmark::{self, Benchmarker};
use encode_and_sub::cli::{Args, BatchArgs, Commands, RunArgs};
use encode_and_sub::config::Config;
use encode_and_sub::discovery::{expand_pattern, media_items, scan_directory};
use encode_and_sub::encoding::EncodeSpec;
use encode_and_sub::error::Error;
use encode_and_sub::pipeline::{
    exclude_generated_outputs, plan_outputs, shutdown_after_batch, BatchDriver, Pipeline,
    PipelineMode, PipelineOptions,
};
use encode_and_sub::platform::{host_platform, HostPlatform};
use encode_and_sub::report::{print_summary, BatchReport};
use encode_and_sub::tools::{check_dependencies, ffmpeg_has_encoder, resolve_tool};

const EXIT_USAGE: u8 = 1;
const EXIT_FAILED: u8 = 2;

const LOG_DIR: &str = ".encode-and-sub";
const LOG_FILE: &str = "encode-and-sub.log";

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            // --help and --version are not errors
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    // Setup logging to both console and file
    let _guard = match setup_logging(args.verbose) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::from(EXIT_FAILED);
        }
    };

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            match e.downcast_ref::<Error>() {
                Some(err) if err.is_usage() => ExitCode::from(EXIT_USAGE),
                _ => ExitCode::from(EXIT_FAILED),
            }
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    if let Some(Commands::InitConfig { path }) = &args.command {
        init_config(path)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = load_config(args.config.as_deref())?;

    match args.command {
        Some(Commands::Check) => Ok(check(&config)),
        Some(Commands::Bench { input }) => {
            let platform: Arc<dyn HostPlatform> = Arc::from(host_platform(&config.system));
            let base = EncodeSpec::from_config(&config.encode)?;
            let benchmarker = Benchmarker::new(&config.encode, &config.media, platform);
            let (duration, results) = benchmarker.run(&input, &base).await?;
            println!("{}", benchmark::render_menu(&results, duration));
            Ok(ExitCode::SUCCESS)
        }
        Some(Commands::Subs {
            input_pattern,
            output,
            batch,
        }) => {
            run_pipeline(
                &config,
                PipelineMode::SubtitlesOnly,
                input_pattern.as_deref(),
                output,
                &batch,
                false,
            )
            .await
        }
        Some(Commands::InitConfig { .. }) => Ok(ExitCode::SUCCESS),
        None => {
            apply_encode_overrides(&mut config, &args.run);
            run_pipeline(
                &config,
                PipelineMode::Full,
                args.run.input_pattern.as_deref(),
                args.run.output.clone(),
                &args.run.batch,
                args.run.interactive,
            )
            .await
        }
    }
}

/// `--config`, else `config.toml` in the working directory, else defaults.
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(config_path) => {
            if !config_path.is_file() {
                return Err(Error::FileNotFound(config_path.to_path_buf()).into());
            }
            info!("Loading configuration from {}", config_path.display());
            Ok(Config::from_file(config_path)?)
        }
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Ok(Config::from_file("config.toml")?)
            } else {
                Ok(Config::default())
            }
        }
    }
}

fn apply_encode_overrides(config: &mut Config, run: &RunArgs) {
    if let Some(resolution) = run.resolution {
        config.encode.resolution = resolution;
    }
    if let Some(preset) = run.preset {
        config.encode.preset = preset;
    }
    if let Some(crf) = run.crf {
        config.encode.crf = crf;
    }
    if let Some(codec) = run.codec {
        config.encode.codec = codec;
    }
}

fn resolve_inputs(pattern: Option<&str>, batch_dir: Option<&Path>) -> Result<Vec<PathBuf>> {
    let files = match (pattern, batch_dir) {
        (Some(_), Some(_)) => {
            return Err(Error::Usage("Give either an input pattern or --batch-dir, not both".to_string()).into());
        }
        (Some(pattern), None) => expand_pattern(pattern)?,
        (None, Some(dir)) => scan_directory(dir)?,
        (None, None) => {
            return Err(Error::Usage(
                "No input given: pass a video file, a glob pattern or --batch-dir".to_string(),
            )
            .into());
        }
    };
    Ok(files)
}

async fn run_pipeline(
    config: &Config,
    mode: PipelineMode,
    pattern: Option<&str>,
    output: Option<PathBuf>,
    batch: &BatchArgs,
    interactive: bool,
) -> Result<ExitCode> {
    let mut spec = EncodeSpec::from_config(&config.encode)?;
    let files = resolve_inputs(pattern, batch.batch_dir.as_deref())?;
    let mut items = media_items(files)?;
    let batch_mode = items.len() > 1 || batch.batch_dir.is_some();

    if let Some(output) = output {
        if batch_mode {
            warn!("Output path {} is ignored in batch mode", output.display());
        } else if let Some(item) = items.pop() {
            items.push(item.with_output(output)?);
        }
    }

    let mut options = PipelineOptions::from_config(config, mode).with_output_dir(batch.output_dir.clone());
    if let Some(device) = batch.device {
        options = options.with_device(device);
    }

    // Reject colliding outputs before the benchmark spends minutes encoding
    let items = exclude_generated_outputs(items, &options);
    plan_outputs(&items, &options)?;

    let platform: Arc<dyn HostPlatform> = Arc::from(host_platform(&config.system));
    info!("Host platform: {}", platform.name());

    if interactive && mode == PipelineMode::Full {
        if let Some(first) = items.first() {
            spec = choose_interactively(config, platform.clone(), &first.source_path, &spec).await?;
        }
    }

    match mode {
        PipelineMode::Full => info!("Encode settings: {}", spec.describe()),
        PipelineMode::SubtitlesOnly => info!("Subtitle-only run, videos are not re-encoded"),
    }
    info!(
        "Transcription: {} -> {} on {}",
        options.language,
        options.task,
        options.device.as_tool_arg()
    );

    let pipeline = Pipeline::from_config(config, options, platform.clone());
    let outcome = BatchDriver::new(&pipeline).run(&items, &spec).await;

    print_summary(&outcome);

    if let Some(report_path) = &batch.report {
        if let Err(e) = BatchReport::new(&outcome, &spec).write_to(report_path).await {
            error!("Failed to write report {}: {}", report_path.display(), e);
        }
    }

    shutdown_after_batch(
        platform.as_ref(),
        batch.shutdown_on_complete,
        &outcome.summary,
        Duration::from_secs(config.system.shutdown_delay_secs),
    )
    .await;

    if outcome.summary.all_usable() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_FAILED))
    }
}

/// Benchmark the preset menu on `input` and let the user pick one.
async fn choose_interactively(
    config: &Config,
    platform: Arc<dyn HostPlatform>,
    input: &Path,
    base: &EncodeSpec,
) -> Result<EncodeSpec> {
    info!("Benchmarking encode presets on {}", input.display());
    let benchmarker = Benchmarker::new(&config.encode, &config.media, platform);
    let (duration, results) = benchmarker.run(input, base).await?;
    println!("{}", benchmark::render_menu(&results, duration));

    let preset = tokio::task::spawn_blocking(|| {
        benchmark::prompt_selection(&mut std::io::stdin().lock(), &mut std::io::stdout())
    })
    .await??;

    let spec = preset.to_spec(base)?;
    info!("Selected '{}': {}", preset.label, spec.describe());
    Ok(spec)
}

fn check(config: &Config) -> ExitCode {
    let tools = check_dependencies(config);

    println!("\nExternal tools:");
    println!("{:<22} {:<10} {}", "Tool", "Status", "Version / Path");
    println!("{}", "-".repeat(90));
    for tool in &tools {
        let status = if tool.available { "found" } else { "MISSING" };
        let detail = tool
            .version
            .clone()
            .unwrap_or_else(|| tool.path.display().to_string());
        println!("{:<22} {:<10} {}", tool.name, status, detail);
    }

    let ffmpeg = resolve_tool(&config.media.ffmpeg_path);
    println!("\nffmpeg encoders:");
    for encoder in ["libsvtav1", "hevc_nvenc", "libopus"] {
        let available = ffmpeg_has_encoder(&ffmpeg, encoder);
        println!("  {:<12} {}", encoder, if available { "yes" } else { "no" });
    }

    // Without nice the tools still run, only at normal priority
    let required_found = tools
        .iter()
        .filter(|tool| tool.name != "nice")
        .all(|tool| tool.available);
    if required_found {
        println!("\nAll required tools are available.");
        ExitCode::SUCCESS
    } else {
        println!("\nSome required tools are missing.");
        ExitCode::from(EXIT_FAILED)
    }
}

fn init_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(Error::Usage(format!("{} already exists", path.display())).into());
    }
    Config::default().save_to_file(path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(LOG_DIR).join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard flushes the file writer on drop
    let file_appender = rolling::daily(&log_dir, LOG_FILE);
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer().with_target(false);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join(LOG_FILE).display()
    );

    Ok(guard)
}
