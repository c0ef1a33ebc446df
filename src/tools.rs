//! External tool resolution and the dependency check.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

use crate::config::Config;

/// Information about an external tool.
#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// First line of the tool's version output
    pub version: Option<String>,
    pub path: PathBuf,
}

/// Resolve a configured tool name to an executable path.
///
/// Explicit paths are used as given. Bare names prefer a bundled binary next
/// to the running executable, then `PATH`. If neither exists the bare name is
/// returned and the spawn failure is reported when the tool is first run.
pub fn resolve_tool(configured: &str) -> PathBuf {
    let candidate = Path::new(configured);
    if candidate.components().count() > 1 || candidate.is_absolute() {
        return candidate.to_path_buf();
    }

    if let Some(bundled) = bundled_tool(configured) {
        debug!("Using bundled {} at {}", configured, bundled.display());
        return bundled;
    }

    which::which(configured).unwrap_or_else(|_| candidate.to_path_buf())
}

fn bundled_tool(name: &str) -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let dir = exe.parent()?;
    let file_name = if name.ends_with(std::env::consts::EXE_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, std::env::consts::EXE_SUFFIX)
    };
    let path = dir.join(file_name);
    path.is_file().then_some(path)
}

/// Run `path version_arg` and report whether the tool answered.
pub fn check_tool_with_arg(name: &str, path: &Path, version_arg: &str) -> ToolInfo {
    let result = Command::new(path)
        .arg(version_arg)
        .stdin(Stdio::null())
        .output();

    match result {
        Ok(output) if output.status.success() => {
            // Some tools print their version on stderr
            let text = if output.stdout.is_empty() {
                String::from_utf8_lossy(&output.stderr).to_string()
            } else {
                String::from_utf8_lossy(&output.stdout).to_string()
            };
            ToolInfo {
                name: name.to_string(),
                available: true,
                version: first_line(&text),
                path: path.to_path_buf(),
            }
        }
        _ => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: path.to_path_buf(),
        },
    }
}

/// Whether `ffmpeg -encoders` lists the named encoder.
pub fn ffmpeg_has_encoder(ffmpeg: &Path, encoder: &str) -> bool {
    Command::new(ffmpeg)
        .args(["-hide_banner", "-encoders"])
        .stdin(Stdio::null())
        .output()
        .map(|output| encoder_listed(&String::from_utf8_lossy(&output.stdout), encoder))
        .unwrap_or(false)
}

fn encoder_listed(listing: &str, encoder: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(encoder))
}

fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map(str::to_string)
}

/// Availability by PATH lookup alone, for tools without a portable version
/// flag (BSD `nice` rejects `--version`).
pub fn check_tool_on_path(name: &str) -> ToolInfo {
    match which::which(name) {
        Ok(path) => ToolInfo {
            name: name.to_string(),
            available: true,
            version: None,
            path,
        },
        Err(_) => ToolInfo {
            name: name.to_string(),
            available: false,
            version: None,
            path: PathBuf::from(name),
        },
    }
}

/// Check every tool the pipeline invokes.
pub fn check_dependencies(config: &Config) -> Vec<ToolInfo> {
    let mut tools = vec![
        check_tool_with_arg("ffmpeg", &resolve_tool(&config.media.ffmpeg_path), "-version"),
        check_tool_with_arg("ffprobe", &resolve_tool(&config.media.ffprobe_path), "-version"),
        check_tool_with_arg(
            "whisper-ctranslate2",
            &resolve_tool(&config.transcriber.binary_path),
            "--version",
        ),
    ];

    if !cfg!(windows) {
        tools.push(check_tool_on_path("nice"));
    }

    tools
}
