//! Host OS capabilities the pipeline depends on: lowering the scheduling
//! priority of long-running tools and scheduling a machine shutdown.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::SystemConfig;
use crate::error::{Error, Result};
use crate::process::ToolCommand;

/// Windows `BELOW_NORMAL_PRIORITY_CLASS` process creation flag.
pub const BELOW_NORMAL_PRIORITY_CLASS: u32 = 0x0000_4000;

pub trait HostPlatform: Send + Sync {
    fn name(&self) -> &'static str;

    /// Build a command for `program`, applying the below-normal priority hint
    /// when requested.
    fn command(&self, program: &Path, args: &[OsString], low_priority: bool) -> Command;

    /// Command that schedules a shutdown after `delay`.
    fn shutdown_command(&self, delay: Duration) -> ToolCommand;

    /// Command the user can run to cancel a scheduled shutdown.
    fn cancel_shutdown_hint(&self) -> &'static str;
}

/// Linux, macOS and other Unix-likes: low priority through `nice`.
pub struct UnixPlatform {
    nice_level: i32,
    nice_path: Option<PathBuf>,
}

impl UnixPlatform {
    pub fn new(nice_level: i32) -> Self {
        Self {
            nice_level,
            nice_path: which::which("nice").ok(),
        }
    }

    pub fn with_nice_path(nice_level: i32, nice_path: Option<PathBuf>) -> Self {
        Self { nice_level, nice_path }
    }
}

impl HostPlatform for UnixPlatform {
    fn name(&self) -> &'static str {
        "unix"
    }

    fn command(&self, program: &Path, args: &[OsString], low_priority: bool) -> Command {
        match (&self.nice_path, low_priority) {
            (Some(nice), true) => {
                let mut cmd = Command::new(nice);
                cmd.arg("-n")
                    .arg(self.nice_level.to_string())
                    .arg(program)
                    .args(args);
                cmd
            }
            (None, true) => {
                debug!("'nice' not found, running {} at normal priority", program.display());
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
            (_, false) => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                cmd
            }
        }
    }

    fn shutdown_command(&self, delay: Duration) -> ToolCommand {
        // shutdown(8) takes whole minutes
        let minutes = delay.as_secs().div_ceil(60);
        let when = if minutes == 0 {
            "now".to_string()
        } else {
            format!("+{}", minutes)
        };
        ToolCommand::new("shutdown", "Scheduled shutdown").args(["-h".to_string(), when])
    }

    fn cancel_shutdown_hint(&self) -> &'static str {
        "shutdown -c"
    }
}

/// Windows: low priority through the process creation flags.
pub struct WindowsPlatform;

impl HostPlatform for WindowsPlatform {
    fn name(&self) -> &'static str {
        "windows"
    }

    #[allow(unused_variables)]
    fn command(&self, program: &Path, args: &[OsString], low_priority: bool) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(args);
        #[cfg(windows)]
        {
            if low_priority {
                cmd.creation_flags(BELOW_NORMAL_PRIORITY_CLASS);
            }
        }
        cmd
    }

    fn shutdown_command(&self, delay: Duration) -> ToolCommand {
        ToolCommand::new("shutdown", "Scheduled shutdown").args([
            "/s".to_string(),
            "/t".to_string(),
            delay.as_secs().to_string(),
        ])
    }

    fn cancel_shutdown_hint(&self) -> &'static str {
        "shutdown /a"
    }
}

/// Platform implementation for the OS this binary was built for.
pub fn host_platform(config: &SystemConfig) -> Box<dyn HostPlatform> {
    if cfg!(windows) {
        Box::new(WindowsPlatform)
    } else {
        Box::new(UnixPlatform::new(config.nice_level))
    }
}

/// Schedule a machine shutdown. The shutdown can still be cancelled with the
/// platform's cancel command during the delay.
pub async fn schedule_shutdown(platform: &dyn HostPlatform, delay: Duration) -> Result<()> {
    let command = platform.shutdown_command(delay);
    let status = command.execute(platform).await?;
    if !status.success {
        return Err(Error::tool_failed("shutdown", status.to_string()));
    }

    info!(
        "System shutting down in {} seconds (run '{}' to cancel)",
        delay.as_secs(),
        platform.cancel_shutdown_hint()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn std_args(cmd: &Command) -> Vec<String> {
        cmd.as_std()
            .get_args()
            .map(|a| a.to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn test_unix_low_priority_wraps_with_nice() {
        let platform = UnixPlatform::with_nice_path(15, Some(PathBuf::from("/usr/bin/nice")));
        let cmd = platform.command(Path::new("ffmpeg"), &[OsString::from("-version")], true);

        assert_eq!(cmd.as_std().get_program(), "/usr/bin/nice");
        assert_eq!(std_args(&cmd), vec!["-n", "15", "ffmpeg", "-version"]);
    }

    #[test]
    fn test_unix_normal_priority_runs_directly() {
        let platform = UnixPlatform::with_nice_path(15, Some(PathBuf::from("/usr/bin/nice")));
        let cmd = platform.command(Path::new("ffmpeg"), &[OsString::from("-version")], false);
        assert_eq!(cmd.as_std().get_program(), "ffmpeg");
        assert_eq!(std_args(&cmd), vec!["-version"]);

        let without_nice = UnixPlatform::with_nice_path(15, None);
        let cmd = without_nice.command(Path::new("ffmpeg"), &[], true);
        assert_eq!(cmd.as_std().get_program(), "ffmpeg");
    }

    #[test]
    fn test_shutdown_commands() {
        let unix = UnixPlatform::with_nice_path(15, None);
        assert_eq!(
            unix.shutdown_command(Duration::from_secs(60)).args_lossy(),
            vec!["-h", "+1"]
        );
        assert_eq!(
            unix.shutdown_command(Duration::from_secs(90)).args_lossy(),
            vec!["-h", "+2"]
        );
        assert_eq!(
            unix.shutdown_command(Duration::ZERO).args_lossy(),
            vec!["-h", "now"]
        );

        let windows = WindowsPlatform;
        assert_eq!(
            windows.shutdown_command(Duration::from_secs(60)).args_lossy(),
            vec!["/s", "/t", "60"]
        );
        assert_eq!(windows.cancel_shutdown_hint(), "shutdown /a");
    }
}
