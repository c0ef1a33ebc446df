use serde::Serialize;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tracing::debug;

use crate::error::{Error, Result};
use crate::platform::HostPlatform;

/// Exit status of an external tool, reduced to what the pipeline inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub success: bool,
    /// `None` when the process was terminated by a signal
    pub code: Option<i32>,
}

impl ToolStatus {
    pub fn ok() -> Self {
        Self { success: true, code: Some(0) }
    }

    pub fn exited(code: i32) -> Self {
        Self { success: code == 0, code: Some(code) }
    }

    pub fn killed() -> Self {
        Self { success: false, code: None }
    }
}

impl From<ExitStatus> for ToolStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

impl fmt::Display for ToolStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "terminated by signal"),
        }
    }
}

/// A fully built external tool invocation.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    pub description: String,
    pub low_priority: bool,
}

impl ToolCommand {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(program: P, description: S) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            description: description.into(),
            low_priority: false,
        }
    }

    pub fn arg<S: Into<OsString>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a path argument without lossy conversion
    pub fn path_arg<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().as_os_str().to_os_string())
    }

    /// Add `flag value` if the value is present
    pub fn opt_arg<S: Into<OsString>>(self, flag: &str, value: Option<S>) -> Self {
        match value {
            Some(value) => self.arg(flag).arg(value),
            None => self,
        }
    }

    pub fn low_priority(mut self, enabled: bool) -> Self {
        self.low_priority = enabled;
        self
    }

    pub fn tool_name(&self) -> String {
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    pub fn args_lossy(&self) -> Vec<String> {
        self.args.iter().map(|a| a.to_string_lossy().to_string()).collect()
    }

    /// Run the command to completion. Output streams are inherited so the
    /// tool's own progress stays visible; stdin is closed.
    pub async fn execute(&self, platform: &dyn HostPlatform) -> Result<ToolStatus> {
        debug!(
            "Executing {}: {} {:?} (low priority: {})",
            self.description,
            self.program.display(),
            self.args_lossy(),
            self.low_priority
        );

        let mut cmd = platform.command(&self.program, &self.args, self.low_priority);
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let status = cmd.status().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ToolNotFound {
                    tool: self.program.display().to_string(),
                }
            } else {
                Error::tool_failed(self.tool_name(), format!("Failed to start: {}", e))
            }
        })?;

        let status = ToolStatus::from(status);
        debug!("{} finished with {}", self.description, status);
        Ok(status)
    }

    /// Run the command and return its stdout. A non-zero exit is an error
    /// carrying the tool's stderr.
    pub async fn capture(&self, platform: &dyn HostPlatform) -> Result<String> {
        debug!("Capturing {}: {} {:?}", self.description, self.program.display(), self.args_lossy());

        let mut cmd = platform.command(&self.program, &self.args, self.low_priority);
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ToolNotFound {
                    tool: self.program.display().to_string(),
                }
            } else {
                Error::tool_failed(self.tool_name(), format!("Failed to start: {}", e))
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::tool_failed(
                self.tool_name(),
                format!("{} failed ({}): {}", self.description, ToolStatus::from(output.status), stderr.trim()),
            ));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_keeps_argument_order() {
        let cmd = ToolCommand::new("ffmpeg", "Test")
            .arg("-i")
            .path_arg(Path::new("/videos/a b.mp4"))
            .opt_arg("-t", Some("8"))
            .opt_arg::<&str>("-ss", None)
            .args(["-c", "copy"])
            .low_priority(true);

        assert_eq!(
            cmd.args_lossy(),
            vec!["-i", "/videos/a b.mp4", "-t", "8", "-c", "copy"]
        );
        assert!(cmd.low_priority);
        assert_eq!(cmd.tool_name(), "ffmpeg");
    }

    #[test]
    fn test_tool_status() {
        assert!(ToolStatus::ok().success);
        assert!(!ToolStatus::exited(1).success);
        assert_eq!(ToolStatus::killed().to_string(), "terminated by signal");
        assert_eq!(ToolStatus::exited(3).to_string(), "exit code 3");
    }
}
