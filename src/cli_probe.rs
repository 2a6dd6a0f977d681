//! # CLI Availability Probe
//!
//! Checks whether a migration CLI is installed by running it with its version
//! arguments. The executable is validated first and always spawned directly,
//! never through a shell.

use crate::config::CliProbeConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliAvailability {
    pub installed: bool,
    /// First line of the version output; empty when not installed
    pub version: String,
    pub error: Option<String>,
}

impl CliAvailability {
    fn missing(error: impl Into<String>) -> Self {
        Self {
            installed: false,
            version: String::new(),
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CliProbe {
    timeout: Duration,
    version_args: Vec<String>,
}

impl CliProbe {
    pub fn new(config: &CliProbeConfig) -> Self {
        Self {
            timeout: Duration::from_millis(config.timeout_ms),
            version_args: config.version_args.clone(),
        }
    }

    /// Validate `program` and run it with the version arguments.
    pub async fn probe(&self, program: &str) -> CliAvailability {
        let executable = match sanitize_executable(program) {
            Ok(path) => path,
            Err(reason) => {
                warn!(program = %program, reason = %reason, "Rejected CLI path");
                return CliAvailability::missing(reason);
            }
        };

        let mut command = Command::new(&executable);
        command
            .args(&self.version_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                debug!(program = %program, error = %err, "CLI not runnable");
                return CliAvailability::missing(format!("{program} is not installed: {err}"));
            }
            Err(_) => {
                warn!(
                    program = %program,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "CLI version check timed out"
                );
                return CliAvailability::missing(format!(
                    "{program} did not respond within {}ms",
                    self.timeout.as_millis()
                ));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return CliAvailability::missing(format!(
                "{program} exited with {}: {}",
                output.status,
                stderr.trim()
            ));
        }

        let version = first_line(&output.stdout)
            .or_else(|| first_line(&output.stderr))
            .unwrap_or_default();

        debug!(program = %program, version = %version, "CLI available");
        CliAvailability {
            installed: true,
            version,
            error: None,
        }
    }
}

fn first_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Accept a bare command name (`[A-Za-z0-9._-]`, not starting with `-`) or an
/// absolute path to an existing file without shell metacharacters.
pub fn sanitize_executable(program: &str) -> Result<PathBuf, String> {
    if program.is_empty() {
        return Err("CLI path is empty".to_string());
    }

    const FORBIDDEN: &[char] = &[
        ';', '&', '|', '$', '`', '<', '>', '(', ')', '{', '}', '[', ']', '*', '?', '!', '~',
        '\'', '"', '\\', '\n', '\r', '\t', ' ', '\0',
    ];
    if let Some(c) = program.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(format!("CLI path '{program}' contains forbidden character {c:?}"));
    }

    let path = Path::new(program);
    if path.is_absolute() {
        if path
            .components()
            .any(|component| matches!(component, std::path::Component::ParentDir))
        {
            return Err(format!("CLI path '{program}' must not contain '..'"));
        }
        if !path.is_file() {
            return Err(format!("CLI path '{program}' does not exist"));
        }
        return Ok(path.to_path_buf());
    }

    let bare_name = !program.starts_with('-')
        && program
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if !bare_name || program == "." || program == ".." {
        return Err(format!(
            "CLI path '{program}' must be a bare command name or an absolute path"
        ));
    }

    Ok(PathBuf::from(program))
}
