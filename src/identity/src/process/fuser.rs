use super::PortOwnerLookup;
use async_trait::async_trait;
use mesos2iam_common::ResolutionError;
use nix::unistd::Uid;
use regex::Regex;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

static FUSER_PID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*(\d+)/tcp:\s+(\d+)").expect("fuser pattern is valid"));

/// Port lookup through `fuser <port>/tcp`.
///
/// Seeing sockets of other users needs root, so the command goes through
/// `sudo -n` when the proxy itself is not root.
pub struct FuserLookup {
    use_sudo: bool,
    timeout: Duration,
}

impl FuserLookup {
    pub fn new(timeout: Duration) -> Self {
        Self {
            use_sudo: !Uid::effective().is_root(),
            timeout,
        }
    }

    fn command(&self, port: u16) -> Command {
        let target = format!("{port}/tcp");
        let mut command = if self.use_sudo {
            let mut command = Command::new("sudo");
            command.args(["-n", "fuser", &target]);
            command
        } else {
            let mut command = Command::new("fuser");
            command.arg(&target);
            command
        };
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }
}

#[async_trait]
impl PortOwnerLookup for FuserLookup {
    async fn owner_of(&self, port: u16) -> Result<u32, ResolutionError> {
        let output = match tokio::time::timeout(self.timeout, self.command(port).output()).await {
            Err(_) => {
                return Err(ResolutionError::ProcessLookupFailed {
                    port,
                    detail: format!("fuser did not answer within {:?}", self.timeout),
                })
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                return Err(ResolutionError::PermissionDenied {
                    port,
                    detail: e.to_string(),
                })
            }
            Ok(Err(e)) => {
                return Err(ResolutionError::ProcessLookupFailed {
                    port,
                    detail: format!("could not run fuser: {e}"),
                })
            }
            Ok(Ok(output)) => output,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        // fuser prints the name on stderr and the pids on stdout
        let combined = format!("{stderr}{stdout}");
        debug!(port, output = %combined.trim(), "fuser finished");

        interpret_fuser_output(port, output.status.code(), &stdout, &stderr)
    }
}

fn interpret_fuser_output(
    port: u16,
    exit_code: Option<i32>,
    stdout: &str,
    stderr: &str,
) -> Result<u32, ResolutionError> {
    if let Some(pid) = extract_pid_from_fuser_output(&format!("{stderr}{stdout}")) {
        return Ok(pid);
    }

    if is_permission_problem(stderr) {
        return Err(ResolutionError::PermissionDenied {
            port,
            detail: stderr.trim().to_string(),
        });
    }

    if exit_code == Some(1) && stdout.trim().is_empty() {
        return Err(ResolutionError::ProcessNotFound { port });
    }

    Err(ResolutionError::ProcessLookupFailed {
        port,
        detail: format!("unexpected fuser output: {}", format!("{stderr}{stdout}").trim()),
    })
}

/// First pid listed by fuser. Several pids show up when a socket is shared
/// after a fork; fuser lists them in /proc order and the first one is taken.
pub(crate) fn extract_pid_from_fuser_output(output: &str) -> Option<u32> {
    FUSER_PID
        .captures(output)
        .and_then(|captures| captures.get(2))
        .and_then(|pid| pid.as_str().parse().ok())
}

fn is_permission_problem(stderr: &str) -> bool {
    stderr.contains("Permission denied")
        || stderr.contains("password is required")
        || stderr.contains("not in the sudoers")
}
