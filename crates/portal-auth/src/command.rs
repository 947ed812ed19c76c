//! Authenticator delegating to an external checkpassword-style helper.

use async_trait::async_trait;
use portal_types::{AuthError, Authenticator};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Runs `program args...`, writes `username\npassword\n` to its stdin and accepts the
/// credentials when it exits with status 0.
pub struct CommandAuthenticator {
    program: String,
    args: Vec<String>,
}

impl CommandAuthenticator {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Parse a whitespace-separated command line (`/usr/sbin/checkpw --service web`).
    pub fn from_command_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let program = parts.next()?;
        Some(Self::new(program).with_args(parts))
    }
}

#[async_trait]
impl Authenticator for CommandAuthenticator {
    async fn authenticate(&self, username: &str, password: &str) -> Result<bool, AuthError> {
        if username.contains(['\n', '\r']) || password.contains(['\n', '\r']) {
            return Ok(false);
        }
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AuthError::Backend(format!("failed to run {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            let payload = format!("{}\n{}\n", username, password);
            match stdin.write_all(payload.as_bytes()).await {
                Ok(()) => {}
                // Helper exited without reading; its status decides.
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(AuthError::Backend(e.to_string())),
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;
        tracing::debug!(program = %self.program, username, %status, "credential helper finished");
        Ok(status.success())
    }
}
