//! External graph layout process
//!
//! The DOT description is piped into the renderer's stdin and the image is
//! read back from its stdout. stderr passes through to the host's stderr so
//! layout diagnostics stay visible.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::domain::ExportError;

/// Runs an external layout engine such as `dot -Tsvg`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderer {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl Renderer {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout: Duration) -> Self {
        Self { command: command.into(), args, timeout }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    /// Feed `description` to the renderer and return what it printed
    ///
    /// The process is killed if it does not finish within the timeout.
    ///
    /// # Errors
    /// Returns an error if the renderer cannot be started, rejects its input,
    /// exits unsuccessfully or runs past the timeout
    pub async fn render(&self, description: Vec<u8>) -> Result<Vec<u8>, ExportError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    ExportError::RendererNotFound(self.command.clone())
                } else {
                    ExportError::SpawnFailed { command: self.command.clone(), source }
                }
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            ExportError::WriteFailed(io::Error::new(io::ErrorKind::BrokenPipe, "stdin not piped"))
        })?;
        // written concurrently with reading stdout so large graphs cannot deadlock on pipe buffers
        let writer = tokio::spawn(async move {
            stdin.write_all(&description).await?;
            stdin.shutdown().await
        });

        // dropping the child on timeout kills it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExportError::Timeout { command: self.command.clone(), timeout: self.timeout })??;

        if !output.status.success() {
            return Err(ExportError::RendererFailed {
                command: self.command.clone(),
                status: output.status,
            });
        }

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ExportError::WriteFailed(e)),
            Err(e) => return Err(ExportError::WriteFailed(io::Error::other(e))),
        }

        debug!("{} produced {} bytes", self.command, output.stdout.len());
        Ok(output.stdout)
    }
}
