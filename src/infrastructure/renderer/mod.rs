//! Renderer that shells out to an external map rendering command

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use uuid::Uuid;

use crate::configuration::MapConfiguration;
use crate::core::config::RendererConfig;
use crate::core::error::{FulfillmentError, Result};
use crate::fulfillment::MapRenderer;

/// Runs a configured shell command with `{config}` and `{output}` substituted
pub struct CommandRenderer {
    command: String,
    output_dir: PathBuf,
}

impl CommandRenderer {
    pub fn new(command: impl Into<String>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            command: command.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_config(config: &RendererConfig) -> Self {
        Self::new(config.command.clone(), config.output_dir.clone())
    }

    fn command_line(&self, config_path: &Path, output_path: &Path) -> String {
        self.command
            .replace("{config}", &quote(config_path))
            .replace("{output}", &quote(output_path))
    }
}

/// Renderer input file, removed once the render attempt ends (including
/// when the attempt is cancelled)
struct RenderInput(PathBuf);

impl Drop for RenderInput {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.0) {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(
                    path = %self.0.display(),
                    error = %e,
                    "Failed to remove renderer input"
                );
            }
        }
    }
}

/// Single-quote a path for `sh -c`
fn quote(path: &Path) -> String {
    let raw = path.to_string_lossy();
    if cfg!(target_os = "windows") {
        format!("\"{raw}\"")
    } else {
        format!("'{}'", raw.replace('\'', r"'\''"))
    }
}

#[async_trait]
impl MapRenderer for CommandRenderer {
    async fn render(&self, config: &MapConfiguration) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let stem = format!("map_{}", Uuid::new_v4());
        let config_path = self.output_dir.join(format!("{stem}.json"));
        let output_path = self.output_dir.join(format!("{stem}.png"));
        let input = RenderInput(config_path);
        tokio::fs::write(&input.0, serde_json::to_vec_pretty(config)?).await?;

        let (shell, shell_arg) = if cfg!(target_os = "windows") {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };
        let command_line = self.command_line(&input.0, &output_path);
        tracing::debug!(command = %command_line, "Running map renderer");

        let output = Command::new(shell)
            .arg(shell_arg)
            .arg(&command_line)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| FulfillmentError::render(format!("Failed to start renderer: {e}")))?;
        drop(input);

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FulfillmentError::render(format!(
                "renderer exited with {}: {}",
                output
                    .status
                    .code()
                    .map_or_else(|| "a signal".to_string(), |c| format!("code {c}")),
                stderr.trim()
            )));
        }

        if !tokio::fs::try_exists(&output_path).await? {
            return Err(FulfillmentError::render(format!(
                "renderer succeeded but wrote nothing to {}",
                output_path.display()
            )));
        }

        tracing::info!(path = %output_path.display(), "Map rendered");
        Ok(output_path)
    }
}
