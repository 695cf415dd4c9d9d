//! Local service bootstrap
//!
//! Runs a copy of the service binary inside a scratch directory for the
//! duration of a test run. The instance is an explicit scoped resource:
//! `start` only returns once the service reports ready, and `shutdown` must be
//! called on every exit path. The child is also killed on drop.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::{Child, Command};

use crate::common::config::ServiceConfig;
use crate::common::{Error, Result};

/// A running service instance and its scratch directory
pub struct ServiceInstance {
    child: Child,
    /// Removed on drop, after the child
    _dir: TempDir,
}

impl ServiceInstance {
    /// Stage the binary and its configuration, spawn it and wait until ready
    pub async fn start(binary: &Path, config: &ServiceConfig) -> Result<Self> {
        let dir = tempfile::tempdir()?;
        tracing::info!(dir = %dir.path().display(), "Created service directory");

        let executable = stage(dir.path(), binary, config)?;
        let child = Command::new(&executable)
            .args(&config.args)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                Error::ServiceSpawnFailed(format!("{}: {}", executable.display(), e))
            })?;

        let instance = Self { child, _dir: dir };
        if let Err(e) = wait_until_ready(config).await {
            instance.shutdown().await;
            return Err(e);
        }
        Ok(instance)
    }

    /// Terminate the service and remove its directory
    pub async fn shutdown(mut self) {
        tracing::info!("Stopping service");
        if let Err(e) = self.child.kill().await {
            tracing::warn!(error = %e, "Failed to stop service");
        }
    }
}

/// Lay out `<dir>/<data_dir>`, `<dir>/<config_dir>/<config file>` and `<dir>/<binary_name>`
fn stage(dir: &Path, binary: &Path, config: &ServiceConfig) -> Result<PathBuf> {
    std::fs::create_dir(dir.join(&config.data_dir))?;
    let config_dir = dir.join(&config.config_dir);
    std::fs::create_dir(&config_dir)?;

    let file_name = config.config_file.file_name().ok_or_else(|| {
        Error::Config(format!(
            "service config file has no file name: {}",
            config.config_file.display()
        ))
    })?;
    std::fs::copy(&config.config_file, config_dir.join(file_name))
        .map_err(|e| Error::file_read(&config.config_file, e))?;

    let executable = dir.join(&config.binary_name);
    std::fs::copy(binary, &executable).map_err(|e| Error::file_read(binary, e))?;
    Ok(executable)
}

/// Poll the readiness endpoint until it answers 200 with the expected body
async fn wait_until_ready(config: &ServiceConfig) -> Result<()> {
    let client = reqwest::Client::new();
    let interval = Duration::from_millis(config.poll_interval_ms);

    for attempt in 1..=config.max_attempts {
        tracing::debug!(attempt, url = %config.readiness_url, "Checking on service");
        match check_readiness(&client, &config.readiness_url).await {
            Ok(body) if body.trim() == config.ready_body => {
                tracing::info!(attempt, "Service started");
                tokio::time::sleep(Duration::from_secs(config.settle_secs)).await;
                return Ok(());
            }
            Ok(_) => tracing::debug!("Service not ready yet"),
            Err(e) => tracing::debug!(error = %e, "Service not reachable yet"),
        }
        tokio::time::sleep(interval).await;
    }

    tracing::error!(attempts = config.max_attempts, "Service never started");
    Err(Error::ServiceNeverReady(config.max_attempts))
}

/// Body of a successful readiness response
async fn check_readiness(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        return Err(Error::Config(format!(
            "readiness check returned {}",
            response.status()
        )));
    }
    Ok(response.text().await?)
}
