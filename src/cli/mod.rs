//! CLI command handling
//!
//! Resolves configuration and flags, optionally bootstraps a local service
//! instance, then runs the selected scenarios and prints the summary.

pub mod service;

use std::path::PathBuf;
use std::sync::Arc;

use crate::commands::Args;
use crate::common::config::Config;
use crate::common::{Error, Result};
use crate::http::ReqwestTransport;
use crate::testing::{Suite, SuiteOptions};

use service::ServiceInstance;

/// Run the test suite described by `args`
///
/// Returns whether every scenario passed. Errors are reserved for problems
/// that prevent the run itself: bad flags, bad configuration, a service that
/// never becomes ready, an unreadable scenario root.
pub async fn run(args: Args) -> Result<bool> {
    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    let engine = args
        .engine
        .clone()
        .unwrap_or_else(|| config.defaults.engine.clone());

    if args.binary.is_some() && engine != config.defaults.primary_engine {
        return Err(Error::InvalidArguments(format!(
            "The --binary option is only supported for {} engine.",
            config.defaults.primary_engine
        )));
    }

    let service = match &args.binary {
        Some(binary) => Some(ServiceInstance::start(binary, &config.service).await?),
        None => None,
    };

    let result = run_suite(&args, &config, engine).await;

    if let Some(service) = service {
        service.shutdown().await;
    }
    result
}

async fn run_suite(args: &Args, config: &Config, engine: String) -> Result<bool> {
    let root: PathBuf = args
        .root
        .clone()
        .unwrap_or_else(|| config.defaults.scenario_root.clone());
    tracing::info!(engine = %engine, root = %root.display(), "Running scenarios");

    let options = SuiteOptions {
        engine,
        retry_wait: config.retry.wait(),
    };
    let suite = Suite::new(root, options, Arc::new(ReqwestTransport::new()));
    let scenarios = suite.discover(&args.tests)?;
    tracing::debug!(count = scenarios.len(), "Selected scenarios");

    let report = suite.run(scenarios).await;
    report.print_summary();
    Ok(report.passed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[tokio::test]
    async fn test_binary_requires_primary_engine() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();
        let args = Args::parse_from([
            "rest-api-tests",
            "--engine",
            "elasticsearch",
            "--binary",
            "/nonexistent/quickwit",
            "--config",
            config.to_str().unwrap(),
        ]);
        let err = run(args).await.unwrap_err();
        assert!(matches!(err, Error::InvalidArguments(_)));
        assert_eq!(err.exit_code(), 3);
    }

    #[tokio::test]
    async fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.toml");
        std::fs::write(&config, "").unwrap();
        let args = Args::parse_from([
            "rest-api-tests",
            "--root",
            dir.path().join("missing").to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ]);
        assert!(run(args).await.is_err());
    }
}
