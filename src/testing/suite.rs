//! Suite execution
//!
//! Walks the scenario tree, maintaining the context stack and running
//! setup/teardown scenarios at directory boundaries.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use colored::Colorize;

use crate::common::Result;
use crate::http::Transport;

use super::context::{base_frame, load_frame, ContextStack};
use super::runner::{run_scenario, ScenarioOutcome};
use super::select::{discover_scenarios, filter_tests};
use super::step::StepExecutor;
use super::tree::{PathTree, TreeVisitor};

/// Options shared by every scenario of a run
#[derive(Debug, Clone)]
pub struct SuiteOptions {
    /// Engine the scenarios target; gates `engines` filters and engine-specific files
    pub engine: String,
    /// Wait between retry attempts
    pub retry_wait: Duration,
}

/// Outcome of a whole run
#[derive(Debug)]
pub struct SuiteReport {
    pub passed: bool,
    pub outcomes: Vec<ScenarioOutcome>,
}

impl SuiteReport {
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioOutcome> {
        self.outcomes.iter().filter(|o| !o.passed)
    }

    pub fn print_summary(&self) {
        let failed: Vec<&str> = self.failures().map(|o| o.name.as_str()).collect();
        let passed = self.outcomes.len() - failed.len();
        println!();
        if self.passed {
            println!(
                "{} {}",
                "✓".green().bold(),
                format!("{} scenarios passed", passed).green().bold()
            );
            return;
        }
        println!(
            "{} {}",
            "✗".red().bold(),
            format!("{} passed, {} failed", passed, failed.len()).red().bold()
        );
        for name in failed {
            println!("  {} {}", "✗".red(), name);
        }
    }
}

/// A scenario tree rooted at a directory
pub struct Suite {
    root: PathBuf,
    options: SuiteOptions,
    executor: StepExecutor,
}

impl Suite {
    pub fn new(root: impl Into<PathBuf>, options: SuiteOptions, transport: Arc<dyn Transport>) -> Self {
        let executor = StepExecutor::new(transport, options.retry_wait);
        Self {
            root: root.into(),
            options,
            executor,
        }
    }

    /// Scenario paths under the root, filtered by name prefix
    pub fn discover(&self, prefixes: &[String]) -> Result<Vec<String>> {
        let all = discover_scenarios(&self.root)?;
        Ok(filter_tests(prefixes, all))
    }

    /// Run the given scenarios; the walk always completes
    pub async fn run(&self, scenario_paths: Vec<String>) -> SuiteReport {
        let tree = PathTree::build(scenario_paths);
        let mut visitor = SuiteVisitor {
            root: &self.root,
            engine: &self.options.engine,
            executor: &self.executor,
            contexts: ContextStack::new(),
            outcomes: Vec::new(),
        };
        let passed = tree.visit_nodes(&mut visitor, Vec::new()).await;
        SuiteReport {
            passed,
            outcomes: visitor.outcomes,
        }
    }
}

struct SuiteVisitor<'a> {
    root: &'a Path,
    engine: &'a str,
    executor: &'a StepExecutor,
    contexts: ContextStack,
    outcomes: Vec<ScenarioOutcome>,
}

impl SuiteVisitor<'_> {
    fn dir_path(&self, path: &[String]) -> PathBuf {
        path.iter().fold(self.root.to_path_buf(), |dir, seg| dir.join(seg))
    }

    /// Run `<name>.yaml` then `<name>.<engine>.yaml`, whichever exist
    async fn run_hooks(&mut self, name: &str, path: &[String]) -> bool {
        let dir = self.dir_path(path);
        let mut success = true;
        for file_name in [format!("{}.yaml", name), format!("{}.{}.yaml", name, self.engine)] {
            if dir.join(&file_name).exists() {
                success &= self.run_script(path, &file_name).await;
            }
        }
        success
    }

    async fn run_script(&mut self, path: &[String], script: &str) -> bool {
        let scenario_path = self.dir_path(path).join(script);
        let mut segments = path.to_vec();
        segments.push(script.to_string());
        let name = segments.join("/");

        let outcome = run_scenario(
            &scenario_path,
            &name,
            self.contexts.effective(),
            self.engine,
            self.executor,
        )
        .await;
        let passed = outcome.passed;
        self.outcomes.push(outcome);
        passed
    }
}

#[async_trait]
impl<'a> TreeVisitor for SuiteVisitor<'a> {
    async fn enter_directory(&mut self, path: &[String]) -> bool {
        let dir = self.dir_path(path);
        println!("{}", "============".dimmed());
        let (frame, loaded) = match load_frame(&dir, self.engine) {
            Ok(frame) => (frame, true),
            Err(e) => {
                tracing::error!(dir = %dir.display(), error = %e, "Failed to load context");
                let mut segments = path.to_vec();
                segments.push("_ctx.yaml".to_string());
                let name = segments.join("/");
                println!("{} {}: {}", "✗".red(), name.red(), e);
                self.outcomes.push(ScenarioOutcome::failed(&name, None, 0, &e));
                (base_frame(&dir), false)
            }
        };
        self.contexts.push(frame);
        let setup = self.run_hooks("_setup", path).await;
        loaded && setup
    }

    async fn run_scenario(&mut self, path: &[String], script: &str) -> bool {
        self.run_script(path, script).await
    }

    async fn exit_directory(&mut self, path: &[String]) -> bool {
        let success = self.run_hooks("_teardown", path).await;
        self.contexts.pop();
        success
    }
}
