//! Scenario runner
//!
//! Executes the steps of one scenario in order, threading the previous
//! step's result. A failing step aborts its scenario only.

use std::path::Path;

use colored::Colorize;
use serde_json::{Map, Value};

use crate::common::{Error, Result};

use super::context::stack_maps;
use super::scenario::{applies_to_engine, open_scenario, Step, StepMap};
use super::step::StepExecutor;

/// Result of a scenario run
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub name: String,
    pub passed: bool,
    pub steps_executed: usize,
    pub steps_skipped: usize,
    /// 1-based index of the failing step
    pub failed_step: Option<usize>,
    pub error: Option<String>,
}

impl ScenarioOutcome {
    pub(crate) fn failed(name: &str, failed_step: Option<usize>, steps_executed: usize, error: &Error) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            steps_executed,
            steps_skipped: 0,
            failed_step,
            error: Some(error.to_string()),
        }
    }
}

/// Load a scenario file and run it under `context`
pub async fn run_scenario(
    path: &Path,
    name: &str,
    context: &StepMap,
    engine: &str,
    executor: &StepExecutor,
) -> ScenarioOutcome {
    match open_scenario(path) {
        Ok(steps) => run_steps(name, steps, context, engine, executor).await,
        Err(e) => {
            println!("{} {}", "✗".red(), name.red());
            println!("  {}", e);
            ScenarioOutcome::failed(name, None, 0, &e)
        }
    }
}

/// Run parsed steps in order
///
/// Each step is merged on top of `context`. Steps whose `engines` list does
/// not include `engine` are skipped and leave the previous result untouched.
pub async fn run_steps(
    name: &str,
    steps: Vec<StepMap>,
    context: &StepMap,
    engine: &str,
    executor: &StepExecutor,
) -> ScenarioOutcome {
    let mut previous = Value::Object(Map::new());
    let mut executed = 0;
    let mut skipped = 0;

    for (i, raw) in steps.iter().enumerate() {
        let step_num = i + 1;
        let merged = stack_maps(context, raw);

        let result = match applies_to_engine(&merged, engine) {
            Ok(false) => {
                tracing::debug!(scenario = name, step = step_num, engine, "Step skipped for engine");
                skipped += 1;
                continue;
            }
            Ok(true) => execute(&merged, &previous, executor).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(value) => {
                previous = value;
                executed += 1;
            }
            Err(e) => {
                report_failure(name, step_num, &merged, engine, &e);
                let mut outcome = ScenarioOutcome::failed(name, Some(step_num), executed, &e);
                outcome.steps_skipped = skipped;
                return outcome;
            }
        }
    }

    println!(
        "{} {}: {} steps ({} skipped)",
        "✓".green(),
        name,
        executed,
        skipped
    );

    ScenarioOutcome {
        name: name.to_string(),
        passed: true,
        steps_executed: executed,
        steps_skipped: skipped,
        failed_step: None,
        error: None,
    }
}

async fn execute(merged: &StepMap, previous: &Value, executor: &StepExecutor) -> Result<Value> {
    let step = Step::from_map(merged)?;
    executor.run_step(&step, previous).await
}

fn report_failure(name: &str, step_num: usize, step: &StepMap, engine: &str, error: &Error) {
    tracing::error!(scenario = name, step = step_num, engine, error = %error, "Scenario failed");
    println!("{} {}", "✗".red(), name.red());
    println!("  Failed at step {} (engine: {})", step_num, engine);
    let dump = serde_yaml::to_string(step).unwrap_or_else(|_| format!("{:?}", step));
    for line in dump.lines() {
        println!("    {}", line.dimmed());
    }
    println!("  {}", error);
    println!("{}", "--------------".dimmed());
}
