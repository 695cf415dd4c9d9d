//! Scenario files and step configuration
//!
//! A scenario file is a stream of YAML mappings separated by lines starting
//! with `---`. Each mapping is one step.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::common::{Error, Result};

/// A step or context frame as loaded from YAML
pub type StepMap = Map<String, Value>;

/// Keys copied verbatim into the request arguments
const REQUEST_ARG_KEYS: [&str; 4] = ["params", "data", "json", "headers"];

/// Headers used when a step declares none
pub const DEFAULT_USER_AGENT: &str = concat!("rest-api-tests/", env!("CARGO_PKG_VERSION"));

/// Split scenario text into step mappings
///
/// Blank chunks and chunks that are not mappings are dropped.
pub fn parse_scenario(content: &str) -> std::result::Result<Vec<StepMap>, serde_yaml::Error> {
    let mut steps = Vec::new();
    for chunk in content.split("\n---") {
        let chunk = chunk.trim();
        if chunk.lines().all(|l| l.trim().is_empty() || l.trim_start().starts_with('#')) {
            continue;
        }
        if let Value::Object(step) = serde_yaml::from_str::<Value>(chunk)? {
            steps.push(step);
        }
    }
    Ok(steps)
}

/// Read and parse a scenario file
pub fn open_scenario(path: &Path) -> Result<Vec<StepMap>> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::file_read(path, e))?;
    parse_scenario(&content).map_err(|e| Error::ScenarioParse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// A value that may be written as a single item or a list
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            OneOrMany::One(item) => std::slice::from_ref(item).iter(),
            OneOrMany::Many(items) => items.iter(),
        }
    }
}

/// Typed view over the keys of a step that drive execution
#[derive(Deserialize, Debug)]
pub struct StepConfig {
    /// HTTP verb(s), executed in order against the same arguments
    pub method: Option<OneOrMany<String>>,
    /// Path appended to `api_root`
    #[serde(default)]
    pub endpoint: String,
    /// Base URL of the service, usually set by a context file
    pub api_root: Option<String>,
    /// Directory of the scenario, set by the directory context
    #[serde(default)]
    pub cwd: PathBuf,
    /// Request body read from a file relative to `cwd`
    pub body_from_file: Option<PathBuf>,
    /// Documents sent as newline-delimited JSON
    pub ndjson: Option<Vec<Value>>,
    /// Expected status; explicit `null` accepts any status
    #[serde(default = "default_status_code")]
    pub status_code: Option<u16>,
    /// Extra attempts when the status does not match
    #[serde(default)]
    pub num_retries: u32,
    /// Expectation template checked against the JSON response
    pub expected: Option<Value>,
}

fn default_status_code() -> Option<u16> {
    Some(200)
}

/// A step merged with its context, ready for execution
#[derive(Debug)]
pub struct Step {
    pub config: StepConfig,
    /// `params`, `data`, `json` and `headers`, before reference resolution
    pub args: StepMap,
}

impl Step {
    pub fn from_map(map: &StepMap) -> Result<Self> {
        let config: StepConfig = serde_json::from_value(Value::Object(map.clone()))
            .map_err(|e| Error::MalformedStep(e.to_string()))?;

        let mut args: StepMap = map
            .iter()
            .filter(|(k, _)| REQUEST_ARG_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if !map.contains_key("headers") {
            let mut headers = StepMap::new();
            headers.insert(
                "user-agent".to_string(),
                Value::String(DEFAULT_USER_AGENT.to_string()),
            );
            args.insert("headers".to_string(), Value::Object(headers));
        }

        Ok(Self { config, args })
    }
}

/// Whether a step applies to the engine, per its optional `engines` key
pub fn applies_to_engine(step: &StepMap, engine: &str) -> Result<bool> {
    match step.get("engines") {
        None | Some(Value::Null) => Ok(true),
        Some(Value::String(name)) => Ok(name == engine),
        Some(Value::Array(names)) => Ok(names.iter().any(|n| n.as_str() == Some(engine))),
        Some(other) => Err(Error::MalformedStep(format!(
            "'engines' must be a string or a list of strings, got {}",
            other
        ))),
    }
}
