//! Error types for the REST API test runner
//!
//! Scenario-level errors are caught by the scenario runner and turned into a
//! failed outcome. Only bootstrap and argument errors reach `main`.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the test runner
#[derive(Error, Debug)]
pub enum Error {
    // === Assertion Errors ===
    #[error("Expectation failed: {0}")]
    Expectation(String),

    #[error("Wrong status code. Got {actual}, expected {expected}, url {url}")]
    UnexpectedStatus {
        actual: u16,
        expected: u16,
        url: String,
    },

    // === Step Errors ===
    #[error("Malformed step: {0}")]
    MalformedStep(String),

    #[error("Unsupported HTTP method '{0}'. Supported methods: GET, POST, PUT, DELETE")]
    UnsupportedMethod(String),

    #[error("Expression '{expression}' failed: {message}")]
    Expression { expression: String, message: String },

    #[error("Response body is not valid JSON ({url}): {error}")]
    InvalidResponse { url: String, error: String },

    // === Scenario Errors ===
    #[error("Failed to parse scenario '{path}': {message}")]
    ScenarioParse { path: String, message: String },

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    // === Service Bootstrap Errors ===
    #[error("Failed to start service: {0}")]
    ServiceSpawnFailed(String),

    #[error("Service never became ready after {0} attempts")]
    ServiceNeverReady(u32),

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Transport Errors ===
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create an expectation error anchored at a diagnostic path
    pub fn expectation_at(message: impl AsRef<str>, path: &str) -> Self {
        Self::Expectation(format!("{} at context '{}'", message.as_ref(), path))
    }

    /// Create an expression error
    pub fn expression(expression: &str, message: impl Into<String>) -> Self {
        Self::Expression {
            expression: expression.to_string(),
            message: message.into(),
        }
    }

    /// Create a file read error from an io error
    pub fn file_read(path: &std::path::Path, error: io::Error) -> Self {
        Self::FileRead {
            path: path.display().to_string(),
            error: error.to_string(),
        }
    }

    /// Process exit code for an error that escapes the run
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::ServiceNeverReady(_) => 2,
            Error::InvalidArguments(_) => 3,
            _ => 1,
        }
    }
}
