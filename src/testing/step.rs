//! Step execution
//!
//! Turns a merged step into HTTP requests, sends them with the retry policy
//! and checks the JSON response against the step's expectation.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use flate2::read::GzDecoder;
use serde_json::{Map, Value};

use crate::common::{Error, Result};
use crate::expr::resolve_previous;
use crate::http::{HttpMethod, HttpRequest, RequestBody, Transport};

use super::expect::check_result;
use super::retry::send_with_retry;
use super::scenario::Step;

/// Executes steps against a transport
pub struct StepExecutor {
    transport: Arc<dyn Transport>,
    retry_wait: Duration,
}

impl StepExecutor {
    pub fn new(transport: Arc<dyn Transport>, retry_wait: Duration) -> Self {
        Self {
            transport,
            retry_wait,
        }
    }

    /// Run a step and return its result
    ///
    /// A step without `method` sends nothing and yields an empty object. With
    /// several methods, each is sent in order with the same arguments and the
    /// last response is the result.
    pub async fn run_step(&self, step: &Step, previous: &Value) -> Result<Value> {
        let Some(methods) = &step.config.method else {
            return Ok(Value::Object(Map::new()));
        };
        let methods = methods
            .iter()
            .map(|m| m.parse::<HttpMethod>())
            .collect::<Result<Vec<_>>>()?;

        let template = build_request(step, previous)?;
        let mut result = Value::Object(Map::new());
        for method in methods {
            let request = HttpRequest {
                method,
                ..template.clone()
            };
            result = self.send(step, &request).await?;
        }
        Ok(result)
    }

    async fn send(&self, step: &Step, request: &HttpRequest) -> Result<Value> {
        let transport = &self.transport;
        let response = send_with_retry(
            move || transport.send(request),
            step.config.status_code,
            step.config.num_retries,
            self.retry_wait,
            &request.url,
        )
        .await?;

        let json = response.json(&request.url)?;
        if let Some(expected) = &step.config.expected {
            if let Err(e) = check_result(&json, expected) {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
                );
                return Err(e);
            }
        }
        Ok(json)
    }
}

/// Build the request for a step, with `$previous` references resolved
///
/// The method is a placeholder; callers set it per verb.
pub fn build_request(step: &Step, previous: &Value) -> Result<HttpRequest> {
    let config = &step.config;
    let api_root = config
        .api_root
        .as_deref()
        .ok_or_else(|| Error::MalformedStep("missing 'api_root'".to_string()))?;
    let url = format!("{}{}", api_root, config.endpoint);

    let file_body = match &config.body_from_file {
        Some(file) => Some(load_body(&config.cwd.join(file))?),
        None => None,
    };

    let args = match resolve_previous(&Value::Object(step.args.clone()), previous)? {
        Value::Object(args) => args,
        other => {
            return Err(Error::MalformedStep(format!(
                "request arguments resolved to {}",
                other
            )))
        }
    };

    let params = match args.get("params") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(params)) => query_pairs(params),
        Some(other) => {
            return Err(Error::MalformedStep(format!(
                "'params' must be a mapping, got {}",
                other
            )))
        }
    };

    let mut headers = match args.get("headers") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(headers)) => headers
            .iter()
            .map(|(k, v)| (k.clone(), render_scalar(v)))
            .collect(),
        Some(other) => {
            return Err(Error::MalformedStep(format!(
                "'headers' must be a mapping, got {}",
                other
            )))
        }
    };

    let mut body = match args.get("data") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(RequestBody::Raw(raw.clone().into_bytes())),
        Some(Value::Object(fields)) => Some(RequestBody::Form(query_pairs(fields))),
        Some(other) => Some(RequestBody::Raw(other.to_string().into_bytes())),
    };
    if let Some(bytes) = file_body {
        body = Some(RequestBody::Raw(bytes));
    }
    if let Some(docs) = &config.ndjson {
        body = Some(RequestBody::Raw(ndjson_body(docs)?.into_bytes()));
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
        headers.push(("Content-Type".to_string(), "application/json".to_string()));
    }
    if body.is_none() {
        body = match args.get("json") {
            None | Some(Value::Null) => None,
            Some(json) => Some(RequestBody::Json(json.clone())),
        };
    }

    Ok(HttpRequest {
        method: HttpMethod::Get,
        url,
        params,
        headers,
        body,
    })
}

/// One JSON document per line, newline-terminated
///
/// Bulk endpoints reject a body whose last line is not terminated.
pub fn ndjson_body(docs: &[Value]) -> Result<String> {
    let mut body = String::new();
    for doc in docs {
        body.push_str(&serde_json::to_string(doc)?);
        body.push('\n');
    }
    Ok(body)
}

/// Read a request body from disk, gunzipping `*gz` files
pub fn load_body(path: &Path) -> Result<Vec<u8>> {
    let raw = std::fs::read(path).map_err(|e| Error::file_read(path, e))?;
    if !path.to_string_lossy().ends_with("gz") {
        return Ok(raw);
    }
    let mut decoded = Vec::new();
    GzDecoder::new(raw.as_slice())
        .read_to_end(&mut decoded)
        .map_err(|e| Error::file_read(path, e))?;
    Ok(decoded)
}

/// Flatten a mapping into key/value pairs; lists repeat the key, nulls are dropped
fn query_pairs(map: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => pairs.extend(
                items
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(|v| (key.clone(), render_scalar(v))),
            ),
            other => pairs.push((key.clone(), render_scalar(other))),
        }
    }
    pairs
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::scenario::StepMap;
    use serde_json::json;
    use std::io::Write;

    fn step(value: Value) -> Step {
        match value {
            Value::Object(map) => Step::from_map(&map).unwrap(),
            _ => panic!("Expected an object"),
        }
    }

    #[test]
    fn test_build_json_request() {
        let step = step(json!({
            "api_root": "http://localhost:7280/api/v1/",
            "endpoint": "indexes",
            "method": "POST",
            "json": {"index_id": {"$previous": "val['id']"}},
            "params": {"commit": "force", "tags": ["a", "b"], "skip": null, "limit": 10}
        }));
        let req = build_request(&step, &json!({"id": "wiki"})).unwrap();
        assert_eq!(req.url, "http://localhost:7280/api/v1/indexes");
        assert_eq!(req.body, Some(RequestBody::Json(json!({"index_id": "wiki"}))));
        let mut params = req.params.clone();
        params.sort();
        assert_eq!(
            params,
            vec![
                ("commit".to_string(), "force".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("tags".to_string(), "a".to_string()),
                ("tags".to_string(), "b".to_string()),
            ]
        );
        assert!(req.header("user-agent").is_some());
    }

    #[test]
    fn test_missing_api_root() {
        let step = step(json!({"method": "GET"}));
        assert!(matches!(
            build_request(&step, &json!({})),
            Err(Error::MalformedStep(_))
        ));
    }

    #[test]
    fn test_ndjson_body_and_content_type() {
        let step = step(json!({
            "api_root": "http://h",
            "endpoint": "/_bulk",
            "headers": {"content-type": "text/plain", "x-id": 7},
            "ndjson": [{"index": {"_index": "a"}}, {"msg": "hello"}]
        }));
        let req = build_request(&step, &json!({})).unwrap();
        assert_eq!(
            req.body,
            Some(RequestBody::Raw(
                b"{\"index\":{\"_index\":\"a\"}}\n{\"msg\":\"hello\"}\n".to_vec()
            ))
        );
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(
            req.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("content-type")).count(),
            1
        );
        assert_eq!(req.header("x-id"), Some("7"));
    }

    #[test]
    fn test_headers_from_context_are_not_shared() {
        let mut context = StepMap::new();
        context.insert("headers".to_string(), json!({"x-a": "1"}));
        context.insert("api_root".to_string(), json!("http://h"));
        context.insert("ndjson".to_string(), json!([{"a": 1}]));
        let step = Step::from_map(&context).unwrap();
        let req = build_request(&step, &json!({})).unwrap();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(context["headers"], json!({"x-a": "1"}));
    }

    #[test]
    fn test_data_takes_precedence_over_json() {
        let step = step(json!({
            "api_root": "http://h",
            "data": {"a": "b"},
            "json": {"ignored": true}
        }));
        let req = build_request(&step, &json!({})).unwrap();
        assert_eq!(
            req.body,
            Some(RequestBody::Form(vec![("a".to_string(), "b".to_string())]))
        );
    }

    #[test]
    fn test_body_from_gzipped_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder.write_all(b"{\"a\": 1}\n").unwrap();
        std::fs::write(dir.path().join("docs.json.gz"), encoder.finish().unwrap()).unwrap();
        std::fs::write(dir.path().join("docs.json"), b"plain").unwrap();

        let gz = step(json!({
            "api_root": "http://h",
            "cwd": dir.path().display().to_string(),
            "body_from_file": "docs.json.gz"
        }));
        let req = build_request(&gz, &json!({})).unwrap();
        assert_eq!(req.body, Some(RequestBody::Raw(b"{\"a\": 1}\n".to_vec())));

        let plain = step(json!({
            "api_root": "http://h",
            "cwd": dir.path().display().to_string(),
            "body_from_file": "docs.json"
        }));
        let req = build_request(&plain, &json!({})).unwrap();
        assert_eq!(req.body, Some(RequestBody::Raw(b"plain".to_vec())));
    }

    #[test]
    fn test_missing_body_file() {
        let step = step(json!({
            "api_root": "http://h",
            "cwd": "/nonexistent-dir",
            "body_from_file": "nope.json"
        }));
        assert!(matches!(
            build_request(&step, &json!({})),
            Err(Error::FileRead { .. })
        ));
    }
}
