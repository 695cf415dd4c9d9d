//! Directory-scoped context
//!
//! Each directory contributes one frame: its `cwd` plus the contents of
//! `_ctx.yaml` and `_ctx.<engine>.yaml`. The effective context is the fold of
//! all frames from the root to the current directory, deeper frames winning.

use std::path::Path;

use serde_json::Value;

use crate::common::{Error, Result};

use super::scenario::StepMap;

/// Merge two maps into a new one, keys of `overriding` shadowing `base`
pub fn stack_maps(base: &StepMap, overriding: &StepMap) -> StepMap {
    let mut merged = base.clone();
    merged.extend(overriding.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Frame holding only the directory's `cwd`
pub fn base_frame(dir: &Path) -> StepMap {
    let mut frame = StepMap::new();
    frame.insert("cwd".to_string(), Value::String(dir.display().to_string()));
    frame
}

/// Build the context frame for a directory
pub fn load_frame(dir: &Path, engine: &str) -> Result<StepMap> {
    let mut frame = base_frame(dir);
    for file_name in ["_ctx.yaml".to_string(), format!("_ctx.{}.yaml", engine)] {
        let path = dir.join(&file_name);
        if !path.exists() {
            continue;
        }
        tracing::debug!(path = %path.display(), "Loading context file");
        let content = std::fs::read_to_string(&path).map_err(|e| Error::file_read(&path, e))?;
        if content.trim().is_empty() {
            continue;
        }
        match serde_yaml::from_str::<Value>(&content)? {
            Value::Object(ctx) => frame.extend(ctx),
            Value::Null => {}
            other => {
                return Err(Error::Config(format!(
                    "Context file '{}' must be a mapping, got {}",
                    path.display(),
                    crate::expr::type_name(&other)
                )))
            }
        }
    }
    Ok(frame)
}

/// Stack of context frames, one per directory being visited
#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<StepMap>,
    effective: StepMap,
}

impl ContextStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, frame: StepMap) {
        self.frames.push(frame);
        self.rebuild();
    }

    pub fn pop(&mut self) -> Option<StepMap> {
        let frame = self.frames.pop();
        self.rebuild();
        frame
    }

    /// The union of all frames, deeper frames overriding shallower ones
    pub fn effective(&self) -> &StepMap {
        &self.effective
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    fn rebuild(&mut self) {
        self.effective = self
            .frames
            .iter()
            .fold(StepMap::new(), |acc, frame| stack_maps(&acc, frame));
    }
}
