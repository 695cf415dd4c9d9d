//! Scenario discovery and selection

use std::path::Path;

use crate::common::paths::to_slash;
use crate::common::{Error, Result};

/// Extension of scenario, setup/teardown and context files
const SCENARIO_EXTENSION: &str = "yaml";

/// Collect every YAML file under `root`, as sorted `/`-separated relative paths
pub fn discover_scenarios(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        return Err(Error::Config(format!(
            "Scenario root '{}' is not a directory",
            root.display()
        )));
    }
    let mut found = Vec::new();
    walk(root, root, &mut found)?;
    found.sort();
    Ok(found)
}

fn walk(root: &Path, dir: &Path, found: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir).map_err(|e| Error::file_read(dir, e))? {
        let path = entry?.path();
        if path.is_dir() {
            walk(root, &path, found)?;
        } else if path.extension().is_some_and(|ext| ext == SCENARIO_EXTENSION) {
            if let Ok(relative) = path.strip_prefix(root) {
                found.push(to_slash(relative));
            }
        }
    }
    Ok(())
}

/// Keep the scenarios whose name starts with one of `prefixes`
///
/// No prefixes selects everything.
pub fn filter_tests(prefixes: &[String], names: Vec<String>) -> Vec<String> {
    if prefixes.is_empty() {
        return names;
    }
    tracing::info!(?prefixes, "Filtering tests by prefix");
    names
        .into_iter()
        .filter(|name| prefixes.iter().any(|p| name.starts_with(p.as_str())))
        .collect()
}
