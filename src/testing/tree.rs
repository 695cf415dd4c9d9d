//! Scenario tree
//!
//! Groups scenario paths by directory and walks them depth-first: a
//! directory's own scenarios run before its subdirectories, subdirectories in
//! name order.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};

/// Prefix of files that are never run as scenarios on their own
pub const EXCLUSION_MARKER: char = '_';

/// Hooks fired while walking a [`PathTree`]
///
/// Each hook reports success; the walk never stops early.
#[async_trait]
pub trait TreeVisitor: Send {
    async fn enter_directory(&mut self, path: &[String]) -> bool;
    async fn run_scenario(&mut self, path: &[String], script: &str) -> bool;
    async fn exit_directory(&mut self, path: &[String]) -> bool;
}

#[derive(Debug, Default)]
pub struct PathTree {
    children: BTreeMap<String, PathTree>,
    scripts: Vec<String>,
}

impl PathTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tree from `/`-separated relative paths
    ///
    /// Paths are sorted first; scripts keep that order within each directory.
    pub fn build(mut paths: Vec<String>) -> Self {
        paths.sort();
        let mut tree = Self::new();
        for path in &paths {
            tree.add_path(path);
        }
        tree
    }

    fn add_child(&mut self, segment: &str) -> &mut PathTree {
        self.children.entry(segment.to_string()).or_default()
    }

    /// Register a scenario path; files starting with the exclusion marker are ignored
    pub fn add_path(&mut self, path: &str) {
        let segments: Vec<&str> = path.split('/').collect();
        let Some((script, dirs)) = segments.split_last() else {
            return;
        };
        if script.starts_with(EXCLUSION_MARKER) {
            return;
        }
        let mut node = self;
        for dir in dirs {
            node = node.add_child(dir);
        }
        node.scripts.push(script.to_string());
    }

    pub fn scripts(&self) -> &[String] {
        &self.scripts
    }

    pub fn child(&self, segment: &str) -> Option<&PathTree> {
        self.children.get(segment)
    }

    /// Walk the tree, returning the conjunction of every hook's result
    pub fn visit_nodes<'a, V: TreeVisitor>(
        &'a self,
        visitor: &'a mut V,
        path: Vec<String>,
    ) -> BoxFuture<'a, bool> {
        async move {
            let mut success = visitor.enter_directory(&path).await;
            for script in &self.scripts {
                success &= visitor.run_scenario(&path, script).await;
            }
            for (name, child) in &self.children {
                let mut child_path = path.clone();
                child_path.push(name.clone());
                success &= child.visit_nodes(&mut *visitor, child_path).await;
            }
            success &= visitor.exit_directory(&path).await;
            success
        }
        .boxed()
    }
}
