//! Inlines subscription and schema files into a descriptor.

use std::path::{Component, Path, PathBuf};

use anyhow::Context;

use super::merge::{merge_queries, merge_schemata};
use super::schema::{QueryDefinition, SchemaDefinition, SkillDescriptor};

/// Subscription query files discovered by default.
pub const SUBSCRIPTION_PATTERN: &str = "datalog/subscription/*.edn";
/// Schema files discovered by default.
pub const SCHEMA_PATTERN: &str = "datalog/schema/*.edn";

/// Reads resource files below a skill root.
#[derive(Debug, Clone)]
pub struct ResourceInliner {
    root: PathBuf,
}

impl ResourceInliner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Inline queries and schemas, consuming the descriptor's path declarations.
    pub fn inline(&self, descriptor: &mut SkillDescriptor) -> anyhow::Result<()> {
        let declared_queries = std::mem::take(&mut descriptor.datalog_subscriptions);
        let query_paths = std::mem::take(&mut descriptor.subscription_paths);
        let schema_paths = std::mem::take(&mut descriptor.schema_paths);

        let mut queries = self.queries(SUBSCRIPTION_PATTERN)?;
        merge_queries(&mut queries, declared_queries);
        for pattern in &query_paths {
            merge_queries(&mut queries, self.queries(pattern)?);
        }
        descriptor.datalog_subscriptions = queries;

        if descriptor.schemata.is_empty() {
            let mut schemata = self.schemata(SCHEMA_PATTERN)?;
            for pattern in &schema_paths {
                merge_schemata(&mut schemata, self.schemata(pattern)?);
            }
            descriptor.schemata = schemata;
        }

        tracing::debug!(
            skill = %descriptor.qualified_name(),
            queries = descriptor.datalog_subscriptions.len(),
            schemata = descriptor.schemata.len(),
            "Inlined skill resources"
        );
        Ok(())
    }

    fn queries(&self, pattern: &str) -> anyhow::Result<Vec<QueryDefinition>> {
        self.read_matches(pattern)
            .map(|files| {
                files
                    .into_iter()
                    .map(|(name, query)| QueryDefinition::new(name, query))
                    .collect()
            })
    }

    fn schemata(&self, pattern: &str) -> anyhow::Result<Vec<SchemaDefinition>> {
        self.read_matches(pattern)
            .map(|files| {
                files
                    .into_iter()
                    .map(|(name, schema)| SchemaDefinition::new(name, schema))
                    .collect()
            })
    }

    /// Read every file matching `pattern` as `(file stem, contents)`.
    fn read_matches(&self, pattern: &str) -> anyhow::Result<Vec<(String, String)>> {
        let files = self.matches(pattern);
        if files.is_empty() {
            tracing::debug!("No files match {}", pattern);
        }
        files
            .into_iter()
            .map(|path| {
                let name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                let contents = std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Ok((name, contents))
            })
            .collect()
    }

    /// Files under the root matching `pattern`, in sorted order.
    ///
    /// Patterns are sub-paths of the root; anything resolving outside it is dropped.
    fn matches(&self, pattern: &str) -> Vec<PathBuf> {
        let relative = pattern.trim_start_matches('/');
        if !is_sub_path(relative) {
            tracing::warn!("Ignoring resource pattern outside the skill root: '{}'", pattern);
            return Vec::new();
        }
        let Ok(root) = self.root.canonicalize() else {
            return Vec::new();
        };
        let full = format!("{}/{}", glob::Pattern::escape(&root.to_string_lossy()), relative);
        let paths = match glob::glob(&full) {
            Ok(paths) => paths,
            Err(err) => {
                tracing::warn!("Ignoring invalid resource pattern '{}': {}", pattern, err);
                return Vec::new();
            }
        };
        let mut files: Vec<PathBuf> = paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(err) => {
                    tracing::warn!("Skipping unreadable path: {}", err);
                    None
                }
            })
            .filter(|path| path.is_file())
            .filter(|path| match path.canonicalize() {
                Ok(resolved) if resolved.starts_with(&root) => true,
                _ => {
                    tracing::warn!("Skipping {} outside the skill root", path.display());
                    false
                }
            })
            .collect();
        files.sort();
        files
    }
}

/// Whether `pattern` stays below the directory it is joined onto.
fn is_sub_path(pattern: &str) -> bool {
    Path::new(pattern)
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
