//! Descriptor resolution: defaults layered under every `skill.yaml` document.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use super::defaults::default_patch;
use super::merge::merge_layers;
use super::schema::{DescriptorError, SkillPatch};
use crate::source::Commit;

/// Descriptor file at the skill root.
pub const DESCRIPTOR_FILE: &str = "skill.yaml";

/// Whether `root` carries a descriptor file.
pub fn has_descriptor(root: &Path) -> bool {
    root.join(DESCRIPTOR_FILE).is_file()
}

/// Resolves the merged descriptor layers of a checked-out skill.
#[derive(Debug, Clone)]
pub struct DescriptorResolver {
    root: PathBuf,
    web_url: Url,
}

impl DescriptorResolver {
    pub fn new(root: impl Into<PathBuf>, web_url: Url) -> Self {
        Self {
            root: root.into(),
            web_url,
        }
    }

    /// One merged patch per descriptor document.
    ///
    /// With no descriptor file, or a file with no documents, a single skill
    /// is resolved from the defaults alone.
    pub fn resolve(&self, commit: &Commit) -> Result<Vec<SkillPatch>, DescriptorError> {
        let defaults = default_patch(&self.root, commit, &self.web_url)?;
        let documents = self.load_documents()?;
        if documents.is_empty() {
            return Ok(vec![defaults]);
        }
        Ok(documents
            .into_iter()
            .map(|document| merge_layers(defaults.clone(), [document]))
            .collect())
    }

    /// Parse every YAML document of the descriptor file.
    pub fn load_documents(&self) -> Result<Vec<SkillPatch>, DescriptorError> {
        let path = self.root.join(DESCRIPTOR_FILE);
        if !path.is_file() {
            tracing::debug!("No {} found in {}", DESCRIPTOR_FILE, self.root.display());
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(&path).map_err(|source| DescriptorError::Io {
            path: path.display().to_string(),
            source,
        })?;
        parse_documents(&content).map_err(|source| DescriptorError::Yaml {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Parse a multi-document descriptor.
///
/// A document with a top-level `skill` mapping contributes that mapping;
/// otherwise the document itself is the skill. Empty documents are skipped.
pub fn parse_documents(content: &str) -> Result<Vec<SkillPatch>, serde_yaml::Error> {
    let mut patches = Vec::new();
    for document in serde_yaml::Deserializer::from_str(content) {
        let value = serde_yaml::Value::deserialize(document)?;
        if value.is_null() {
            continue;
        }
        let skill = match value.get("skill") {
            Some(inner) if inner.is_mapping() => inner.clone(),
            _ => value,
        };
        patches.push(serde_yaml::from_value(skill)?);
    }
    Ok(patches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn resolver(root: &Path) -> DescriptorResolver {
        DescriptorResolver::new(root, Url::parse("https://github.com").unwrap())
    }

    #[test]
    fn parses_wrapped_and_bare_documents() {
        let content = "skill:\n  name: one\n---\nname: two\n---\n";
        let patches = parse_documents(content).unwrap();
        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].name.as_deref(), Some("one"));
        assert_eq!(patches[1].name.as_deref(), Some("two"));
    }

    #[test]
    fn missing_descriptor_resolves_defaults() {
        let temp = TempDir::new().unwrap();
        let commit = Commit::new("acme", "widget", "abc");
        let patches = resolver(temp.path()).resolve(&commit).unwrap();
        assert_eq!(patches.len(), 1);
        assert_eq!(patches[0].name.as_deref(), Some("widget"));
        assert!(!has_descriptor(temp.path()));
    }

    #[test]
    fn each_document_layers_over_defaults() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(DESCRIPTOR_FILE),
            "skill:\n  name: first\n  description: First skill\n---\nskill:\n  name: second\n",
        )
        .unwrap();
        let commit = Commit::new("acme", "widget", "abc");
        let patches = resolver(temp.path()).resolve(&commit).unwrap();

        assert_eq!(patches.len(), 2);
        assert_eq!(patches[0].name.as_deref(), Some("first"));
        assert_eq!(patches[0].description.as_deref(), Some("First skill"));
        assert_eq!(patches[1].name.as_deref(), Some("second"));
        assert_eq!(
            patches[1].description.as_deref(),
            Some("Atomist Skill registered from acme/widget")
        );
        assert_eq!(patches[1].namespace.as_deref(), Some("acme"));
    }

    #[test]
    fn malformed_yaml_is_a_descriptor_error() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(DESCRIPTOR_FILE), "skill:\n  name: [unclosed\n").unwrap();
        let commit = Commit::new("acme", "widget", "abc");
        let err = resolver(temp.path()).resolve(&commit).unwrap_err();
        assert!(matches!(err, DescriptorError::Yaml { .. }));
    }
}
