//! Skill descriptor schema
//!
//! `SkillPatch` is a partial descriptor as read from defaults or `skill.yaml`;
//! `SkillDescriptor` is the finished, validated record sent to the catalog.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::source::Commit;

/// Named subscription query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefinition {
    pub name: String,
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
}

impl QueryDefinition {
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            limit: None,
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Named schema document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
    pub name: String,
    pub schema: String,
}

impl SchemaDefinition {
    pub fn new(name: impl Into<String>, schema: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: schema.into(),
        }
    }
}

/// Container artifact of a skill.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockerArtifact {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: String,
    /// Runtime settings (command, args, env, resources, ...) passed through.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Artifacts section of a descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Artifacts {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub docker: Vec<DockerArtifact>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Artifacts {
    pub fn is_empty(&self) -> bool {
        self.docker.is_empty() && self.extra.is_empty()
    }
}

impl From<DockerArtifact> for Artifacts {
    fn from(artifact: DockerArtifact) -> Self {
        Artifacts {
            docker: vec![artifact],
            ..Default::default()
        }
    }
}

/// Partial descriptor layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datalog_subscriptions: Option<Vec<QueryDefinition>>,
    /// Extra glob patterns of subscription files, relative to the skill root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datalog_subscription_paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schemata: Option<Vec<SchemaDefinition>>,
    /// Extra glob patterns of schema files, relative to the skill root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schemata_paths: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Artifacts>,
    /// Keys this workflow does not interpret (parameters, categories, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Accept a YAML scalar of any type as a string (`version: 1` is a number).
fn scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => {
            return Err(serde::de::Error::custom(format!(
                "expected a scalar version, found {}",
                other
            )));
        }
    })
}

/// Errors raised while building a descriptor.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("skill descriptor is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("failed to parse {path}: {source}")]
    Yaml {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Finished skill metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillDescriptor {
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub display_name: String,
    pub author: String,
    pub description: String,
    pub long_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub readme: Option<String>,
    pub icon_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub homepage_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    pub repo_id: String,
    pub commit_sha: String,
    #[serde(default)]
    pub datalog_subscriptions: Vec<QueryDefinition>,
    #[serde(default)]
    pub schemata: Vec<SchemaDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Artifacts>,
    #[serde(skip)]
    pub subscription_paths: Vec<String>,
    #[serde(skip)]
    pub schema_paths: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Keys pinned by `finish`; a patch can never override them.
const PINNED_KEYS: [&str; 2] = ["repoId", "commitSha"];

fn required(value: Option<String>, field: &'static str) -> Result<String, DescriptorError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(DescriptorError::MissingField(field))
}

impl SkillDescriptor {
    /// Validate a merged patch and pin it to a version and commit.
    pub fn finish(
        patch: SkillPatch,
        version: impl Into<String>,
        commit: &Commit,
    ) -> Result<Self, DescriptorError> {
        let namespace = required(patch.namespace, "namespace")?;
        let name = required(patch.name, "name")?;
        let version = required(Some(version.into()), "version")?;
        let author = required(patch.author, "author")?;
        let description = required(patch.description, "description")?;
        let icon_url = required(patch.icon_url, "iconUrl")?;

        let mut extra = patch.extra;
        for key in PINNED_KEYS {
            if extra.remove(key).is_some() {
                tracing::debug!("Ignoring '{}' declared by the descriptor", key);
            }
        }

        Ok(Self {
            display_name: patch.display_name.unwrap_or_else(|| name.clone()),
            long_description: patch
                .long_description
                .unwrap_or_else(|| description.clone()),
            namespace,
            name,
            version,
            author,
            description,
            readme: patch.readme,
            icon_url,
            homepage_url: patch.homepage_url,
            license: patch.license,
            repo_id: commit.repo.source_id.clone(),
            commit_sha: commit.sha.clone(),
            datalog_subscriptions: patch.datalog_subscriptions.unwrap_or_default(),
            schemata: patch.schemata.unwrap_or_default(),
            artifacts: patch.artifacts,
            subscription_paths: patch.datalog_subscription_paths.unwrap_or_default(),
            schema_paths: patch.schemata_paths.unwrap_or_default(),
            extra,
        })
    }

    /// `namespace/name` identity in the catalog.
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }

    /// First docker artifact image, if any.
    pub fn artifact_image(&self) -> Option<&str> {
        self.artifacts
            .as_ref()
            .and_then(|a| a.docker.first())
            .map(|d| d.image.as_str())
            .filter(|i| !i.is_empty())
    }
}
