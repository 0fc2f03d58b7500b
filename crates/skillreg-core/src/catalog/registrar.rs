use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::Catalog;
use crate::error::RegistrationError;
use crate::image::DockerImage;
use crate::skills::SkillDescriptor;
use crate::source::{Commit, SourceControl, TagObject, Tagger};
use crate::stream::{DeploymentRecord, EventStream};

/// Identity recorded on version tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagIdentity {
    pub name: String,
    pub email: String,
}

impl Default for TagIdentity {
    fn default() -> Self {
        Self {
            name: "Atomist Bot".to_string(),
            email: "bot@atomist.com".to_string(),
        }
    }
}

/// Result of making sure the version tag exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TagOutcome {
    Created,
    AlreadyExists,
    /// Tagging failed; registration still succeeded.
    Failed(String),
}

impl std::fmt::Display for TagOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagOutcome::Created => f.write_str("created"),
            TagOutcome::AlreadyExists => f.write_str("exists"),
            TagOutcome::Failed(_) => f.write_str("failed"),
        }
    }
}

/// Publishes finished descriptors and records their version.
pub struct CatalogRegistrar<'a> {
    catalog: &'a dyn Catalog,
    source_control: &'a dyn SourceControl,
    stream: &'a dyn EventStream,
    identity: TagIdentity,
}

impl<'a> CatalogRegistrar<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        source_control: &'a dyn SourceControl,
        stream: &'a dyn EventStream,
    ) -> Self {
        Self {
            catalog,
            source_control,
            stream,
            identity: TagIdentity::default(),
        }
    }

    pub fn with_identity(mut self, identity: TagIdentity) -> Self {
        self.identity = identity;
        self
    }

    /// Register `skill`, tag the commit with its version and record the
    /// deployment stream.
    ///
    /// Catalog and stream failures are fatal; tagging failures are not.
    pub fn register(
        &self,
        commit: &Commit,
        image: &DockerImage,
        skill: &SkillDescriptor,
    ) -> Result<TagOutcome, RegistrationError> {
        let name = skill.qualified_name();
        tracing::info!("Registering skill {}@{}", name, skill.version);
        self.catalog
            .register(skill)
            .map_err(|source| RegistrationError::Catalog {
                skill: name.clone(),
                source,
            })?;

        let tag = self.ensure_tag(commit, &skill.version);

        self.stream
            .emit(&DeploymentRecord::new(image, skill))
            .map_err(|source| RegistrationError::Stream {
                skill: name.clone(),
                source,
            })?;

        tracing::info!("Successfully registered {}@{}", name, skill.version);
        Ok(tag)
    }

    /// Make sure `refs/tags/<version>` exists, swallowing failures.
    pub fn ensure_tag(&self, commit: &Commit, version: &str) -> TagOutcome {
        match self.try_ensure_tag(commit, version) {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::warn!(
                    repo = %commit.repo_id().slug(),
                    "Failed to tag {} with {}: {:#}",
                    commit.sha,
                    version,
                    err
                );
                TagOutcome::Failed(format!("{:#}", err))
            }
        }
    }

    fn try_ensure_tag(&self, commit: &Commit, version: &str) -> anyhow::Result<TagOutcome> {
        let repo = commit.repo_id();
        if let Some(existing) = self
            .source_control
            .get_ref(&repo, &format!("tags/{}", version))?
        {
            if existing.sha != commit.sha {
                tracing::debug!(
                    "Tag {} already points at {}, not {}",
                    version,
                    existing.sha,
                    commit.sha
                );
            }
            return Ok(TagOutcome::AlreadyExists);
        }

        let tag = TagObject {
            tag: version.to_string(),
            message: format!("v{}", version),
            object: commit.sha.clone(),
            r#type: "commit".to_string(),
            tagger: Tagger {
                name: self.identity.name.clone(),
                email: self.identity.email.clone(),
                date: Utc::now(),
            },
        };
        let tag_sha = self.source_control.create_tag(&repo, &tag)?;
        self.source_control
            .create_ref(&repo, &format!("refs/tags/{}", version), &commit.sha)?;
        tracing::debug!(tag = %tag_sha, "Created tag {} on {}", version, repo.slug());
        Ok(TagOutcome::Created)
    }
}
