use anyhow::Context;
use serde::Serialize;

use super::tags::{VERSION_LABEL, next_patch, parse_version};
use crate::image::DockerImage;
use crate::source::{Commit, SourceControl};

/// Where a resolved version came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionSource {
    ImageTag,
    ImageLabel,
    CommitTag,
    Descriptor,
    NextPatch,
}

impl std::fmt::Display for VersionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            VersionSource::ImageTag => "image tag",
            VersionSource::ImageLabel => "image label",
            VersionSource::CommitTag => "commit tag",
            VersionSource::Descriptor => "descriptor",
            VersionSource::NextPatch => "next patch",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedVersion {
    pub version: String,
    pub source: VersionSource,
}

impl ResolvedVersion {
    fn new(version: impl Into<String>, source: VersionSource) -> Self {
        Self {
            version: version.into(),
            source,
        }
    }
}

/// Picks a version for every descriptor of one registration.
///
/// The repository-tag fallback is computed at most once and shared, so
/// several descriptors of one file never claim successive patch versions.
pub struct VersionResolver<'a> {
    image: &'a DockerImage,
    commit: &'a Commit,
    source_control: &'a dyn SourceControl,
    fallback: Option<String>,
}

impl<'a> VersionResolver<'a> {
    pub fn new(
        image: &'a DockerImage,
        commit: &'a Commit,
        source_control: &'a dyn SourceControl,
    ) -> Self {
        Self {
            image,
            commit,
            source_control,
            fallback: None,
        }
    }

    /// Resolve the version for a descriptor declaring `declared`.
    ///
    /// Versions read from tags are normalized (`v2.0.0` becomes `2.0.0`).
    ///
    /// Only the repository-tag fallback can fail.
    pub fn resolve(&mut self, declared: Option<&str>) -> anyhow::Result<ResolvedVersion> {
        if let Some(version) = self.image.tags.iter().find_map(|t| parse_version(t)) {
            return Ok(ResolvedVersion::new(
                version.to_string(),
                VersionSource::ImageTag,
            ));
        }

        if let Some(label) = self.image.label(VERSION_LABEL)
            && !label.trim().is_empty()
        {
            return Ok(ResolvedVersion::new(label.trim(), VersionSource::ImageLabel));
        }

        if let Some(version) = self
            .commit
            .refs
            .iter()
            .filter(|r| r.is_tag())
            .find_map(|r| parse_version(&r.name))
        {
            return Ok(ResolvedVersion::new(
                version.to_string(),
                VersionSource::CommitTag,
            ));
        }

        if let Some(declared) = declared.map(str::trim).filter(|v| !v.is_empty()) {
            return Ok(ResolvedVersion::new(declared, VersionSource::Descriptor));
        }

        Ok(ResolvedVersion::new(
            self.fallback()?,
            VersionSource::NextPatch,
        ))
    }

    fn fallback(&mut self) -> anyhow::Result<String> {
        if let Some(version) = &self.fallback {
            return Ok(version.clone());
        }
        let repo = self.commit.repo_id();
        let tags = self
            .source_control
            .list_tags(&repo)
            .with_context(|| format!("Failed to list tags of {}", repo.slug()))?;
        let version = next_patch(tags.iter().map(String::as_str)).to_string();
        tracing::debug!(
            repo = %repo.slug(),
            tags = tags.len(),
            "Calculated next version {}",
            version
        );
        self.fallback = Some(version.clone());
        Ok(version)
    }
}
