//! Container image model and registry access.
//!
//! This module provides:
//! - The image reference carried by a registration event
//! - Registry credentials and their ranking for a given image host
//! - The image transport seam (login, download, copy) and its CLI implementation
//! - The locator that downloads an image's file system for inspection

pub mod credential;
pub mod locator;
pub mod transport;

use serde::{Deserialize, Serialize};

pub use credential::{RegistryCredential, RegistryType, dedup_credentials, rank_credentials};
pub use locator::{DownloadedImage, ImageLocator};
pub use transport::{AuthSession, CliImageTransport, ImageTransport, TransportError};

/// Hosts that are addressed without a host prefix.
const DOCKER_HUB_HOSTS: [&str; 2] = ["hub.docker.com", "docker.io"];

/// Repository an image was pushed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRepository {
    /// Registry host (e.g., "gcr.io")
    pub host: String,
    /// Repository path within the registry (e.g., "org/skill")
    pub name: String,
}

/// Image label as reported by the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLabel {
    pub name: String,
    pub value: String,
}

/// Entry of a multi-platform manifest list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestListEntry {
    pub digest: String,
}

/// Image reference for a freshly built image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerImage {
    pub repository: ImageRepository,
    #[serde(default)]
    pub digest: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub labels: Vec<ImageLabel>,
    #[serde(default)]
    pub manifest_list: Vec<ManifestListEntry>,
}

impl DockerImage {
    /// Create an image reference with no digest, tags or labels.
    pub fn new(host: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            repository: ImageRepository {
                host: host.into(),
                name: name.into(),
            },
            digest: None,
            tags: Vec::new(),
            labels: Vec::new(),
            manifest_list: Vec::new(),
        }
    }

    pub fn with_digest(mut self, digest: impl Into<String>) -> Self {
        self.digest = Some(digest.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.push(ImageLabel {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn host(&self) -> &str {
        &self.repository.host
    }

    /// Value of the first label with the given name.
    pub fn label(&self, name: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|l| l.name == name)
            .map(|l| l.value.as_str())
    }

    /// Digest that pins this image: manifest-list digest first, then the image digest.
    pub fn pinned_digest(&self) -> Option<&str> {
        self.manifest_list
            .first()
            .map(|m| m.digest.as_str())
            .filter(|d| !d.is_empty())
            .or(self.digest.as_deref().filter(|d| !d.is_empty()))
    }

    /// Image name without tag or digest; Docker Hub images drop the host.
    pub fn name(&self) -> String {
        if DOCKER_HUB_HOSTS.contains(&self.repository.host.as_str()) {
            self.repository.name.clone()
        } else {
            format!("{}/{}", self.repository.host, self.repository.name)
        }
    }

    /// Fully-qualified reference: digest when known, else the first tag.
    pub fn full_name(&self) -> String {
        let name = self.name();
        if let Some(digest) = self.pinned_digest() {
            return format!("{}@{}", name, digest);
        }
        match self.tags.first() {
            Some(tag) => format!("{}:{}", name, tag),
            None => name,
        }
    }
}
