//! Container artifact publishing
//!
//! Container-mode skills carry a docker artifact whose image lives in a
//! canonical registry. Images built elsewhere are copied there once.

mod cache;
mod publisher;

use serde::{Deserialize, Serialize};

use crate::image::{DockerImage, RegistryCredential, RegistryType};

pub use cache::ArtifactCache;
pub use publisher::{ArtifactPublisher, PublishOutcome, PublishPlan, attach_artifact};

/// Image label declaring `<mode>/<api version>`.
pub const API_VERSION_LABEL: &str = "com.docker.skill.api.version";

/// Skill mode whose artifact is the image itself.
pub const CONTAINER_MODE: &str = "container";

pub const DEFAULT_IMAGE_TEMPLATE: &str =
    "gcr.io/atomist-container-skills/{namespace}-{name}:{version}.skill";
pub const DEFAULT_CANONICAL_HOST: &str = "gcr.io";
pub const DEFAULT_CANONICAL_PREFIX: &str = "atomist-container-skills/";
pub const DEFAULT_CANONICAL_ACCOUNT: &str =
    "atomist-gcr-analysis@atomist-container-skills.iam.gserviceaccount.com";

/// Parsed API version label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillApi {
    pub mode: String,
    pub version: String,
}

impl SkillApi {
    /// Parse `<mode>/<version>`; `None` when either part is missing.
    pub fn parse(label: &str) -> Option<Self> {
        let (mode, version) = label.trim().split_once('/')?;
        if mode.is_empty() || version.is_empty() {
            return None;
        }
        Some(Self {
            mode: mode.to_string(),
            version: version.to_string(),
        })
    }

    /// API declared by the image; a missing or malformed label yields `None`.
    pub fn of(image: &DockerImage) -> Option<Self> {
        let label = image.label(API_VERSION_LABEL);
        let api = label.and_then(Self::parse);
        if label.is_some() && api.is_none() {
            tracing::warn!(
                "Ignoring malformed {} label on {}",
                API_VERSION_LABEL,
                image.full_name()
            );
        }
        api
    }

    pub fn is_container(&self) -> bool {
        self.mode == CONTAINER_MODE
    }
}

/// Registry namespace that already serves as an artifact home.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRegistry {
    pub host: String,
    pub prefix: String,
}

impl CanonicalRegistry {
    pub fn new(host: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            prefix: prefix.into(),
        }
    }

    pub fn matches(&self, image: &DockerImage) -> bool {
        image.host() == self.host && image.repository.name.starts_with(&self.prefix)
    }
}

impl Default for CanonicalRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_CANONICAL_HOST, DEFAULT_CANONICAL_PREFIX)
    }
}

/// Where artifacts are published and how to authenticate there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSettings {
    pub registries: Vec<CanonicalRegistry>,
    pub image_template: String,
    pub credential: RegistryCredential,
}

impl PublishSettings {
    pub fn is_canonical(&self, image: &DockerImage) -> bool {
        self.registries.iter().any(|r| r.matches(image))
    }
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            registries: vec![CanonicalRegistry::default()],
            image_template: DEFAULT_IMAGE_TEMPLATE.to_string(),
            credential: RegistryCredential::new(
                "canonical",
                RegistryType::Gcr,
                DEFAULT_CANONICAL_HOST,
            )
            .with_service_account(DEFAULT_CANONICAL_ACCOUNT),
        }
    }
}

/// Expand `{namespace}`, `{name}` and `{version}` in an image template.
pub fn destination_name(template: &str, namespace: &str, name: &str, version: &str) -> String {
    template
        .replace("{namespace}", namespace)
        .replace("{name}", name)
        .replace("{version}", version)
}
