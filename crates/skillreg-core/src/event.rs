//! Registration event: the image build that triggers a registration.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::image::{DockerImage, RegistryCredential, dedup_credentials};
use crate::source::Commit;

/// A new image built from a commit, plus candidate registry credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationEvent {
    pub image: DockerImage,
    pub commit: Commit,
    #[serde(default, alias = "registry")]
    pub registries: Vec<RegistryCredential>,
}

impl RegistrationEvent {
    pub fn new(image: DockerImage, commit: Commit) -> Self {
        Self {
            image,
            commit,
            registries: Vec::new(),
        }
    }

    pub fn with_registry(mut self, credential: RegistryCredential) -> Self {
        self.registries.push(credential);
        self
    }

    /// Parse an event, de-duplicating registries by id.
    pub fn from_json(input: &str) -> anyhow::Result<Self> {
        let event: RegistrationEvent =
            serde_json::from_str(input).context("Failed to parse registration event")?;
        Ok(event.normalized())
    }

    /// Drop repeated registry ids, keeping the first occurrence.
    pub fn normalized(mut self) -> Self {
        self.registries = dedup_credentials(self.registries);
        self
    }
}
