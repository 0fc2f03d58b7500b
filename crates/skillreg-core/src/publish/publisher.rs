use serde::Serialize;
use tempfile::TempDir;

use super::{ArtifactCache, PublishSettings, SkillApi, destination_name};
use crate::image::{AuthSession, DockerImage, ImageTransport, RegistryCredential, TransportError};
use crate::skills::SkillDescriptor;

/// Default artifact name when the descriptor declares none.
const DEFAULT_ARTIFACT_NAME: &str = "skill";

/// What publishing a descriptor's artifact involves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishPlan {
    /// Not a container skill; no artifact is attached.
    NotContainer,
    /// Image already lives in a canonical registry.
    InPlace { image: String },
    /// Image must be copied to `destination` first.
    Copy { source: String, destination: String },
}

impl PublishPlan {
    /// Image the descriptor's artifact will reference.
    pub fn artifact_image(&self) -> Option<&str> {
        match self {
            PublishPlan::NotContainer => None,
            PublishPlan::InPlace { image } => Some(image),
            PublishPlan::Copy { destination, .. } => Some(destination),
        }
    }
}

/// Result of publishing one descriptor's artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishOutcome {
    NotContainer,
    InPlace(String),
    Copied(String),
    AlreadyCopied(String),
    /// Copy that a dry run skipped.
    Planned(String),
}

impl PublishOutcome {
    pub fn artifact_image(&self) -> Option<&str> {
        match self {
            PublishOutcome::NotContainer => None,
            PublishOutcome::InPlace(image)
            | PublishOutcome::Copied(image)
            | PublishOutcome::AlreadyCopied(image)
            | PublishOutcome::Planned(image) => Some(image),
        }
    }
}

/// Attaches container artifacts to descriptors, copying images as needed.
pub struct ArtifactPublisher<'a> {
    transport: &'a dyn ImageTransport,
    cache: &'a ArtifactCache,
    settings: &'a PublishSettings,
}

impl<'a> ArtifactPublisher<'a> {
    pub fn new(
        transport: &'a dyn ImageTransport,
        cache: &'a ArtifactCache,
        settings: &'a PublishSettings,
    ) -> Self {
        Self {
            transport,
            cache,
            settings,
        }
    }

    /// Decide how `descriptor`'s artifact is published, without side effects.
    pub fn plan(&self, image: &DockerImage, descriptor: &SkillDescriptor) -> PublishPlan {
        match SkillApi::of(image) {
            Some(api) if api.is_container() => {}
            _ => return PublishPlan::NotContainer,
        }
        let source = image.full_name();
        if self.settings.is_canonical(image) {
            return PublishPlan::InPlace { image: source };
        }
        PublishPlan::Copy {
            source,
            destination: destination_name(
                &self.settings.image_template,
                &descriptor.namespace,
                &descriptor.name,
                &descriptor.version,
            ),
        }
    }

    /// Publish the artifact of `descriptor` and attach it.
    ///
    /// `source_credential` is the credential that downloaded the image.
    /// A destination already in the cache is not copied again.
    pub fn publish(
        &self,
        image: &DockerImage,
        source_credential: Option<&RegistryCredential>,
        descriptor: &mut SkillDescriptor,
    ) -> Result<PublishOutcome, TransportError> {
        let plan = self.plan(image, descriptor);
        let outcome = match &plan {
            PublishPlan::NotContainer => PublishOutcome::NotContainer,
            PublishPlan::InPlace { image } => PublishOutcome::InPlace(image.clone()),
            PublishPlan::Copy {
                source,
                destination,
            } => {
                if self.cache.contains(destination) {
                    tracing::debug!("Image {} already copied", destination);
                    PublishOutcome::AlreadyCopied(destination.clone())
                } else {
                    self.copy(source, destination, source_credential)?;
                    self.cache.record(destination.as_str());
                    PublishOutcome::Copied(destination.clone())
                }
            }
        };
        attach_artifact(descriptor, &plan);
        Ok(outcome)
    }

    fn copy(
        &self,
        source: &str,
        destination: &str,
        source_credential: Option<&RegistryCredential>,
    ) -> Result<(), TransportError> {
        let scratch = TempDir::new()?;
        let session = AuthSession::create(scratch.path().join("auth"))?;
        if let Some(credential) = source_credential {
            self.transport.login(credential, &session)?;
        }
        self.transport.login(&self.settings.credential, &session)?;
        self.transport.copy(source, destination, &session)
    }
}

/// Point the descriptor's docker artifact at the planned image.
///
/// The first declared docker artifact is kept with its runtime settings;
/// non-container skills lose any docker artifacts.
pub fn attach_artifact(descriptor: &mut SkillDescriptor, plan: &PublishPlan) {
    let mut artifacts = descriptor.artifacts.take().unwrap_or_default();
    let declared = std::mem::take(&mut artifacts.docker);
    if let Some(image) = plan.artifact_image() {
        let mut artifact = declared.into_iter().next().unwrap_or_default();
        if artifact.name.is_empty() {
            artifact.name = DEFAULT_ARTIFACT_NAME.to_string();
        }
        artifact.image = image.to_string();
        artifacts.docker.push(artifact);
    }
    descriptor.artifacts = (!artifacts.is_empty()).then_some(artifacts);
}
