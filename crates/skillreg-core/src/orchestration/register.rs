//! The registration pipeline.
//!
//! Steps run strictly in order and stop at the first fatal error:
//! 1. Download the image, picking the first registry credential that works
//! 2. Pick the descriptor root (image or repository checkout)
//! 3. Resolve descriptors, versions and inlined resources for every skill
//! 4. Publish container artifacts
//! 5. Register each skill, tag the commit and record the deployment stream
//!
//! Every skill is resolved before anything is published, and every artifact
//! is published before anything is registered.

use std::path::Path;

use tempfile::TempDir;

use super::report::{DescriptorOrigin, RegisteredSkill, RegistrationReport};
use crate::catalog::CatalogRegistrar;
use crate::context::RegistrationContext;
use crate::error::{RegistrationError, Result};
use crate::event::RegistrationEvent;
use crate::image::{DownloadedImage, ImageLocator, dedup_credentials};
use crate::publish::{ArtifactPublisher, PublishOutcome, PublishPlan, attach_artifact};
use crate::skills::{DescriptorResolver, ResourceInliner, SkillDescriptor, has_descriptor};
use crate::source::Commit;
use crate::version::{ResolvedVersion, VersionResolver};

/// Which tree descriptors are read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DescriptorSource {
    /// The image root, falling back to the repository when it has no `skill.yaml`
    #[default]
    ImageFirst,
    /// Always the repository checked out at the commit
    RepositoryFirst,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistrationOptions {
    pub source: DescriptorSource,
    /// Resolve everything but publish, register and tag nothing.
    pub dry_run: bool,
}

impl RegistrationOptions {
    pub fn with_source(mut self, source: DescriptorSource) -> Self {
        self.source = source;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

/// Descriptor tree; owns the checkout when the repository was cloned.
struct DescriptorTree {
    origin: DescriptorOrigin,
    checkout: Option<TempDir>,
}

impl DescriptorTree {
    fn root<'a>(&'a self, image: &'a DownloadedImage) -> &'a Path {
        match &self.checkout {
            Some(dir) => dir.path(),
            None => image.root(),
        }
    }
}

/// A finished descriptor waiting to be published.
struct ResolvedSkill {
    descriptor: SkillDescriptor,
    version: ResolvedVersion,
}

pub struct RegistrationPipeline<'a> {
    ctx: &'a RegistrationContext,
    options: RegistrationOptions,
}

impl<'a> RegistrationPipeline<'a> {
    pub fn new(ctx: &'a RegistrationContext, options: RegistrationOptions) -> Self {
        Self { ctx, options }
    }

    /// Run one registration.
    pub fn run(&self, event: &RegistrationEvent) -> Result<RegistrationReport> {
        let image_name = event.image.full_name();
        tracing::info!("Registering skills from image {}", image_name);

        let credentials = dedup_credentials(event.registries.clone());
        let downloaded = ImageLocator::new(self.ctx.transport())
            .download(&event.image, &credentials)
            .map_err(|source| RegistrationError::Download {
                image: image_name.clone(),
                source,
            })?;

        let tree = self.descriptor_tree(&downloaded, &event.commit)?;
        let root = tree.root(&downloaded);
        tracing::debug!(origin = %tree.origin, "Reading skill descriptors from {}", root.display());

        let mut skills = self.resolve(event, root)?;
        let outcomes = self.publish(event, &downloaded, &mut skills)?;

        let mut registered = Vec::with_capacity(skills.len());
        let registrar = CatalogRegistrar::new(
            self.ctx.catalog(),
            self.ctx.source_control(),
            self.ctx.stream(),
        )
        .with_identity(self.ctx.tagger().clone());

        for (skill, publish) in skills.into_iter().zip(outcomes) {
            let tag = if self.options.dry_run {
                tracing::info!(
                    "Dry run: would register {}@{}",
                    skill.descriptor.qualified_name(),
                    skill.descriptor.version
                );
                None
            } else {
                Some(registrar.register(&event.commit, &event.image, &skill.descriptor)?)
            };
            registered.push(RegisteredSkill {
                namespace: skill.descriptor.namespace.clone(),
                name: skill.descriptor.name.clone(),
                version: skill.descriptor.version.clone(),
                version_source: skill.version.source,
                artifact: skill.descriptor.artifact_image().map(str::to_string),
                publish,
                tag,
            });
        }

        Ok(RegistrationReport {
            image: image_name,
            origin: tree.origin,
            dry_run: self.options.dry_run,
            skills: registered,
        })
    }

    fn descriptor_tree(
        &self,
        downloaded: &DownloadedImage,
        commit: &Commit,
    ) -> Result<DescriptorTree> {
        let use_image = match self.options.source {
            DescriptorSource::ImageFirst => has_descriptor(downloaded.root()),
            DescriptorSource::RepositoryFirst => false,
        };
        if use_image {
            return Ok(DescriptorTree {
                origin: DescriptorOrigin::Image,
                checkout: None,
            });
        }

        let repo = commit.repo_id();
        tracing::info!("Cloning {} at {}", repo.slug(), repo.sha);
        let checkout = TempDir::new()?;
        self.ctx
            .source_control()
            .clone_at(&repo, checkout.path())
            .map_err(|source| RegistrationError::Checkout {
                repo: repo.slug(),
                source,
            })?;
        Ok(DescriptorTree {
            origin: DescriptorOrigin::Repository,
            checkout: Some(checkout),
        })
    }

    /// Finish every descriptor under `root`: version, validation, resources.
    fn resolve(&self, event: &RegistrationEvent, root: &Path) -> Result<Vec<ResolvedSkill>> {
        let patches =
            DescriptorResolver::new(root, self.ctx.web_url().clone()).resolve(&event.commit)?;
        let mut versions =
            VersionResolver::new(&event.image, &event.commit, self.ctx.source_control());
        let inliner = ResourceInliner::new(root);

        let mut skills = Vec::with_capacity(patches.len());
        for patch in patches {
            let version = versions
                .resolve(patch.version.as_deref())
                .map_err(RegistrationError::Version)?;
            tracing::debug!(
                "Resolved version {} from {}",
                version.version,
                version.source
            );
            let mut descriptor =
                SkillDescriptor::finish(patch, version.version.clone(), &event.commit)?;
            inliner
                .inline(&mut descriptor)
                .map_err(|source| RegistrationError::Resources {
                    skill: descriptor.qualified_name(),
                    source,
                })?;
            skills.push(ResolvedSkill {
                descriptor,
                version,
            });
        }
        Ok(skills)
    }

    fn publish(
        &self,
        event: &RegistrationEvent,
        downloaded: &DownloadedImage,
        skills: &mut [ResolvedSkill],
    ) -> Result<Vec<PublishOutcome>> {
        let publisher = ArtifactPublisher::new(
            self.ctx.transport(),
            self.ctx.cache(),
            self.ctx.publish_settings(),
        );
        let mut outcomes = Vec::with_capacity(skills.len());
        for skill in skills.iter_mut() {
            let descriptor = &mut skill.descriptor;
            let outcome = if self.options.dry_run {
                let plan = publisher.plan(&event.image, descriptor);
                if let PublishPlan::Copy { destination, .. } = &plan {
                    tracing::info!("Dry run: would copy image to {}", destination);
                }
                attach_artifact(descriptor, &plan);
                dry_run_outcome(plan)
            } else {
                publisher
                    .publish(&event.image, downloaded.credential(), descriptor)
                    .map_err(|source| RegistrationError::Copy {
                        skill: descriptor.qualified_name(),
                        source,
                    })?
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}

fn dry_run_outcome(plan: PublishPlan) -> PublishOutcome {
    match plan {
        PublishPlan::NotContainer => PublishOutcome::NotContainer,
        PublishPlan::InPlace { image } => PublishOutcome::InPlace(image),
        PublishPlan::Copy { destination, .. } => PublishOutcome::Planned(destination),
    }
}
