//! Skillreg Core Library
//!
//! Registers skills built as container images: resolves skill metadata
//! from the image or its source repository, publishes it to the skill
//! catalog, tags the source commit with the resolved version, and
//! republishes container artifacts to a canonical registry.

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod git;
pub mod http;
pub mod image;
pub mod orchestration;
pub mod publish;
pub mod skills;
pub mod source;
pub mod stream;
pub mod version;

/// Re-exports of commonly used types
pub mod prelude {
    // Configuration
    pub use crate::config::{ConfigStore, SkillregConfig};
    pub use crate::context::RegistrationContext;

    // Event and pipeline
    pub use crate::error::RegistrationError;
    pub use crate::event::RegistrationEvent;
    pub use crate::orchestration::{
        DescriptorSource, RegisteredSkill, RegistrationOptions, RegistrationPipeline,
        RegistrationReport,
    };

    // Collaborators
    pub use crate::catalog::{Catalog, GraphqlCatalog, TagOutcome};
    pub use crate::image::{
        CliImageTransport, DockerImage, ImageTransport, RegistryCredential, RegistryType,
    };
    pub use crate::source::{Commit, GitHubSourceControl, SourceControl};
    pub use crate::stream::{EventStream, HttpEventStream, LogEventStream};

    // Skills
    pub use crate::skills::{SkillDescriptor, SkillPatch};
    pub use crate::version::{VersionResolver, VersionSource};
}
