//! Skill descriptor resolution
//!
//! Turns a checked-out skill (image root or repository) into finished
//! descriptors: generated defaults, `skill.yaml` documents, and inlined
//! subscription and schema resources.

pub mod defaults;
pub mod merge;
pub mod resolver;
pub mod resources;
pub mod schema;

pub use resolver::{DESCRIPTOR_FILE, DescriptorResolver, has_descriptor};
pub use resources::ResourceInliner;
pub use schema::{
    Artifacts, DescriptorError, DockerArtifact, QueryDefinition, SchemaDefinition,
    SkillDescriptor, SkillPatch,
};
