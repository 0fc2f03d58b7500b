//! Registration orchestration: event in, registered skills out.

pub mod register;
pub mod report;

pub use register::{DescriptorSource, RegistrationOptions, RegistrationPipeline};
pub use report::{DescriptorOrigin, RegisteredSkill, RegistrationReport};
