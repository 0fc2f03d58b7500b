//! Summary of one registration run.

use serde::Serialize;

use crate::catalog::TagOutcome;
use crate::publish::PublishOutcome;
use crate::version::VersionSource;

/// Where the descriptors were read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorOrigin {
    Image,
    Repository,
}

impl std::fmt::Display for DescriptorOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptorOrigin::Image => f.write_str("image"),
            DescriptorOrigin::Repository => f.write_str("repository"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegisteredSkill {
    pub namespace: String,
    pub name: String,
    pub version: String,
    pub version_source: VersionSource,
    pub artifact: Option<String>,
    pub publish: PublishOutcome,
    /// `None` when nothing was registered (dry run).
    pub tag: Option<TagOutcome>,
}

impl RegisteredSkill {
    /// `namespace/name@version`
    pub fn reference(&self) -> String {
        format!("{}/{}@{}", self.namespace, self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrationReport {
    pub image: String,
    pub origin: DescriptorOrigin,
    pub dry_run: bool,
    pub skills: Vec<RegisteredSkill>,
}

impl RegistrationReport {
    /// One-line summary for the invoking framework.
    pub fn status_message(&self) -> String {
        let skills = self
            .skills
            .iter()
            .map(RegisteredSkill::reference)
            .collect::<Vec<_>>()
            .join(", ");
        if self.dry_run {
            format!("Would register {}", skills)
        } else {
            format!("Successfully registered {}", skills)
        }
    }
}
