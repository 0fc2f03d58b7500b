//! Skill version resolution
//!
//! A skill's version comes from the first source that provides one:
//! image tag, image version label, commit tag, the descriptor's own
//! `version`, or the next patch after the repository's highest tag.

mod resolver;
mod tags;

pub use resolver::{ResolvedVersion, VersionResolver, VersionSource};
pub use tags::{BASE_VERSION, VERSION_LABEL, highest_version, next_patch, parse_version};
