//! Generated default descriptor layer derived from commit metadata.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use url::Url;

use super::schema::{DescriptorError, SkillPatch};
use crate::source::Commit;

/// Organization whose skills are published under a fixed identity.
pub const RESERVED_ORG: &str = "atomist-skills";
/// Namespace used for skills of the reserved organization.
pub const RESERVED_NAMESPACE: &str = "atomist";
/// Author used for skills of the reserved organization.
pub const RESERVED_AUTHOR: &str = "Atomist";

pub const ICON_FILE: &str = "icon.svg";
pub const DEFAULT_LICENSE: &str = "Apache-2.0";

/// Build the defaults layer for a skill checked out at `root`.
pub fn default_patch(
    root: &Path,
    commit: &Commit,
    web_url: &Url,
) -> Result<SkillPatch, DescriptorError> {
    let org = commit.owner();
    let repo = commit.repo_name();
    let web = web_url.as_str().trim_end_matches('/');
    let description = format!("Atomist Skill registered from {}/{}", org, repo);

    let (namespace, author) = if org == RESERVED_ORG {
        (RESERVED_NAMESPACE.to_string(), RESERVED_AUTHOR.to_string())
    } else {
        (org.to_string(), org.to_string())
    };

    Ok(SkillPatch {
        namespace: Some(namespace),
        name: Some(repo.to_string()),
        display_name: Some(repo.to_string()),
        author: Some(author),
        readme: Some(STANDARD.encode(description.as_bytes())),
        long_description: Some(description.clone()),
        description: Some(description),
        icon_url: Some(icon_url(root, web, org)?),
        homepage_url: Some(format!("{}/{}/{}", web, org, repo)),
        license: Some(DEFAULT_LICENSE.to_string()),
        ..Default::default()
    })
}

/// Inline `icon.svg` as a data URL, or fall back to the org avatar.
fn icon_url(root: &Path, web: &str, org: &str) -> Result<String, DescriptorError> {
    let icon = root.join(ICON_FILE);
    if !icon.is_file() {
        return Ok(format!("{}/{}.png", web, org));
    }
    let bytes = std::fs::read(&icon).map_err(|source| DescriptorError::Io {
        path: icon.display().to_string(),
        source,
    })?;
    Ok(format!("data:image/svg+xml;base64,{}", STANDARD.encode(bytes)))
}
