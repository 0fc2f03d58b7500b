use semver::Version;

/// Image label carrying an explicit skill version.
pub const VERSION_LABEL: &str = "com.docker.skill.version";

/// Version bumped when a repository has no semver tags.
pub const BASE_VERSION: Version = Version::new(0, 1, 0);

/// Parse a semantic version, tolerating a leading `v` or `=`.
pub fn parse_version(raw: &str) -> Option<Version> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('=').unwrap_or(trimmed);
    let trimmed = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

/// Highest semver among `tags`; unparsable names are ignored.
pub fn highest_version<'a>(tags: impl IntoIterator<Item = &'a str>) -> Option<Version> {
    tags.into_iter().filter_map(parse_version).max()
}

/// Next patch version after the highest tag, starting from [`BASE_VERSION`].
///
/// A pre-release is released rather than bumped: `1.2.3-rc.1` becomes `1.2.3`.
pub fn next_patch<'a>(tags: impl IntoIterator<Item = &'a str>) -> Version {
    let latest = highest_version(tags).unwrap_or(BASE_VERSION);
    if latest.pre.is_empty() {
        Version::new(latest.major, latest.minor, latest.patch + 1)
    } else {
        Version::new(latest.major, latest.minor, latest.patch)
    }
}
