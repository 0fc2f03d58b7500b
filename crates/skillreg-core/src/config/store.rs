//! Config store: locates skillreg.toml and applies environment overrides.

use std::path::{Path, PathBuf};

use anyhow::Context;

use super::{SkillregConfig, parser};

pub const CONFIG_FILE: &str = "skillreg.toml";

pub const ENV_CATALOG_TOKEN: &str = "SKILLREG_CATALOG_TOKEN";
pub const ENV_STREAM_TOKEN: &str = "SKILLREG_STREAM_TOKEN";
pub const ENV_GITHUB_TOKEN: &str = "SKILLREG_GITHUB_TOKEN";
pub const ENV_CANONICAL_PASSWORD: &str = "SKILLREG_CANONICAL_PASSWORD";

#[derive(Debug, Clone)]
pub struct ConfigStore {
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store for the user's config directory.
    pub fn from_default_location() -> anyhow::Result<Self> {
        let dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("skillreg");
        Ok(Self::from_path(dir.join(CONFIG_FILE)))
    }

    pub fn from_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// An explicit path wins; otherwise the default location.
    pub fn locate(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Ok(Self::from_path(path)),
            None => Self::from_default_location(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Load the file (defaults when missing) and apply environment overrides.
    pub fn load(&self) -> anyhow::Result<SkillregConfig> {
        self.load_with_env(|key| std::env::var(key).ok())
    }

    pub fn load_with_env(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<SkillregConfig> {
        let mut config = if self.config_path.exists() {
            parser::parse_config(&self.config_path)?
        } else {
            tracing::debug!(
                "No config file at {}, using defaults",
                self.config_path.display()
            );
            SkillregConfig::new()
        };
        apply_env(&mut config, lookup);
        Ok(config)
    }

    pub fn save(&self, config: &SkillregConfig) -> anyhow::Result<()> {
        let content = parser::to_toml(config)?;
        if let Some(parent) = self.config_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&self.config_path, content).with_context(|| {
            format!(
                "Failed to write config file: {}",
                self.config_path.display()
            )
        })
    }
}

/// Override secrets from the environment; empty values are ignored.
pub fn apply_env(config: &mut SkillregConfig, lookup: impl Fn(&str) -> Option<String>) {
    let read = |key: &str| lookup(key).filter(|value| !value.is_empty());
    if let Some(token) = read(ENV_CATALOG_TOKEN) {
        config.catalog.token = Some(token);
    }
    if let Some(token) = read(ENV_STREAM_TOKEN) {
        config.stream.token = Some(token);
    }
    if let Some(token) = read(ENV_GITHUB_TOKEN) {
        config.github.token = Some(token);
    }
    if let Some(password) = read(ENV_CANONICAL_PASSWORD) {
        config.canonical.credential.password = Some(password);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_file_loads_defaults() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::from_path(temp.path().join(CONFIG_FILE));
        let config = store.load_with_env(env(&[])).unwrap();
        assert_eq!(config, SkillregConfig::default());
    }

    #[test]
    fn environment_overrides_file_secrets() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(CONFIG_FILE);
        std::fs::write(&path, "[catalog]\ntoken = \"from-file\"\n[github]\ntoken = \"gh\"\n")
            .unwrap();

        let config = ConfigStore::from_path(&path)
            .load_with_env(env(&[
                (ENV_CATALOG_TOKEN, "from-env"),
                (ENV_GITHUB_TOKEN, ""),
                (ENV_CANONICAL_PASSWORD, "pw"),
            ]))
            .unwrap();
        assert_eq!(config.catalog.token.as_deref(), Some("from-env"));
        assert_eq!(config.github.token.as_deref(), Some("gh"));
        assert_eq!(config.canonical.credential.password.as_deref(), Some("pw"));
    }

    #[test]
    fn save_then_load() {
        let temp = TempDir::new().unwrap();
        let store = ConfigStore::from_path(temp.path().join("nested").join(CONFIG_FILE));
        let mut config = SkillregConfig::default();
        config.tagger.name = "Release Bot".to_string();
        store.save(&config).unwrap();
        assert_eq!(store.load_with_env(env(&[])).unwrap(), config);
    }

    #[test]
    fn explicit_path_wins() {
        let store = ConfigStore::locate(Some(Path::new("/tmp/custom.toml"))).unwrap();
        assert_eq!(store.config_path(), Path::new("/tmp/custom.toml"));
    }
}
