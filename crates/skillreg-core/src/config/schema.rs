//! Configuration schema for skillreg.toml
//!
//! Every section is optional; a missing file means defaults throughout.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::catalog::TagIdentity;
use crate::image::{RegistryCredential, RegistryType};
use crate::publish::{
    CanonicalRegistry, DEFAULT_CANONICAL_ACCOUNT, DEFAULT_CANONICAL_HOST, DEFAULT_IMAGE_TEMPLATE,
    PublishSettings,
};

/// Root configuration structure for skillreg.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillregConfig {
    /// GraphQL catalog receiving registrations
    pub catalog: EndpointConfig,

    /// Deployment stream endpoint; records are only logged when unset
    pub stream: EndpointConfig,

    pub github: GitHubConfig,

    /// External image tool binaries
    pub tools: ToolsConfig,

    /// Identity recorded on version tags
    pub tagger: TagIdentity,

    /// Canonical artifact registry
    pub canonical: CanonicalConfig,
}

/// Remote endpoint with an optional bearer token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl EndpointConfig {
    pub fn endpoint_url(&self) -> anyhow::Result<Option<Url>> {
        self.endpoint
            .as_deref()
            .map(|raw| Url::parse(raw).with_context(|| format!("Invalid endpoint URL: {}", raw)))
            .transpose()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    pub api_url: String,
    pub web_url: String,
    /// Used when the event carries no installation token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
            web_url: "https://github.com".to_string(),
            token: None,
        }
    }
}

impl GitHubConfig {
    pub fn api_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.api_url)
            .with_context(|| format!("Invalid GitHub API URL: {}", self.api_url))
    }

    pub fn web_url(&self) -> anyhow::Result<Url> {
        Url::parse(&self.web_url)
            .with_context(|| format!("Invalid GitHub web URL: {}", self.web_url))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub container_diff: String,
    pub skopeo: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            container_diff: "container-diff".to_string(),
            skopeo: "skopeo".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalConfig {
    /// Destination of copied images; `{namespace}`, `{name}` and `{version}` are expanded
    pub image_template: String,
    pub credential: CanonicalCredential,
    /// Registries whose images are used in place
    pub registries: Vec<CanonicalRegistry>,
}

impl Default for CanonicalConfig {
    fn default() -> Self {
        Self {
            image_template: DEFAULT_IMAGE_TEMPLATE.to_string(),
            credential: CanonicalCredential::default(),
            registries: vec![CanonicalRegistry::default()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalCredential {
    pub server_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_account: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for CanonicalCredential {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_CANONICAL_HOST.to_string(),
            service_account: Some(DEFAULT_CANONICAL_ACCOUNT.to_string()),
            username: None,
            password: None,
        }
    }
}

impl CanonicalCredential {
    pub fn to_credential(&self) -> RegistryCredential {
        let r#type = [
            RegistryType::Ecr,
            RegistryType::Gcr,
            RegistryType::Ghcr,
            RegistryType::DockerHub,
        ]
        .into_iter()
        .find(|t| t.matches_host(&self.server_url))
        .unwrap_or(RegistryType::Other);

        let mut credential = RegistryCredential::new("canonical", r#type, &self.server_url);
        credential.username = self.username.clone();
        credential.password = self.password.clone();
        credential.service_account = self.service_account.clone();
        credential
    }
}

impl CanonicalConfig {
    pub fn publish_settings(&self) -> PublishSettings {
        PublishSettings {
            registries: self.registries.clone(),
            image_template: self.image_template.clone(),
            credential: self.credential.to_credential(),
        }
    }
}

impl SkillregConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.catalog.endpoint_url().context("Invalid [catalog] section")?;
        self.stream.endpoint_url().context("Invalid [stream] section")?;
        self.github.api_url().context("Invalid [github] section")?;
        self.github.web_url().context("Invalid [github] section")?;

        if self.tools.container_diff.trim().is_empty() || self.tools.skopeo.trim().is_empty() {
            anyhow::bail!("Tool binaries in [tools] must not be empty");
        }
        if self.canonical.image_template.trim().is_empty() {
            anyhow::bail!("canonical.image_template must not be empty");
        }
        for registry in &self.canonical.registries {
            if registry.host.trim().is_empty() {
                anyhow::bail!("Canonical registry host must not be empty");
            }
        }
        Ok(())
    }

    /// Copy with every secret replaced by a placeholder.
    pub fn redacted(&self) -> Self {
        const REDACTED: &str = "<redacted>";
        let hide = |secret: &Option<String>| secret.as_ref().map(|_| REDACTED.to_string());

        let mut config = self.clone();
        config.catalog.token = hide(&self.catalog.token);
        config.stream.token = hide(&self.stream.token);
        config.github.token = hide(&self.github.token);
        config.canonical.credential.password = hide(&self.canonical.credential.password);
        config
    }
}
