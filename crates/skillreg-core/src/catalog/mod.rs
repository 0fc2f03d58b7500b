//! Skill catalog seam and its GraphQL implementation.

mod registrar;

use anyhow::Context;
use serde_json::{Value, json};
use url::Url;

use crate::http::HttpClient;
use crate::skills::SkillDescriptor;

pub use registrar::{CatalogRegistrar, TagIdentity, TagOutcome};

/// Mutation upserting a skill into the catalog.
pub const REGISTER_SKILL_MUTATION: &str = r#"mutation registerSkill($skill: AtomistSkillInput!) {
  registerSkill(skill: $skill) {
    id
  }
}"#;

/// Central skill catalog.
pub trait Catalog: Send + Sync {
    /// Register (or re-register) a finished descriptor.
    fn register(&self, skill: &SkillDescriptor) -> anyhow::Result<()>;
}

/// Catalog reached through a GraphQL endpoint.
#[derive(Debug, Clone)]
pub struct GraphqlCatalog {
    http: HttpClient,
    endpoint: Option<Url>,
    token: Option<String>,
}

impl GraphqlCatalog {
    pub fn new(http: HttpClient, endpoint: Option<Url>, token: Option<String>) -> Self {
        Self {
            http,
            endpoint,
            token,
        }
    }
}

/// Request body for registering `skill`.
pub fn register_request(skill: &SkillDescriptor) -> anyhow::Result<Value> {
    let skill = serde_json::to_value(skill).context("Failed to serialize skill descriptor")?;
    Ok(json!({
        "query": REGISTER_SKILL_MUTATION,
        "variables": { "skill": skill },
    }))
}

/// GraphQL errors reported in a response body, joined into one message.
fn graphql_errors(body: &Value) -> Option<String> {
    let errors = body.get("errors")?.as_array()?;
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .map(|e| {
                e.get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| e.to_string())
            })
            .collect::<Vec<_>>()
            .join("; "),
    )
}

impl Catalog for GraphqlCatalog {
    fn register(&self, skill: &SkillDescriptor) -> anyhow::Result<()> {
        let endpoint = self
            .endpoint
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No catalog endpoint configured"))?;
        let body = register_request(skill)?;
        let response = self
            .http
            .post_json(endpoint.as_str(), self.token.as_deref(), &body)?;
        if let Some(errors) = graphql_errors(&response) {
            anyhow::bail!("Catalog rejected {}: {}", skill.qualified_name(), errors);
        }
        tracing::debug!(skill = %skill.qualified_name(), "Catalog accepted skill");
        Ok(())
    }
}
