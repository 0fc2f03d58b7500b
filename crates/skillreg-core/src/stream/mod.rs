//! Deployment stream records emitted after registration.

use serde::Serialize;
use serde_json::{Value, json};
use url::Url;

use crate::http::HttpClient;
use crate::image::DockerImage;
use crate::skills::SkillDescriptor;

/// Stream newly registered skills are deployed to.
pub const DEFAULT_ENVIRONMENT: &str = "unstable";

const ARCHITECTURE: &str = "amd64";
const OS: &str = "linux";

/// Links a registered skill to the image it was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    pub host: String,
    pub repository: String,
    pub digest: Option<String>,
    pub environment: String,
    pub app_name: String,
    pub architecture: String,
    pub os: String,
}

impl DeploymentRecord {
    pub fn new(image: &DockerImage, descriptor: &SkillDescriptor) -> Self {
        Self {
            host: image.repository.host.clone(),
            repository: image.repository.name.clone(),
            digest: image.digest.clone(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            app_name: descriptor.qualified_name(),
            architecture: ARCHITECTURE.to_string(),
            os: OS.to_string(),
        }
    }

    /// Entities transacted for this record: the image repository and the
    /// stream entry referencing it.
    pub fn to_entities(&self) -> Value {
        json!([
            {
                "schema/entity-type": "docker/repository",
                "schema/entity": "$repository",
                "docker.repository/host": self.host,
                "docker.repository/repository": self.repository,
            },
            {
                "schema/entity-type": "deployment/stream",
                "docker.platform/architecture": self.architecture,
                "docker.platform/os": self.os,
                "docker.image/repository": "$repository",
                "image.recorded/digest": self.digest,
                "deployment.stream/name": self.environment,
                "deployment.stream/appname": self.app_name,
            }
        ])
    }
}

/// Destination of deployment records.
pub trait EventStream: Send + Sync {
    fn emit(&self, record: &DeploymentRecord) -> anyhow::Result<()>;
}

/// Posts records as JSON to an HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpEventStream {
    http: HttpClient,
    endpoint: Url,
    token: Option<String>,
}

impl HttpEventStream {
    pub fn new(http: HttpClient, endpoint: Url, token: Option<String>) -> Self {
        Self {
            http,
            endpoint,
            token,
        }
    }
}

impl EventStream for HttpEventStream {
    fn emit(&self, record: &DeploymentRecord) -> anyhow::Result<()> {
        let body = json!({ "entities": record.to_entities() });
        self.http
            .post_json(self.endpoint.as_str(), self.token.as_deref(), &body)?;
        tracing::debug!(app = %record.app_name, "Transacted deployment stream");
        Ok(())
    }
}

/// Logs records instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventStream;

impl EventStream for LogEventStream {
    fn emit(&self, record: &DeploymentRecord) -> anyhow::Result<()> {
        tracing::info!(
            app = %record.app_name,
            environment = %record.environment,
            digest = record.digest.as_deref().unwrap_or("-"),
            "Deployment stream record for {}/{}",
            record.host,
            record.repository
        );
        Ok(())
    }
}
