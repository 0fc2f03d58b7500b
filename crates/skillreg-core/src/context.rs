//! Registration context: configuration plus collaborator handles.

use std::sync::Arc;

use url::Url;

use crate::catalog::{Catalog, GraphqlCatalog, TagIdentity};
use crate::config::SkillregConfig;
use crate::http::HttpClient;
use crate::image::{CliImageTransport, ImageTransport};
use crate::publish::{ArtifactCache, PublishSettings};
use crate::source::{GitHubSourceControl, SourceControl};
use crate::stream::{EventStream, HttpEventStream, LogEventStream};

/// Everything a registration needs besides the event itself.
///
/// Frontends create this once and hand it to the pipeline. The artifact
/// cache is shared by every registration run against the same context.
#[derive(Clone)]
pub struct RegistrationContext {
    transport: Arc<dyn ImageTransport>,
    source_control: Arc<dyn SourceControl>,
    catalog: Arc<dyn Catalog>,
    stream: Arc<dyn EventStream>,
    cache: Arc<ArtifactCache>,
    publish: PublishSettings,
    tagger: TagIdentity,
    web_url: Url,
}

impl RegistrationContext {
    /// Context over explicit collaborators with default settings.
    pub fn new(
        transport: Arc<dyn ImageTransport>,
        source_control: Arc<dyn SourceControl>,
        catalog: Arc<dyn Catalog>,
        stream: Arc<dyn EventStream>,
    ) -> anyhow::Result<Self> {
        let config = SkillregConfig::default();
        Ok(Self {
            transport,
            source_control,
            catalog,
            stream,
            cache: Arc::new(ArtifactCache::new()),
            publish: config.canonical.publish_settings(),
            tagger: config.tagger,
            web_url: config.github.web_url()?,
        })
    }

    /// Production context built from configuration.
    pub fn from_config(config: &SkillregConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let http = HttpClient::new()?;

        let transport = CliImageTransport::new(&config.tools.skopeo, &config.tools.container_diff);
        let source_control = GitHubSourceControl::new(
            http.clone(),
            config.github.api_url()?,
            config.github.web_url()?,
            config.github.token.clone(),
        );
        let catalog = GraphqlCatalog::new(
            http.clone(),
            config.catalog.endpoint_url()?,
            config.catalog.token.clone(),
        );
        let stream: Arc<dyn EventStream> = match config.stream.endpoint_url()? {
            Some(endpoint) => Arc::new(HttpEventStream::new(
                http,
                endpoint,
                config.stream.token.clone(),
            )),
            None => {
                tracing::debug!("No stream endpoint configured, logging deployment records");
                Arc::new(LogEventStream)
            }
        };

        Ok(Self {
            transport: Arc::new(transport),
            source_control: Arc::new(source_control),
            catalog: Arc::new(catalog),
            stream,
            cache: Arc::new(ArtifactCache::new()),
            publish: config.canonical.publish_settings(),
            tagger: config.tagger.clone(),
            web_url: config.github.web_url()?,
        })
    }

    pub fn with_cache(mut self, cache: Arc<ArtifactCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_publish_settings(mut self, publish: PublishSettings) -> Self {
        self.publish = publish;
        self
    }

    pub fn with_tagger(mut self, tagger: TagIdentity) -> Self {
        self.tagger = tagger;
        self
    }

    pub fn with_web_url(mut self, web_url: Url) -> Self {
        self.web_url = web_url;
        self
    }

    pub fn transport(&self) -> &dyn ImageTransport {
        self.transport.as_ref()
    }

    pub fn source_control(&self) -> &dyn SourceControl {
        self.source_control.as_ref()
    }

    pub fn catalog(&self) -> &dyn Catalog {
        self.catalog.as_ref()
    }

    pub fn stream(&self) -> &dyn EventStream {
        self.stream.as_ref()
    }

    pub fn cache(&self) -> &ArtifactCache {
        &self.cache
    }

    pub fn publish_settings(&self) -> &PublishSettings {
        &self.publish
    }

    pub fn tagger(&self) -> &TagIdentity {
        &self.tagger
    }

    pub fn web_url(&self) -> &Url {
        &self.web_url
    }
}
