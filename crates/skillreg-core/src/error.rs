//! Registration failure taxonomy.

use crate::image::TransportError;
use crate::skills::DescriptorError;

/// Why a registration stopped.
///
/// Every variant is fatal for the invocation; recoverable conditions
/// (ambiguous versions, existing tags, malformed labels) never surface here.
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("failed to download image {image}: {source}")]
    Download {
        image: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to copy image for {skill}: {source}")]
    Copy {
        skill: String,
        #[source]
        source: TransportError,
    },

    #[error("failed to check out {repo}: {source}")]
    Checkout {
        repo: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("failed to resolve version: {0}")]
    Version(#[source] anyhow::Error),

    #[error("failed to inline resources for {skill}: {source}")]
    Resources {
        skill: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to register {skill} in the catalog: {source}")]
    Catalog {
        skill: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to record deployment stream for {skill}: {source}")]
    Stream {
        skill: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("scratch directory unavailable: {0}")]
    Scratch(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RegistrationError>;
