//! Downloads an image's file system using the best-ranked working credential.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::{
    AuthSession, DockerImage, ImageTransport, RegistryCredential, TransportError,
    rank_credentials,
};

/// Image file system unpacked into a scratch directory.
///
/// The scratch directory is removed when this value is dropped.
#[derive(Debug)]
pub struct DownloadedImage {
    scratch: TempDir,
    root: PathBuf,
    credential: Option<RegistryCredential>,
}

impl DownloadedImage {
    /// Root of the image file system.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Credential that authenticated the download, if any.
    pub fn credential(&self) -> Option<&RegistryCredential> {
        self.credential.as_ref()
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }
}

/// Selects a credential for an image and downloads its contents.
pub struct ImageLocator<'a> {
    transport: &'a dyn ImageTransport,
}

impl<'a> ImageLocator<'a> {
    pub fn new(transport: &'a dyn ImageTransport) -> Self {
        Self { transport }
    }

    /// Download `image`, trying ranked credentials until one authenticates.
    ///
    /// Authentication failures move on to the next candidate; any other
    /// failure aborts. With no candidates the download is anonymous.
    pub fn download(
        &self,
        image: &DockerImage,
        credentials: &[RegistryCredential],
    ) -> Result<DownloadedImage, TransportError> {
        let scratch = TempDir::new()?;
        let cache_dir = scratch.path().join("cache");
        std::fs::create_dir_all(&cache_dir)?;
        let image_name = image.full_name();

        if credentials.is_empty() {
            let session = AuthSession::create(scratch.path().join("auth"))?;
            let root = self.transport.download(&image_name, &session, &cache_dir)?;
            return Ok(DownloadedImage {
                scratch,
                root,
                credential: None,
            });
        }

        for (index, credential) in rank_credentials(image.host(), credentials)
            .into_iter()
            .enumerate()
        {
            let session = AuthSession::create(scratch.path().join(format!("auth-{}", index)))?;
            match self.transport.login(&credential, &session) {
                Ok(()) => {}
                Err(err) if err.is_authentication() => {
                    tracing::warn!(
                        registry = %credential.server_url,
                        id = %credential.id,
                        "Skipping registry credential: {}",
                        err
                    );
                    continue;
                }
                Err(err) => return Err(err),
            }
            tracing::debug!(id = %credential.id, "Selected registry credential");
            let root = self.transport.download(&image_name, &session, &cache_dir)?;
            return Ok(DownloadedImage {
                scratch,
                root,
                credential: Some(credential),
            });
        }

        Err(TransportError::NoUsableCredential(image_name))
    }
}
