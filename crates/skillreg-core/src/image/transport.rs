//! Image transport: registry login, image download and image copy.
//!
//! The production transport shells out to `skopeo` for login and copy and
//! to `container-diff` for downloading an image's file system. Exit code 0
//! is success; anything else is a transport error carrying stderr.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use super::RegistryCredential;

/// Errors raised while talking to container registries.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("authentication failed for registry {registry}: {message}")]
    Authentication { registry: String, message: String },

    #[error("no registry credential could authenticate for image {0}")]
    NoUsableCredential(String),

    #[error("{tool} {operation} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        operation: String,
        status: String,
        stderr: String,
    },

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether trying the next credential could help.
    pub fn is_authentication(&self) -> bool {
        matches!(self, TransportError::Authentication { .. })
    }
}

/// Isolated registry login state for one operation.
#[derive(Debug, Clone)]
pub struct AuthSession {
    dir: PathBuf,
}

impl AuthSession {
    /// Create a session rooted at `dir`, creating the directory.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, TransportError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Directory usable as `DOCKER_CONFIG`.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Registry auth file written by logins.
    pub fn auth_file(&self) -> PathBuf {
        self.dir.join("config.json")
    }

    fn has_auth_file(&self) -> bool {
        self.auth_file().exists()
    }
}

/// Operations the registration workflow needs from an image tool.
pub trait ImageTransport: Send + Sync {
    /// Log in to the credential's registry, recording auth in the session.
    fn login(
        &self,
        credential: &RegistryCredential,
        session: &AuthSession,
    ) -> Result<(), TransportError>;

    /// Download the file system of `image` below `cache_dir`, returning the image root.
    fn download(
        &self,
        image: &str,
        session: &AuthSession,
        cache_dir: &Path,
    ) -> Result<PathBuf, TransportError>;

    /// Copy `source` to `destination` registry-to-registry.
    fn copy(
        &self,
        source: &str,
        destination: &str,
        session: &AuthSession,
    ) -> Result<(), TransportError>;
}

/// Image transport backed by the `skopeo` and `container-diff` CLIs.
#[derive(Debug, Clone)]
pub struct CliImageTransport {
    skopeo: String,
    container_diff: String,
}

impl CliImageTransport {
    pub fn new(skopeo: impl Into<String>, container_diff: impl Into<String>) -> Self {
        Self {
            skopeo: skopeo.into(),
            container_diff: container_diff.into(),
        }
    }

    fn run(
        &self,
        mut cmd: Command,
        tool: &str,
        operation: &str,
        stdin: Option<&str>,
    ) -> Result<(), TransportError> {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        if stdin.is_some() {
            cmd.stdin(Stdio::piped());
        }
        let mut child = cmd.spawn().map_err(|source| TransportError::Spawn {
            tool: tool.to_string(),
            source,
        })?;
        if let Some(input) = stdin
            && let Some(mut pipe) = child.stdin.take()
        {
            pipe.write_all(input.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(TransportError::ToolFailed {
                tool: tool.to_string(),
                operation: operation.to_string(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for CliImageTransport {
    fn default() -> Self {
        Self::new("skopeo", "container-diff")
    }
}

impl ImageTransport for CliImageTransport {
    fn login(
        &self,
        credential: &RegistryCredential,
        session: &AuthSession,
    ) -> Result<(), TransportError> {
        if credential.is_anonymous() {
            tracing::debug!(registry = %credential.server_url, "Using anonymous access");
            return Ok(());
        }
        let mut cmd = Command::new(&self.skopeo);
        cmd.arg("login")
            .arg("--authfile")
            .arg(session.auth_file())
            .args(["--username", credential.login_user(), "--password-stdin"])
            .arg(&credential.server_url);
        let password = credential.password.as_deref().unwrap_or_default();
        self.run(cmd, &self.skopeo, "login", Some(password))
            .map_err(|err| match err {
                TransportError::ToolFailed { stderr, .. } => TransportError::Authentication {
                    registry: credential.server_url.clone(),
                    message: stderr,
                },
                other => other,
            })
    }

    fn download(
        &self,
        image: &str,
        session: &AuthSession,
        cache_dir: &Path,
    ) -> Result<PathBuf, TransportError> {
        tracing::info!("Downloading image {}", image);
        let mut cmd = Command::new(&self.container_diff);
        cmd.args(["analyze", "--type=file", image])
            .env("CONTAINER_DIFF_CACHEDIR", cache_dir)
            .env("DOCKER_CONFIG", session.dir());
        self.run(cmd, &self.container_diff, "analyze", None)?;
        tracing::info!("Successfully downloaded image");
        Ok(image_cache_path(cache_dir, image))
    }

    fn copy(
        &self,
        source: &str,
        destination: &str,
        session: &AuthSession,
    ) -> Result<(), TransportError> {
        tracing::info!("Copying image {} to {}", source, destination);
        let mut cmd = Command::new(&self.skopeo);
        cmd.arg("copy");
        if session.has_auth_file() {
            cmd.arg("--authfile").arg(session.auth_file());
        }
        cmd.arg(format!("docker://{}", source))
            .arg(format!("docker://{}", destination));
        self.run(cmd, &self.skopeo, "copy", None)?;
        tracing::info!("Successfully copied image to {}", destination);
        Ok(())
    }
}

/// Location of an image's unpacked file system in the container-diff cache.
pub fn image_cache_path(cache_dir: &Path, image: &str) -> PathBuf {
    cache_dir
        .join(".container-diff")
        .join("cache")
        .join(image.replace('/', "").replace(':', "_"))
}
