//! Source repository model and the source-control seam.
//!
//! The registration workflow needs a handful of operations from the source
//! host: listing tags, reading and creating tag refs, and checking out the
//! repository at a commit.

pub mod github;

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use github::GitHubSourceControl;

/// Organization owning a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Org {
    pub name: String,
    #[serde(default)]
    pub installation_token: Option<String>,
}

/// Repository a commit belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRepo {
    pub source_id: String,
    pub name: String,
    pub org: Org,
}

/// Named ref pointing at a commit (e.g., a tag or branch).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRef {
    pub r#type: String,
    pub name: String,
}

impl CommitRef {
    pub fn tag(name: impl Into<String>) -> Self {
        Self {
            r#type: "tag".to_string(),
            name: name.into(),
        }
    }

    pub fn is_tag(&self) -> bool {
        self.r#type.eq_ignore_ascii_case("tag")
    }
}

/// Commit an image was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub repo: CommitRepo,
    #[serde(default)]
    pub refs: Vec<CommitRef>,
}

impl Commit {
    pub fn new(org: impl Into<String>, repo: impl Into<String>, sha: impl Into<String>) -> Self {
        let repo = repo.into();
        Self {
            sha: sha.into(),
            repo: CommitRepo {
                source_id: repo.clone(),
                name: repo,
                org: Org {
                    name: org.into(),
                    installation_token: None,
                },
            },
            refs: Vec::new(),
        }
    }

    pub fn with_ref(mut self, reference: CommitRef) -> Self {
        self.refs.push(reference);
        self
    }

    pub fn owner(&self) -> &str {
        &self.repo.org.name
    }

    pub fn repo_name(&self) -> &str {
        &self.repo.name
    }

    /// Repository coordinates for source-control calls.
    pub fn repo_id(&self) -> RepoId {
        RepoId {
            owner: self.repo.org.name.clone(),
            repo: self.repo.name.clone(),
            sha: self.sha.clone(),
            token: self.repo.org.installation_token.clone(),
        }
    }
}

/// Owner/repo/sha coordinates plus the token to act with.
#[derive(Clone, PartialEq, Eq)]
pub struct RepoId {
    pub owner: String,
    pub repo: String,
    pub sha: String,
    pub token: Option<String>,
}

impl RepoId {
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

impl std::fmt::Debug for RepoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepoId")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("sha", &self.sha)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Ref as reported by the source host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRefTarget {
    /// Fully-qualified ref name (e.g., "refs/tags/1.0.0")
    pub reference: String,
    /// Object the ref points to
    pub sha: String,
}

/// Identity recorded on created tags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tagger {
    pub name: String,
    pub email: String,
    pub date: DateTime<Utc>,
}

/// Annotated tag object to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagObject {
    pub tag: String,
    pub message: String,
    pub object: String,
    pub r#type: String,
    pub tagger: Tagger,
}

/// Operations against the repository's source host.
pub trait SourceControl: Send + Sync {
    /// All tag names of the repository.
    fn list_tags(&self, repo: &RepoId) -> anyhow::Result<Vec<String>>;

    /// Look up a ref such as `tags/1.0.0`; `None` when it does not exist.
    fn get_ref(&self, repo: &RepoId, reference: &str) -> anyhow::Result<Option<GitRefTarget>>;

    /// Create an annotated tag object, returning its sha.
    fn create_tag(&self, repo: &RepoId, tag: &TagObject) -> anyhow::Result<String>;

    /// Create a fully-qualified ref (e.g., `refs/tags/1.0.0`) pointing at `sha`.
    fn create_ref(&self, repo: &RepoId, reference: &str, sha: &str) -> anyhow::Result<()>;

    /// Check out the repository at `repo.sha` into `dest`.
    fn clone_at(&self, repo: &RepoId, dest: &Path) -> anyhow::Result<()>;
}
