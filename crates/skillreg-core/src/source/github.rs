//! GitHub implementation of the source-control seam.
//!
//! Uses the REST API for tags and refs, and `git2` for checkouts.

use std::path::Path;

use anyhow::Context;
use serde_json::{Value, json};
use url::Url;

use super::{GitRefTarget, RepoId, SourceControl, TagObject};
use crate::git;
use crate::http::HttpClient;

const TAGS_PER_PAGE: usize = 100;

/// Source control backed by the GitHub REST API.
#[derive(Debug, Clone)]
pub struct GitHubSourceControl {
    http: HttpClient,
    api_url: Url,
    clone_base: Url,
    fallback_token: Option<String>,
}

impl GitHubSourceControl {
    pub fn new(
        http: HttpClient,
        api_url: Url,
        clone_base: Url,
        fallback_token: Option<String>,
    ) -> Self {
        Self {
            http,
            api_url,
            clone_base,
            fallback_token,
        }
    }

    fn token<'a>(&'a self, repo: &'a RepoId) -> Option<&'a str> {
        repo.token.as_deref().or(self.fallback_token.as_deref())
    }

    fn repo_url(&self, repo: &RepoId, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_url.as_str().trim_end_matches('/'),
            repo.owner,
            repo.repo,
            path
        )
    }

    /// HTTPS clone URL of the repository.
    pub fn clone_url(&self, repo: &RepoId) -> String {
        format!(
            "{}/{}/{}.git",
            self.clone_base.as_str().trim_end_matches('/'),
            repo.owner,
            repo.repo
        )
    }
}

impl SourceControl for GitHubSourceControl {
    fn list_tags(&self, repo: &RepoId) -> anyhow::Result<Vec<String>> {
        let mut tags = Vec::new();
        for page in 1.. {
            let url = self.repo_url(
                repo,
                &format!("tags?per_page={}&page={}", TAGS_PER_PAGE, page),
            );
            let body = self
                .http
                .get_json(&url, self.token(repo))
                .with_context(|| format!("Failed to list tags of {}", repo.slug()))?
                .ok_or_else(|| anyhow::anyhow!("Repository not found: {}", repo.slug()))?;
            let names = tag_names(&body);
            let count = names.len();
            tags.extend(names);
            if count < TAGS_PER_PAGE {
                break;
            }
        }
        Ok(tags)
    }

    fn get_ref(&self, repo: &RepoId, reference: &str) -> anyhow::Result<Option<GitRefTarget>> {
        let url = self.repo_url(repo, &format!("git/ref/{}", reference));
        let body = self
            .http
            .get_json(&url, self.token(repo))
            .with_context(|| format!("Failed to read ref {} of {}", reference, repo.slug()))?;
        Ok(body.as_ref().and_then(parse_ref))
    }

    fn create_tag(&self, repo: &RepoId, tag: &TagObject) -> anyhow::Result<String> {
        let url = self.repo_url(repo, "git/tags");
        let body = serde_json::to_value(tag).context("Failed to serialize tag object")?;
        let response = self
            .http
            .post_json(&url, self.token(repo), &body)
            .with_context(|| format!("Failed to create tag {} on {}", tag.tag, repo.slug()))?;
        response
            .get("sha")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow::anyhow!("Tag creation response is missing 'sha'"))
    }

    fn create_ref(&self, repo: &RepoId, reference: &str, sha: &str) -> anyhow::Result<()> {
        let url = self.repo_url(repo, "git/refs");
        self.http
            .post_json(
                &url,
                self.token(repo),
                &json!({ "ref": reference, "sha": sha }),
            )
            .with_context(|| format!("Failed to create ref {} on {}", reference, repo.slug()))?;
        Ok(())
    }

    fn clone_at(&self, repo: &RepoId, dest: &Path) -> anyhow::Result<()> {
        let url = self.clone_url(repo);
        git::clone_at(&url, self.token(repo), &repo.sha, dest)
    }
}

fn tag_names(body: &Value) -> Vec<String> {
    body.as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|t| t.get("name").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_ref(body: &Value) -> Option<GitRefTarget> {
    let reference = body.get("ref")?.as_str()?;
    let sha = body.get("object")?.get("sha")?.as_str()?;
    Some(GitRefTarget {
        reference: reference.to_string(),
        sha: sha.to_string(),
    })
}
