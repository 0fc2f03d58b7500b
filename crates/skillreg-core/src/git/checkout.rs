//! Clone a repository and detach HEAD at a specific commit.

use std::path::Path;

use anyhow::Context;
use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{Cred, FetchOptions, Oid, RemoteCallbacks, Repository};

/// Clone `url` into `dest` and check out `sha` with a detached HEAD.
///
/// When a token is given it is presented as the HTTPS password. A commit
/// not reachable from the cloned branches is fetched explicitly.
pub fn clone_at(url: &str, token: Option<&str>, sha: &str, dest: &Path) -> anyhow::Result<()> {
    tracing::debug!("Cloning {} at {}", url, sha);
    let repo = RepoBuilder::new()
        .fetch_options(fetch_options(token))
        .clone(url, dest)
        .with_context(|| format!("Failed to clone {}", url))?;

    let oid = Oid::from_str(sha).with_context(|| format!("Invalid commit sha: {}", sha))?;
    if repo.find_commit(oid).is_err() {
        fetch_commit(&repo, token, sha)?;
    }
    let commit = repo
        .find_commit(oid)
        .with_context(|| format!("Commit {} not found in {}", sha, url))?;

    repo.checkout_tree(commit.as_object(), Some(CheckoutBuilder::new().force()))
        .with_context(|| format!("Failed to check out {}", sha))?;
    repo.set_head_detached(commit.id())
        .with_context(|| format!("Failed to detach HEAD at {}", sha))?;
    Ok(())
}

fn fetch_commit(repo: &Repository, token: Option<&str>, sha: &str) -> anyhow::Result<()> {
    let mut remote = repo
        .find_remote("origin")
        .context("Cloned repository has no 'origin' remote")?;
    remote
        .fetch(&[sha], Some(&mut fetch_options(token)), None)
        .with_context(|| format!("Failed to fetch commit {}", sha))?;
    Ok(())
}

fn fetch_options(token: Option<&str>) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();
    if let Some(token) = token {
        let token = token.to_string();
        callbacks.credentials(move |_url, _user, _allowed| {
            Cred::userpass_plaintext("x-access-token", &token)
        });
    }
    let mut options = FetchOptions::new();
    options.remote_callbacks(callbacks);
    options
}
