//! In-memory collaborators for pipeline tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use skillreg_core::catalog::Catalog;
use skillreg_core::context::RegistrationContext;
use skillreg_core::image::transport::image_cache_path;
use skillreg_core::image::{AuthSession, ImageTransport, RegistryCredential, TransportError};
use skillreg_core::skills::SkillDescriptor;
use skillreg_core::source::{GitRefTarget, RepoId, SourceControl, TagObject};
use skillreg_core::stream::{DeploymentRecord, EventStream};

pub type Files = Vec<(String, String)>;

pub fn files(entries: &[(&str, &str)]) -> Files {
    entries
        .iter()
        .map(|(path, contents)| (path.to_string(), contents.to_string()))
        .collect()
}

fn write_tree(root: &Path, files: &Files) {
    std::fs::create_dir_all(root).unwrap();
    for (relative, contents) in files {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}

/// Image transport that unpacks a fixed file tree.
#[derive(Default)]
pub struct FakeTransport {
    pub image_files: Files,
    pub rejected: HashSet<String>,
    pub fail_copy: bool,
    pub logins: Mutex<Vec<String>>,
    pub downloads: Mutex<Vec<String>>,
    pub copies: Mutex<Vec<(String, String)>>,
}

impl FakeTransport {
    pub fn with_files(image_files: Files) -> Self {
        Self {
            image_files,
            ..Default::default()
        }
    }

    pub fn copies(&self) -> Vec<(String, String)> {
        self.copies.lock().unwrap().clone()
    }

    pub fn logins(&self) -> Vec<String> {
        self.logins.lock().unwrap().clone()
    }
}

impl ImageTransport for FakeTransport {
    fn login(
        &self,
        credential: &RegistryCredential,
        _: &AuthSession,
    ) -> Result<(), TransportError> {
        self.logins.lock().unwrap().push(credential.id.clone());
        if self.rejected.contains(&credential.id) {
            return Err(TransportError::Authentication {
                registry: credential.server_url.clone(),
                message: "unauthorized".to_string(),
            });
        }
        Ok(())
    }

    fn download(
        &self,
        image: &str,
        _: &AuthSession,
        cache_dir: &Path,
    ) -> Result<PathBuf, TransportError> {
        self.downloads.lock().unwrap().push(image.to_string());
        let root = image_cache_path(cache_dir, image);
        write_tree(&root, &self.image_files);
        Ok(root)
    }

    fn copy(
        &self,
        source: &str,
        destination: &str,
        _: &AuthSession,
    ) -> Result<(), TransportError> {
        if self.fail_copy {
            return Err(TransportError::ToolFailed {
                tool: "skopeo".to_string(),
                operation: "copy".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "manifest unknown".to_string(),
            });
        }
        self.copies
            .lock()
            .unwrap()
            .push((source.to_string(), destination.to_string()));
        Ok(())
    }
}

/// Source host holding tags in memory and a fixed repository tree.
#[derive(Default)]
pub struct FakeSourceControl {
    pub repo_files: Files,
    pub tags: Vec<String>,
    pub refs: Mutex<HashMap<String, String>>,
    pub created_tags: Mutex<Vec<TagObject>>,
    pub tag_listings: Mutex<usize>,
    pub clones: Mutex<Vec<String>>,
    pub fail_tagging: bool,
}

impl FakeSourceControl {
    pub fn with_repo_files(repo_files: Files) -> Self {
        Self {
            repo_files,
            ..Default::default()
        }
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_ref(self, reference: &str, sha: &str) -> Self {
        self.refs
            .lock()
            .unwrap()
            .insert(reference.to_string(), sha.to_string());
        self
    }

    pub fn refs(&self) -> HashMap<String, String> {
        self.refs.lock().unwrap().clone()
    }

    pub fn created_tags(&self) -> Vec<TagObject> {
        self.created_tags.lock().unwrap().clone()
    }

    pub fn tag_listings(&self) -> usize {
        *self.tag_listings.lock().unwrap()
    }

    pub fn clones(&self) -> Vec<String> {
        self.clones.lock().unwrap().clone()
    }
}

impl SourceControl for FakeSourceControl {
    fn list_tags(&self, _: &RepoId) -> anyhow::Result<Vec<String>> {
        *self.tag_listings.lock().unwrap() += 1;
        Ok(self.tags.clone())
    }

    fn get_ref(&self, _: &RepoId, reference: &str) -> anyhow::Result<Option<GitRefTarget>> {
        let full = format!("refs/{}", reference);
        Ok(self.refs.lock().unwrap().get(&full).map(|sha| GitRefTarget {
            reference: full.clone(),
            sha: sha.clone(),
        }))
    }

    fn create_tag(&self, _: &RepoId, tag: &TagObject) -> anyhow::Result<String> {
        if self.fail_tagging {
            anyhow::bail!("Resource not accessible by integration");
        }
        self.created_tags.lock().unwrap().push(tag.clone());
        Ok(format!("tag-{}", tag.tag))
    }

    fn create_ref(&self, _: &RepoId, reference: &str, sha: &str) -> anyhow::Result<()> {
        self.refs
            .lock()
            .unwrap()
            .insert(reference.to_string(), sha.to_string());
        Ok(())
    }

    fn clone_at(&self, repo: &RepoId, dest: &Path) -> anyhow::Result<()> {
        self.clones
            .lock()
            .unwrap()
            .push(format!("{}@{}", repo.slug(), repo.sha));
        write_tree(dest, &self.repo_files);
        Ok(())
    }
}

/// Catalog recording every registered descriptor.
#[derive(Default)]
pub struct FakeCatalog {
    pub registered: Mutex<Vec<SkillDescriptor>>,
}

impl FakeCatalog {
    pub fn registered(&self) -> Vec<SkillDescriptor> {
        self.registered.lock().unwrap().clone()
    }
}

impl Catalog for FakeCatalog {
    fn register(&self, skill: &SkillDescriptor) -> anyhow::Result<()> {
        self.registered.lock().unwrap().push(skill.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStream {
    pub records: Mutex<Vec<DeploymentRecord>>,
}

impl FakeStream {
    pub fn records(&self) -> Vec<DeploymentRecord> {
        self.records.lock().unwrap().clone()
    }
}

impl EventStream for FakeStream {
    fn emit(&self, record: &DeploymentRecord) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Fakes wired into a registration context.
pub struct Harness {
    pub transport: Arc<FakeTransport>,
    pub source: Arc<FakeSourceControl>,
    pub catalog: Arc<FakeCatalog>,
    pub stream: Arc<FakeStream>,
    pub ctx: RegistrationContext,
}

impl Harness {
    pub fn new(transport: FakeTransport, source: FakeSourceControl) -> Self {
        let transport = Arc::new(transport);
        let source = Arc::new(source);
        let catalog = Arc::new(FakeCatalog::default());
        let stream = Arc::new(FakeStream::default());
        let ctx = RegistrationContext::new(
            transport.clone(),
            source.clone(),
            catalog.clone(),
            stream.clone(),
        )
        .unwrap();
        Self {
            transport,
            source,
            catalog,
            stream,
            ctx,
        }
    }
}
