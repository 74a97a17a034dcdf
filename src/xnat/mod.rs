//! The XNAT object model and the capability set the uploader needs from it.
//!
//! Two backends implement [`XnatApi`]: [`XnatClient`] talks to a real server
//! over its REST API, [`MemoryXnat`] keeps everything in process for dry runs
//! and tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use globset::GlobSet;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::bids::matches_excludes;
use crate::error::{XnatError, XnatResult};

pub mod client;
pub mod memory;

pub use client::{Credentials, XnatClient};
pub use memory::MemoryXnat;

/// The XNAT data type family of an experiment and its scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Mr,
    Meg,
}

impl SessionKind {
    /// The session type used for a BIDS datatype, if XNAT has one for it.
    pub fn for_datatype(datatype: &str) -> Option<Self> {
        match datatype {
            "anat" | "dwi" => Some(SessionKind::Mr),
            "meg" => Some(SessionKind::Meg),
            _ => None,
        }
    }

    pub fn session_xsi_type(self) -> &'static str {
        match self {
            SessionKind::Mr => "xnat:mrSessionData",
            SessionKind::Meg => "xnat:megSessionData",
        }
    }

    pub fn scan_xsi_type(self) -> &'static str {
        match self {
            SessionKind::Mr => "xnat:mrScanData",
            SessionKind::Meg => "xnat:megScanData",
        }
    }

    /// Parses either a session or a scan xsi type.
    pub fn from_xsi_type(xsi_type: &str) -> Option<Self> {
        match xsi_type {
            "xnat:mrSessionData" | "xnat:mrScanData" => Some(SessionKind::Mr),
            "xnat:megSessionData" | "xnat:megScanData" => Some(SessionKind::Meg),
            _ => None,
        }
    }
}

/// Anything that can own resources. `uri` is the REST path below the server
/// root, unencoded, e.g. `/data/projects/P1/subjects/sub-01`.
pub trait ResourceContainer: Send + Sync {
    fn uri(&self) -> &str;
    fn describe(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteProject {
    pub id: String,
    pub uri: String,
}

impl RemoteProject {
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let uri = format!("/data/projects/{}", id);
        Self { id, uri }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSubject {
    pub id: String,
    pub label: String,
    pub uri: String,
}

impl RemoteSubject {
    pub fn new(project: &RemoteProject, id: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        let uri = format!("{}/subjects/{}", project.uri, label);
        Self { id: id.into(), label, uri }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteExperiment {
    pub id: String,
    pub label: String,
    pub kind: Option<SessionKind>,
    pub uri: String,
}

impl RemoteExperiment {
    pub fn new(
        subject: &RemoteSubject,
        id: impl Into<String>,
        label: impl Into<String>,
        kind: Option<SessionKind>,
    ) -> Self {
        let label = label.into();
        let uri = format!("{}/experiments/{}", subject.uri, label);
        Self { id: id.into(), label, kind, uri }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteScan {
    pub id: String,
    pub scan_type: String,
    pub kind: Option<SessionKind>,
    pub uri: String,
}

impl RemoteScan {
    pub fn new(
        experiment: &RemoteExperiment,
        id: impl Into<String>,
        scan_type: impl Into<String>,
        kind: Option<SessionKind>,
    ) -> Self {
        let id = id.into();
        let uri = format!("{}/scans/{}", experiment.uri, id);
        Self { id, scan_type: scan_type.into(), kind, uri }
    }
}

/// A labelled file folder attached to one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resource {
    pub label: String,
    pub uri: String,
}

impl Resource {
    pub fn new(container: &dyn ResourceContainer, label: impl Into<String>) -> Self {
        let label = label.into();
        let uri = format!("{}/resources/{}", container.uri(), label);
        Self { label, uri }
    }

    /// The REST path of a file stored in this resource.
    pub fn file_uri(&self, remote_name: &str) -> String {
        format!("{}/files/{}", self.uri, remote_name)
    }
}

impl ResourceContainer for RemoteProject {
    fn uri(&self) -> &str {
        &self.uri
    }
    fn describe(&self) -> String {
        format!("project {}", self.id)
    }
}

impl ResourceContainer for RemoteSubject {
    fn uri(&self) -> &str {
        &self.uri
    }
    fn describe(&self) -> String {
        format!("subject {}", self.label)
    }
}

impl ResourceContainer for RemoteExperiment {
    fn uri(&self) -> &str {
        &self.uri
    }
    fn describe(&self) -> String {
        format!("experiment {}", self.label)
    }
}

impl ResourceContainer for RemoteScan {
    fn uri(&self) -> &str {
        &self.uri
    }
    fn describe(&self) -> String {
        format!("scan {} ({})", self.id, self.scan_type)
    }
}

/// The remote operations the uploader relies on.
///
/// Listings are always read fresh from the backend; callers never cache
/// them. Creating something that already exists is the caller's mistake to
/// avoid, see [`crate::mapper`].
#[async_trait]
pub trait XnatApi: Send + Sync {
    async fn find_project(&self, id: &str) -> XnatResult<RemoteProject>;

    async fn list_subjects(&self, project: &RemoteProject) -> XnatResult<Vec<RemoteSubject>>;

    async fn list_experiments(&self, subject: &RemoteSubject) -> XnatResult<Vec<RemoteExperiment>>;

    async fn list_scans(&self, experiment: &RemoteExperiment) -> XnatResult<Vec<RemoteScan>>;

    async fn list_resources(&self, container: &dyn ResourceContainer) -> XnatResult<Vec<Resource>>;

    async fn create_subject(&self, project: &RemoteProject, label: &str) -> XnatResult<RemoteSubject>;

    async fn create_experiment(
        &self,
        subject: &RemoteSubject,
        label: &str,
        kind: SessionKind,
    ) -> XnatResult<RemoteExperiment>;

    async fn create_scan(
        &self,
        experiment: &RemoteExperiment,
        sequence_id: u32,
        scan_type: &str,
        kind: SessionKind,
    ) -> XnatResult<RemoteScan>;

    async fn create_resource(&self, container: &dyn ResourceContainer, label: &str) -> XnatResult<Resource>;

    /// Stores `local_path` as `remote_name` in `resource`, replacing any
    /// existing file of that name.
    async fn upload_file(&self, resource: &Resource, local_path: &Path, remote_name: &str) -> XnatResult<()>;

    /// Uploads every file below `local_path` one by one, keeping paths
    /// relative to it. Entries matching `excludes` are not descended into or
    /// uploaded. Returns the number of files uploaded; stops at the first
    /// failure.
    async fn upload_directory(
        &self,
        resource: &Resource,
        local_path: &Path,
        excludes: &GlobSet,
    ) -> XnatResult<usize> {
        let files = directory_files(local_path, excludes)?;
        for (path, remote_name) in &files {
            self.upload_file(resource, path, remote_name).await?;
        }
        Ok(files.len())
    }
}

/// All regular files below `dir` not matching `excludes`, paired with their
/// `/`-joined relative name.
fn directory_files(dir: &Path, excludes: &GlobSet) -> XnatResult<Vec<(PathBuf, String)>> {
    let mut out = Vec::new();
    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !matches_excludes(e.path(), excludes));
    for entry in walker {
        let entry = entry.map_err(|e| XnatError::Upload {
            path: dir.to_path_buf(),
            message: e.to_string(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let remote_name = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        out.push((entry.path().to_path_buf(), remote_name));
    }
    Ok(out)
}
