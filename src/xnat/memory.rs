use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde::Serialize;

use super::{
    RemoteExperiment, RemoteProject, RemoteScan, RemoteSubject, Resource, ResourceContainer, SessionKind,
    XnatApi,
};
use crate::error::{OptionExt, XnatError, XnatResult};

/// A file recorded by [`MemoryXnat::upload_file`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredFile {
    pub source: PathBuf,
    pub size: u64,
}

/// Number of containers held by a [`MemoryXnat`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContainerCounts {
    pub subjects: usize,
    pub experiments: usize,
    pub scans: usize,
    pub resources: usize,
}

#[derive(Debug, Default)]
struct State {
    projects: BTreeSet<String>,
    // Children are keyed by the uri of their parent.
    subjects: BTreeMap<String, Vec<RemoteSubject>>,
    experiments: BTreeMap<String, Vec<RemoteExperiment>>,
    scans: BTreeMap<String, Vec<RemoteScan>>,
    resources: BTreeMap<String, Vec<Resource>>,
    files: BTreeMap<String, BTreeMap<String, StoredFile>>,
    next_id: u64,
    uploads: usize,
    rejected_names: BTreeSet<String>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{:05}", prefix, self.next_id)
    }

    fn container_known(&self, uri: &str) -> bool {
        self.projects.iter().any(|p| RemoteProject::new(p.as_str()).uri == uri)
            || self.subjects.values().flatten().any(|s| s.uri == uri)
            || self.experiments.values().flatten().any(|e| e.uri == uri)
            || self.scans.values().flatten().any(|s| s.uri == uri)
    }
}

fn not_found(method: &str, uri: &str) -> XnatError {
    XnatError::Status {
        method: method.to_string(),
        uri: uri.to_string(),
        status: 404,
        body: "parent does not exist".into(),
    }
}

/// An in-process XNAT.
///
/// Behaves like the REST backend for everything the uploader does, which
/// makes it the target of dry runs: the run report then lists exactly what
/// a real upload would create.
#[derive(Debug, Default)]
pub struct MemoryXnat {
    state: Mutex<State>,
}

impl MemoryXnat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_project(id: &str) -> Self {
        let xnat = Self::new();
        xnat.add_project(id);
        xnat
    }

    pub fn add_project(&self, id: &str) {
        self.state().projects.insert(id.to_string());
    }

    /// Rejects every upload whose remote name is `name`.
    pub fn reject_uploads_named(self, name: &str) -> Self {
        self.state().rejected_names.insert(name.to_string());
        self
    }

    pub fn counts(&self) -> ContainerCounts {
        let st = self.state();
        ContainerCounts {
            subjects: st.subjects.values().map(Vec::len).sum(),
            experiments: st.experiments.values().map(Vec::len).sum(),
            scans: st.scans.values().map(Vec::len).sum(),
            resources: st.resources.values().map(Vec::len).sum(),
        }
    }

    /// Total number of successful `upload_file` calls, overwrites included.
    pub fn upload_count(&self) -> usize {
        self.state().uploads
    }

    /// Remote names stored in `resource`, sorted.
    pub fn files(&self, resource: &Resource) -> Vec<String> {
        self.state()
            .files
            .get(&resource.uri)
            .map(|f| f.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn stored_file(&self, resource: &Resource, remote_name: &str) -> Option<StoredFile> {
        self.state()
            .files
            .get(&resource.uri)
            .and_then(|f| f.get(remote_name))
            .cloned()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl XnatApi for MemoryXnat {
    async fn find_project(&self, id: &str) -> XnatResult<RemoteProject> {
        self.state()
            .projects
            .contains(id)
            .then(|| RemoteProject::new(id))
            .ok_or_project_not_found(id)
    }

    async fn list_subjects(&self, project: &RemoteProject) -> XnatResult<Vec<RemoteSubject>> {
        Ok(self.state().subjects.get(&project.uri).cloned().unwrap_or_default())
    }

    async fn list_experiments(&self, subject: &RemoteSubject) -> XnatResult<Vec<RemoteExperiment>> {
        Ok(self.state().experiments.get(&subject.uri).cloned().unwrap_or_default())
    }

    async fn list_scans(&self, experiment: &RemoteExperiment) -> XnatResult<Vec<RemoteScan>> {
        Ok(self.state().scans.get(&experiment.uri).cloned().unwrap_or_default())
    }

    async fn list_resources(&self, container: &dyn ResourceContainer) -> XnatResult<Vec<Resource>> {
        Ok(self.state().resources.get(container.uri()).cloned().unwrap_or_default())
    }

    async fn create_subject(&self, project: &RemoteProject, label: &str) -> XnatResult<RemoteSubject> {
        let mut st = self.state();
        if !st.projects.contains(&project.id) {
            return Err(not_found("PUT", &project.uri));
        }
        let subjects = st.subjects.get(&project.uri);
        if let Some(existing) = subjects.into_iter().flatten().find(|s| s.label == label) {
            return Ok(existing.clone());
        }
        let id = st.next_id("XNAT_S");
        let subject = RemoteSubject::new(project, id, label);
        st.subjects.entry(project.uri.clone()).or_default().push(subject.clone());
        Ok(subject)
    }

    async fn create_experiment(
        &self,
        subject: &RemoteSubject,
        label: &str,
        kind: SessionKind,
    ) -> XnatResult<RemoteExperiment> {
        let mut st = self.state();
        if !st.container_known(&subject.uri) {
            return Err(not_found("PUT", &subject.uri));
        }
        let experiments = st.experiments.get(&subject.uri);
        if let Some(existing) = experiments.into_iter().flatten().find(|e| e.label == label) {
            return Ok(existing.clone());
        }
        let id = st.next_id("XNAT_E");
        let experiment = RemoteExperiment::new(subject, id, label, Some(kind));
        st.experiments.entry(subject.uri.clone()).or_default().push(experiment.clone());
        Ok(experiment)
    }

    async fn create_scan(
        &self,
        experiment: &RemoteExperiment,
        sequence_id: u32,
        scan_type: &str,
        kind: SessionKind,
    ) -> XnatResult<RemoteScan> {
        let mut st = self.state();
        if !st.container_known(&experiment.uri) {
            return Err(not_found("PUT", &experiment.uri));
        }
        let scan = RemoteScan::new(experiment, sequence_id.to_string(), scan_type, Some(kind));
        let scans = st.scans.entry(experiment.uri.clone()).or_default();
        // PUT on an existing scan id updates it in place.
        match scans.iter_mut().find(|s| s.id == scan.id) {
            Some(existing) => *existing = scan.clone(),
            None => scans.push(scan.clone()),
        }
        Ok(scan)
    }

    async fn create_resource(&self, container: &dyn ResourceContainer, label: &str) -> XnatResult<Resource> {
        let mut st = self.state();
        if !st.container_known(container.uri()) {
            return Err(not_found("PUT", container.uri()));
        }
        let resource = Resource::new(container, label);
        let resources = st.resources.entry(container.uri().to_string()).or_default();
        if !resources.iter().any(|r| r.label == label) {
            resources.push(resource.clone());
        }
        Ok(resource)
    }

    async fn upload_file(&self, resource: &Resource, local_path: &Path, remote_name: &str) -> XnatResult<()> {
        let size = std::fs::metadata(local_path)
            .map_err(|e| XnatError::Upload {
                path: local_path.to_path_buf(),
                message: e.to_string(),
            })?
            .len();

        let mut st = self.state();
        if !st.resources.values().flatten().any(|r| r.uri == resource.uri) {
            return Err(not_found("PUT", &resource.file_uri(remote_name)));
        }
        if st.rejected_names.contains(remote_name) {
            return Err(XnatError::Upload {
                path: local_path.to_path_buf(),
                message: format!("upload of {} rejected", remote_name),
            });
        }
        st.files.entry(resource.uri.clone()).or_default().insert(
            remote_name.to_string(),
            StoredFile {
                source: local_path.to_path_buf(),
                size,
            },
        );
        st.uploads += 1;
        Ok(())
    }
}
