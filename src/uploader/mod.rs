use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use globset::GlobSet;
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::bids::{self, classify, entry_name, list_directory, resolve_scan_type, Depth, Role};
use crate::config::BidsConfig;
use crate::error::{UploadError, XnatResult};
use crate::mapper::{self, BIDS_RESOURCE};
use crate::metrics::{Metrics, MetricsSnapshot};
use crate::types::{Stage, TraversalContext, UploadFailure};
use crate::xnat::{RemoteExperiment, RemoteProject, RemoteSubject, Resource, ResourceContainer, XnatApi};

/// Outcome of a complete run.
#[derive(Debug, Clone, Serialize)]
pub struct UploadReport {
    pub run_id: Uuid,
    pub project: String,
    pub root: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub totals: MetricsSnapshot,
    pub failures: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Uploads the BIDS dataset at `root` into `project`.
///
/// Fails only when the dataset cannot be read or holds no subject folders;
/// everything that goes wrong below that is recorded in the report and the
/// walk moves on to the next entry.
pub async fn run_upload(
    xnat: &dyn XnatApi,
    project: &RemoteProject,
    root: &Path,
    cfg: &BidsConfig,
) -> Result<UploadReport, UploadError> {
    let run_id = Uuid::new_v4();
    let started_at = Utc::now();
    let excludes = bids::build_excludes(&cfg.excludes)?;

    let entries = list_directory(root, &excludes).map_err(|source| UploadError::Unreadable {
        path: root.to_path_buf(),
        source,
    })?;
    if !bids::has_subject_folders(&entries, cfg) {
        return Err(UploadError::NoSubjects(root.to_path_buf()));
    }

    let mut uploader = Uploader {
        xnat,
        project,
        cfg,
        excludes,
        metrics: Metrics::new(),
        failures: Vec::new(),
    };

    let span = info_span!("upload", %run_id, project = %project.id);
    async {
        info!(root = %root.display(), entries = entries.len(), "Starting upload");
        for path in &entries {
            uploader.process_top_level(root, path).await;
        }
    }
    .instrument(span)
    .await;

    let totals = uploader.metrics.get_snapshot();
    info!(
        %run_id,
        files = totals.files_uploaded,
        failures = totals.failures,
        "Upload finished"
    );
    Ok(UploadReport {
        run_id,
        project: project.id.clone(),
        root: root.to_string_lossy().to_string(),
        started_at,
        finished_at: Utc::now(),
        totals,
        failures: uploader.failures,
    })
}

struct Uploader<'a> {
    xnat: &'a dyn XnatApi,
    project: &'a RemoteProject,
    cfg: &'a BidsConfig,
    excludes: GlobSet,
    metrics: Metrics,
    failures: Vec<UploadFailure>,
}

impl Uploader<'_> {
    fn record(&mut self, stage: Stage, path: &Path, err: impl fmt::Display) {
        warn!(stage = %stage, path = %path.display(), "{}", err);
        self.metrics.inc_failures();
        self.failures.push(UploadFailure::new(stage, path, err));
    }

    fn skip(&self, path: &Path, reason: &str) {
        debug!(path = %path.display(), reason, "Skipping entry");
        self.metrics.inc_entries_skipped();
    }

    fn list(&mut self, dir: &Path, stage: Stage) -> Vec<PathBuf> {
        match list_directory(dir, &self.excludes) {
            Ok(entries) => entries,
            Err(e) => {
                self.record(stage, dir, e);
                Vec::new()
            }
        }
    }

    async fn resource(&self, container: &dyn ResourceContainer, label: &str) -> XnatResult<Resource> {
        let ensured = mapper::ensure_resource(self.xnat, container, label).await?;
        if ensured.was_created() {
            self.metrics.inc_resources_created();
        }
        Ok(ensured.into_inner())
    }

    async fn put_file(
        &self,
        container: &dyn ResourceContainer,
        label: &str,
        local: &Path,
        remote_name: &str,
    ) -> XnatResult<()> {
        let resource = self.resource(container, label).await?;
        info!(source = %local.display(), target = %resource.file_uri(remote_name), "Uploading file");
        self.xnat.upload_file(&resource, local, remote_name).await?;
        self.metrics.add_files_uploaded(1);
        Ok(())
    }

    async fn put_directory(&self, container: &dyn ResourceContainer, label: &str, local: &Path) -> XnatResult<()> {
        let resource = self.resource(container, label).await?;
        info!(source = %local.display(), target = %resource.uri, "Uploading directory");
        let count = self.xnat.upload_directory(&resource, local, &self.excludes).await?;
        self.metrics.add_files_uploaded(count as u64);
        self.metrics.inc_directories_uploaded();
        Ok(())
    }

    async fn process_top_level(&mut self, root: &Path, path: &Path) {
        let Some(name) = entry_name(path) else {
            self.skip(path, "non UTF-8 name");
            return;
        };
        let ctx = TraversalContext::new(root, name);
        let project = self.project;

        match classify(path, Depth::Top, self.cfg) {
            Some(Role::ProjectResourceFile) => {
                let local = ctx.local_path();
                if let Err(e) = self.put_file(project, BIDS_RESOURCE, &local, &ctx.entry).await {
                    self.record(Stage::ProjectFile, &local, e);
                }
            }
            Some(Role::ProjectResourceDir) => {
                let local = ctx.local_path();
                if let Err(e) = self.put_directory(project, &ctx.entry, &local).await {
                    self.record(Stage::ProjectDirectory, &local, e);
                }
            }
            Some(Role::Subject) => {
                if let Some(subject) = self.subject(&ctx).await {
                    self.process_subject(&subject, &ctx).await;
                }
            }
            _ => self.skip(path, "not a file or directory"),
        }
    }

    async fn subject(&mut self, ctx: &TraversalContext) -> Option<RemoteSubject> {
        match mapper::ensure_subject(self.xnat, self.project, &ctx.entry).await {
            Ok(ensured) => {
                if ensured.was_created() {
                    info!(subject = %ctx.entry, "Created subject");
                    self.metrics.inc_subjects_created();
                }
                Some(ensured.into_inner())
            }
            Err(e) => {
                self.record(Stage::SubjectCreate, &ctx.entry_path(), e);
                None
            }
        }
    }

    async fn process_subject(&mut self, subject: &RemoteSubject, ctx: &TraversalContext) {
        for path in self.list(&ctx.entry_path(), Stage::SubjectDirectory) {
            let Some(name) = entry_name(&path) else {
                self.skip(&path, "non UTF-8 name");
                continue;
            };

            match classify(&path, Depth::Subject, self.cfg) {
                Some(Role::SubjectFile) => {
                    let file_ctx = ctx.with_file(name);
                    let local = file_ctx.local_path();
                    if let Err(e) = self.put_file(subject, BIDS_RESOURCE, &local, name).await {
                        self.record(Stage::SubjectFile, &local, e);
                    }
                }
                Some(Role::SubjectResourceDir) => {
                    if let Err(e) = self.put_directory(subject, name, &path).await {
                        self.record(Stage::SubjectDirectory, &path, e);
                    }
                }
                Some(Role::DatatypeDir) => {
                    self.process_datatype(subject, &ctx.with_datatype(name)).await;
                }
                Some(Role::SessionDir) => {
                    self.process_session(subject, &ctx.with_session(name)).await;
                }
                _ => self.skip(&path, "not a file or directory"),
            }
        }
    }

    async fn process_session(&mut self, subject: &RemoteSubject, ctx: &TraversalContext) {
        for path in self.list(&ctx.folder_path(), Stage::SubjectDirectory) {
            match (classify(&path, Depth::Session, self.cfg), entry_name(&path)) {
                (Some(Role::DatatypeDir), Some(name)) => {
                    self.process_datatype(subject, &ctx.with_datatype(name)).await;
                }
                _ => self.skip(&path, "not a configured datatype folder"),
            }
        }
    }

    /// Handles one datatype folder: all scans are created before any file
    /// of the folder is uploaded.
    async fn process_datatype(&mut self, subject: &RemoteSubject, ctx: &TraversalContext) {
        let Some(experiment) = self.experiment(subject, ctx).await else {
            return;
        };

        let mut scan_files: Vec<(TraversalContext, String)> = Vec::new();
        for path in self.list(&ctx.folder_path(), Stage::ScanFile) {
            match (classify(&path, Depth::Datatype, self.cfg), entry_name(&path)) {
                (Some(Role::ScanFile), Some(name)) => {
                    let file_ctx = ctx.with_file(name);
                    match resolve_scan_type(name, &self.cfg.session_marker) {
                        Ok(scan_type) => {
                            self.scan(&experiment, &scan_type, &file_ctx).await;
                            scan_files.push((file_ctx, scan_type));
                        }
                        Err(e) => self.record(Stage::FilenameParse, &file_ctx.local_path(), e),
                    }
                }
                _ => self.skip(&path, "not a scan file"),
            }
        }

        info!(experiment = %experiment.label, files = scan_files.len(), "Uploading scan level resources");
        for (file_ctx, scan_type) in scan_files {
            let local = file_ctx.local_path();
            if let Err(e) = self.put_scan_file(&experiment, &scan_type, &file_ctx).await {
                self.record(Stage::ScanFile, &local, e);
            }
        }
    }

    async fn experiment(&mut self, subject: &RemoteSubject, ctx: &TraversalContext) -> Option<RemoteExperiment> {
        let datatype = ctx.datatype.as_deref().unwrap_or_default();
        let ensured = mapper::ensure_experiment(
            self.xnat,
            subject,
            &ctx.entry,
            ctx.session.as_deref(),
            datatype,
            &self.cfg.session_marker,
        )
        .await;

        match ensured {
            Ok(Some(ensured)) => {
                if ensured.was_created() {
                    info!(experiment = %ensured.get().label, "Created experiment");
                    self.metrics.inc_experiments_created();
                }
                Some(ensured.into_inner())
            }
            Ok(None) => {
                self.skip(&ctx.folder_path(), "no XNAT session type for datatype");
                None
            }
            Err(e) => {
                self.record(Stage::ExperimentCreate, &ctx.folder_path(), e);
                None
            }
        }
    }

    async fn scan(&mut self, experiment: &RemoteExperiment, scan_type: &str, ctx: &TraversalContext) {
        let filename = ctx.file.as_deref().unwrap_or_default();
        match mapper::ensure_scan(self.xnat, experiment, scan_type, filename, self.cfg).await {
            Ok(Some(ensured)) if ensured.was_created() => {
                info!(experiment = %experiment.label, scan = %ensured.get().id, scan_type, "Created scan");
                self.metrics.inc_scans_created();
            }
            Ok(_) => {}
            Err(e) => self.record(Stage::ScanCreate, &ctx.local_path(), e),
        }
    }

    /// Routes a file to `NIFTI`, `MEG` or `BIDS` on its scan, or to `BIDS` on
    /// the experiment when no scan of its type exists.
    async fn put_scan_file(
        &self,
        experiment: &RemoteExperiment,
        scan_type: &str,
        ctx: &TraversalContext,
    ) -> XnatResult<()> {
        let filename = ctx.file.as_deref().unwrap_or_default();
        let local = ctx.local_path();
        match mapper::find_scan(self.xnat, experiment, scan_type).await? {
            Some(scan) => {
                let bucket = mapper::resource_bucket(filename, self.cfg);
                self.put_file(&scan, bucket, &local, filename).await
            }
            None => self.put_file(experiment, BIDS_RESOURCE, &local, filename).await,
        }
    }
}
