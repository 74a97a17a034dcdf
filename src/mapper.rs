//! Find-or-create of remote containers.
//!
//! Every operation first lists the parent's children, freshly read from the
//! backend, and only creates on a miss. Calling any of them twice with the
//! same arguments yields the same remote object.

use tracing::debug;

use crate::bids::session_suffix;
use crate::config::BidsConfig;
use crate::error::XnatResult;
use crate::xnat::{
    RemoteExperiment, RemoteProject, RemoteScan, RemoteSubject, Resource, ResourceContainer, SessionKind, XnatApi,
};

pub const BIDS_RESOURCE: &str = "BIDS";
pub const NIFTI_RESOURCE: &str = "NIFTI";
pub const MEG_RESOURCE: &str = "MEG";

/// The result of a find-or-create call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ensured<T> {
    Found(T),
    Created(T),
}

impl<T> Ensured<T> {
    pub fn was_created(&self) -> bool {
        matches!(self, Ensured::Created(_))
    }

    pub fn get(&self) -> &T {
        match self {
            Ensured::Found(t) | Ensured::Created(t) => t,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Ensured::Found(t) | Ensured::Created(t) => t,
        }
    }
}

pub async fn find_resource(
    xnat: &dyn XnatApi,
    container: &dyn ResourceContainer,
    label: &str,
) -> XnatResult<Option<Resource>> {
    Ok(xnat
        .list_resources(container)
        .await?
        .into_iter()
        .find(|r| r.label == label))
}

pub async fn ensure_resource(
    xnat: &dyn XnatApi,
    container: &dyn ResourceContainer,
    label: &str,
) -> XnatResult<Ensured<Resource>> {
    if let Some(resource) = find_resource(xnat, container, label).await? {
        return Ok(Ensured::Found(resource));
    }
    debug!(container = %container.describe(), resource = label, "Creating resource");
    Ok(Ensured::Created(xnat.create_resource(container, label).await?))
}

pub async fn find_subject(xnat: &dyn XnatApi, project: &RemoteProject, label: &str) -> XnatResult<Option<RemoteSubject>> {
    Ok(xnat
        .list_subjects(project)
        .await?
        .into_iter()
        .find(|s| s.label == label))
}

pub async fn ensure_subject(xnat: &dyn XnatApi, project: &RemoteProject, label: &str) -> XnatResult<Ensured<RemoteSubject>> {
    if let Some(subject) = find_subject(xnat, project, label).await? {
        return Ok(Ensured::Found(subject));
    }
    Ok(Ensured::Created(xnat.create_subject(project, label).await?))
}

/// `sub-01-anat` without a session, `sub-01-1-anat` for session `ses-1`.
pub fn experiment_label(subject_folder: &str, session_folder: Option<&str>, datatype: &str, session_marker: &str) -> String {
    match session_folder {
        Some(session) => format!(
            "{}-{}-{}",
            subject_folder,
            session_suffix(session, session_marker),
            datatype
        ),
        None => format!("{}-{}", subject_folder, datatype),
    }
}

pub async fn find_experiment(
    xnat: &dyn XnatApi,
    subject: &RemoteSubject,
    label: &str,
) -> XnatResult<Option<RemoteExperiment>> {
    Ok(xnat
        .list_experiments(subject)
        .await?
        .into_iter()
        .find(|e| e.label == label))
}

/// Finds or creates the experiment for one datatype folder.
///
/// Returns `None` without touching the remote when XNAT has no session type
/// for `datatype` and no experiment of that label exists yet.
pub async fn ensure_experiment(
    xnat: &dyn XnatApi,
    subject: &RemoteSubject,
    subject_folder: &str,
    session_folder: Option<&str>,
    datatype: &str,
    session_marker: &str,
) -> XnatResult<Option<Ensured<RemoteExperiment>>> {
    let label = experiment_label(subject_folder, session_folder, datatype, session_marker);
    if let Some(experiment) = find_experiment(xnat, subject, &label).await? {
        return Ok(Some(Ensured::Found(experiment)));
    }
    let Some(kind) = SessionKind::for_datatype(datatype) else {
        return Ok(None);
    };
    Ok(Some(Ensured::Created(xnat.create_experiment(subject, &label, kind).await?)))
}

/// The scan kind implied by a filename's suffix.
pub fn scan_kind(filename: &str, cfg: &BidsConfig) -> Option<SessionKind> {
    if cfg.is_mri_file(filename) {
        Some(SessionKind::Mr)
    } else if cfg.is_meg_file(filename) {
        Some(SessionKind::Meg)
    } else {
        None
    }
}

pub async fn find_scan(
    xnat: &dyn XnatApi,
    experiment: &RemoteExperiment,
    scan_type: &str,
) -> XnatResult<Option<RemoteScan>> {
    Ok(xnat
        .list_scans(experiment)
        .await?
        .into_iter()
        .find(|s| s.scan_type == scan_type))
}

/// Finds the scan of `scan_type` in `experiment` or creates it from `filename`.
///
/// A new scan gets the number of scans already in the experiment as its id.
/// Files that are neither images nor MEG recordings (sidecars, tables) never
/// create a scan and yield `None` when none exists.
pub async fn ensure_scan(
    xnat: &dyn XnatApi,
    experiment: &RemoteExperiment,
    scan_type: &str,
    filename: &str,
    cfg: &BidsConfig,
) -> XnatResult<Option<Ensured<RemoteScan>>> {
    let scans = xnat.list_scans(experiment).await?;
    if let Some(scan) = scans.iter().find(|s| s.scan_type == scan_type) {
        return Ok(Some(Ensured::Found(scan.clone())));
    }
    let Some(kind) = scan_kind(filename, cfg) else {
        return Ok(None);
    };
    let sequence_id = u32::try_from(scans.len()).unwrap_or(u32::MAX);
    Ok(Some(Ensured::Created(
        xnat.create_scan(experiment, sequence_id, scan_type, kind).await?,
    )))
}

/// The scan resource a file belongs in.
pub fn resource_bucket(filename: &str, cfg: &BidsConfig) -> &'static str {
    match scan_kind(filename, cfg) {
        Some(SessionKind::Mr) => NIFTI_RESOURCE,
        Some(SessionKind::Meg) => MEG_RESOURCE,
        None => BIDS_RESOURCE,
    }
}
