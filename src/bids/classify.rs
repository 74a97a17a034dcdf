use std::path::{Path, PathBuf};

use serde::Serialize;

use super::entry_name;
use crate::config::BidsConfig;

/// How deep below the BIDS root an entry sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Depth {
    /// Directly inside the root.
    Top,
    /// Inside a subject folder.
    Subject,
    /// Inside a session folder.
    Session,
    /// Inside a datatype folder.
    Datatype,
}

/// What a filesystem entry represents in the remote hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// A file next to the subject folders; goes to the project `BIDS` resource.
    ProjectResourceFile,
    /// A non-subject folder at the top level; becomes a project resource of
    /// the same name.
    ProjectResourceDir,
    /// A subject folder.
    Subject,
    /// A subject subfolder that is neither a datatype nor a session.
    SubjectResourceDir,
    /// A session folder holding datatype folders.
    SessionDir,
    /// A configured datatype folder holding scan files.
    DatatypeDir,
    /// A file directly inside a subject folder.
    SubjectFile,
    /// A file inside a datatype folder.
    ScanFile,
}

/// Classifies `path` found at `depth`.
///
/// Rules apply in order: files by depth, subject prefix, configured datatype
/// name, session marker, then the resource fallbacks. `None` means the entry
/// has no meaning at this depth and is skipped.
pub fn classify(path: &Path, depth: Depth, cfg: &BidsConfig) -> Option<Role> {
    let name = entry_name(path)?;

    if path.is_file() {
        return match depth {
            Depth::Top => Some(Role::ProjectResourceFile),
            Depth::Subject => Some(Role::SubjectFile),
            Depth::Datatype => Some(Role::ScanFile),
            Depth::Session => None,
        };
    }
    if !path.is_dir() {
        return None;
    }

    match depth {
        Depth::Top if name.starts_with(cfg.subject_marker.as_str()) => Some(Role::Subject),
        Depth::Top => Some(Role::ProjectResourceDir),
        Depth::Subject | Depth::Session if cfg.is_datatype(name) => Some(Role::DatatypeDir),
        Depth::Subject if name.contains(cfg.session_marker.as_str()) => Some(Role::SessionDir),
        Depth::Subject => Some(Role::SubjectResourceDir),
        Depth::Session | Depth::Datatype => None,
    }
}

/// True when at least one of the top-level `entries` is a subject folder.
pub fn has_subject_folders(entries: &[PathBuf], cfg: &BidsConfig) -> bool {
    entries
        .iter()
        .any(|p| classify(p, Depth::Top, cfg) == Some(Role::Subject))
}
