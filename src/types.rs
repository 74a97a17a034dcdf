use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where the traversal currently is inside the BIDS tree.
///
/// Every classifier, mapper and driver call receives this value explicitly;
/// descending into a folder produces a new context rather than mutating one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraversalContext {
    /// The BIDS root directory.
    pub root: PathBuf,
    /// The top-level entry being processed (a subject folder or a
    /// project-level file/directory).
    pub entry: String,
    /// The session folder, when the datatype folder lives inside one.
    pub session: Option<String>,
    /// The datatype folder (`anat`, `meg`, ...).
    pub datatype: Option<String>,
    /// The file currently being handled.
    pub file: Option<String>,
}

impl TraversalContext {
    pub fn new(root: impl Into<PathBuf>, entry: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            entry: entry.into(),
            session: None,
            datatype: None,
            file: None,
        }
    }

    pub fn with_session(&self, session: impl Into<String>) -> Self {
        Self { session: Some(session.into()), ..self.clone() }
    }

    pub fn with_datatype(&self, datatype: impl Into<String>) -> Self {
        Self { datatype: Some(datatype.into()), ..self.clone() }
    }

    pub fn with_file(&self, file: impl Into<String>) -> Self {
        Self { file: Some(file.into()), ..self.clone() }
    }

    /// Path of the top-level entry.
    pub fn entry_path(&self) -> PathBuf {
        self.root.join(&self.entry)
    }

    /// Path of the deepest folder in the context (datatype, session or entry).
    pub fn folder_path(&self) -> PathBuf {
        let mut p = self.entry_path();
        if let Some(s) = &self.session {
            p.push(s);
        }
        if let Some(d) = &self.datatype {
            p.push(d);
        }
        p
    }

    /// Full local path of the current file, or of the deepest folder when no
    /// file is set.
    pub fn local_path(&self) -> PathBuf {
        let mut p = self.folder_path();
        if let Some(f) = &self.file {
            p.push(f);
        }
        p
    }
}

/// The traversal step a recoverable failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ProjectFile,
    ProjectDirectory,
    SubjectCreate,
    SubjectFile,
    SubjectDirectory,
    ExperimentCreate,
    ScanCreate,
    ScanFile,
    FilenameParse,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Stage::ProjectFile => "project-file-upload",
            Stage::ProjectDirectory => "project-directory-upload",
            Stage::SubjectCreate => "subject-create",
            Stage::SubjectFile => "subject-file-upload",
            Stage::SubjectDirectory => "subject-directory-upload",
            Stage::ExperimentCreate => "experiment-create",
            Stage::ScanCreate => "scan-create",
            Stage::ScanFile => "scan-file-upload",
            Stage::FilenameParse => "filename-parse",
        };
        f.write_str(tag)
    }
}

/// One entry that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadFailure {
    pub stage: Stage,
    pub path: String,
    pub message: String,
}

impl UploadFailure {
    pub fn new(stage: Stage, path: &Path, message: impl fmt::Display) -> Self {
        Self {
            stage,
            path: path.to_string_lossy().to_string(),
            message: message.to_string(),
        }
    }
}
