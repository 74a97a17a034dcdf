use std::path::PathBuf;

/// Errors raised while interpreting BIDS names.
#[derive(Debug, thiserror::Error)]
pub enum BidsError {
    /// The filename does not have enough underscore-delimited entities to
    /// derive a scan type from it.
    #[error("malformed BIDS filename {filename:?}: expected at least {expected} '_'-separated tokens")]
    MalformedFilename { filename: String, expected: usize },
}

/// Errors raised by an XNAT backend.
#[derive(Debug, thiserror::Error)]
pub enum XnatError {
    /// The server could not be reached or refused the credentials.
    #[error("unable to connect to XNAT at {url}: {message}")]
    Connection { url: String, message: String },
    /// The project id does not exist or is not visible to the user.
    #[error("project {0} not found")]
    ProjectNotFound(String),
    /// The server answered with a non-success status.
    #[error("{method} {uri} failed with status {status}: {body}")]
    Status {
        method: String,
        uri: String,
        status: u16,
        body: String,
    },
    /// A file could not be stored in a resource.
    #[error("upload of {path} failed: {message}")]
    Upload { path: PathBuf, message: String },
    #[error("invalid XNAT url: {0}")]
    Url(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Fatal errors that abort an upload run before or during traversal.
///
/// Per-entry problems never surface here; they are collected in the
/// [`UploadReport`](crate::uploader::UploadReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("no subject folders found in {0} - check the BIDS directory path is correct")]
    NoSubjects(PathBuf),
    #[error("cannot read BIDS directory {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid exclude pattern: {0}")]
    InvalidExclude(#[from] globset::Error),
    #[error(transparent)]
    Xnat(#[from] XnatError),
}

/// A type alias for `Result<T, XnatError>`, used by every backend call.
pub type XnatResult<T> = Result<T, XnatError>;

/// An extension trait for `Option` that turns a lookup miss into a
/// `ProjectNotFound` error.
pub trait OptionExt<T> {
    fn ok_or_project_not_found(self, project_id: &str) -> XnatResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_project_not_found(self, project_id: &str) -> XnatResult<T> {
        self.ok_or_else(|| XnatError::ProjectNotFound(project_id.to_string()))
    }
}
