#[cfg(test)]
mod tests {
    use crate::error::{BidsError, OptionExt, UploadError, XnatError, XnatResult};
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_xnat_error_display() {
        let error = XnatError::ProjectNotFound("ME000".to_string());
        assert_eq!(format!("{}", error), "project ME000 not found");

        let error = XnatError::Status {
            method: "PUT".to_string(),
            uri: "/data/projects/ME000/subjects/sub-01".to_string(),
            status: 403,
            body: "Forbidden".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "PUT /data/projects/ME000/subjects/sub-01 failed with status 403: Forbidden"
        );

        let error = XnatError::Connection {
            url: "https://xnat.example.org".to_string(),
            message: "authentication failed with status 401 Unauthorized".to_string(),
        };
        assert!(error.to_string().starts_with("unable to connect to XNAT at https://xnat.example.org"));
    }

    #[test]
    fn test_bids_error_display() {
        let error = BidsError::MalformedFilename {
            filename: "README".to_string(),
            expected: 2,
        };
        assert_eq!(
            error.to_string(),
            "malformed BIDS filename \"README\": expected at least 2 '_'-separated tokens"
        );
    }

    #[test]
    fn test_upload_error_display() {
        let error = UploadError::NoSubjects(PathBuf::from("/data/study"));
        assert!(error.to_string().starts_with("no subject folders found in /data/study"));

        let error = UploadError::Unreadable {
            path: PathBuf::from("/data/missing"),
            source: io::Error::new(io::ErrorKind::NotFound, "gone"),
        };
        assert_eq!(error.to_string(), "cannot read BIDS directory /data/missing: gone");
    }

    #[test]
    fn test_from_conversions() {
        let io_error = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        let xnat_error: XnatError = io_error.into();
        assert!(matches!(xnat_error, XnatError::Io(_)));
        assert_eq!(xnat_error.to_string(), "denied");

        let upload_error: UploadError = XnatError::ProjectNotFound("P1".into()).into();
        assert!(matches!(upload_error, UploadError::Xnat(XnatError::ProjectNotFound(_))));
        // Transparent: the inner message is shown unchanged.
        assert_eq!(upload_error.to_string(), "project P1 not found");

        let glob_error = globset::Glob::new("[unclosed").unwrap_err();
        let upload_error: UploadError = glob_error.into();
        assert!(matches!(upload_error, UploadError::InvalidExclude(_)));
    }

    #[test]
    fn test_option_ext() {
        let some_value: Option<i32> = Some(42);
        let result: XnatResult<i32> = some_value.ok_or_project_not_found("ME000");
        assert_eq!(result.unwrap(), 42);

        let none_value: Option<i32> = None;
        let result: XnatResult<i32> = none_value.ok_or_project_not_found("ME000");
        match result {
            Err(XnatError::ProjectNotFound(id)) => assert_eq!(id, "ME000"),
            other => panic!("expected ProjectNotFound, got {:?}", other),
        }
    }
}
