#[cfg(test)]
mod tests {
    use crate::config::{self, AppConfig, BidsConfig};
    use std::env;
    use std::fs;
    use std::sync::Mutex;

    // load() reads process-wide environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.xnat.url, "https://xnat.mq.edu.au:443");
        assert_eq!(config.xnat.timeout_secs, 300);
        assert_eq!(config.bids.subject_marker, "sub");
        assert_eq!(config.bids.session_marker, "ses");
        assert_eq!(config.bids.datatypes, vec!["anat", "meg", "dwi"]);
        assert!(config.bids.excludes.is_empty());
        assert!(!config.upload.dry_run);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_embedded_defaults_match_bids_default() {
        let embedded = AppConfig::default().bids;
        let coded = BidsConfig::default();

        assert_eq!(embedded.datatypes, coded.datatypes);
        assert_eq!(embedded.mri_suffixes, coded.mri_suffixes);
        assert_eq!(embedded.meg_suffixes, coded.meg_suffixes);
    }

    #[test]
    fn test_suffix_helpers() {
        let bids = BidsConfig::default();
        assert!(bids.is_mri_file("sub-01_T1w.nii.gz"));
        assert!(bids.is_mri_file("sub-01_T1w.nii"));
        assert!(!bids.is_mri_file("sub-01_T1w.json"));
        assert!(bids.is_meg_file("sub-01_task-rest_meg.con"));
        assert!(!bids.is_meg_file("sub-01_task-rest_meg.fif"));
        assert!(bids.is_datatype("anat"));
        assert!(!bids.is_datatype("func"));
    }

    #[test]
    fn test_valid_default_config_passes_validation() {
        assert!(config::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut cfg = AppConfig::default();
        cfg.xnat.url = "  ".into();
        let err = config::validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("xnat.url must not be empty"));

        let mut cfg = AppConfig::default();
        cfg.xnat.timeout_secs = 0;
        let err = config::validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("xnat.timeout_secs must be > 0"));

        let mut cfg = AppConfig::default();
        cfg.bids.session_marker.clear();
        let err = config::validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("bids.session_marker"));

        let mut cfg = AppConfig::default();
        cfg.bids.datatypes.clear();
        let err = config::validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("at least one datatype"));
    }

    #[test]
    fn test_unknown_datatype_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.bids.datatypes.push("physio".into());
        let err = config::validate(&cfg).unwrap_err();
        assert!(err.to_string().contains("unknown BIDS datatype \"physio\""));

        // Valid BIDS datatypes are accepted even without an XNAT session type.
        let mut cfg = AppConfig::default();
        cfg.bids.datatypes.push("func".into());
        assert!(config::validate(&cfg).is_ok());
    }

    #[test]
    fn test_bad_exclude_glob_is_rejected() {
        let mut cfg = AppConfig::default();
        cfg.bids.excludes = vec!["**/[unclosed".into()];
        assert!(config::validate(&cfg).is_err());
    }

    #[test]
    fn test_config_from_env() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("BIDS_UPLOADER__XNAT__URL", "https://xnat.example.org");
        env::set_var("BIDS_UPLOADER__XNAT__TIMEOUT_SECS", "42");
        env::set_var("BIDS_UPLOADER__UPLOAD__DRY_RUN", "true");
        env::set_var("BIDS_UPLOADER__BIDS__DATATYPES", "anat,func");

        let result = config::load();

        env::remove_var("BIDS_UPLOADER__XNAT__URL");
        env::remove_var("BIDS_UPLOADER__XNAT__TIMEOUT_SECS");
        env::remove_var("BIDS_UPLOADER__UPLOAD__DRY_RUN");
        env::remove_var("BIDS_UPLOADER__BIDS__DATATYPES");

        let config = result.unwrap();
        assert_eq!(config.xnat.url, "https://xnat.example.org");
        assert_eq!(config.xnat.timeout_secs, 42);
        assert!(config.upload.dry_run);
        assert_eq!(config.bids.datatypes, vec!["anat", "func"]);
    }

    #[test]
    fn test_invalid_env_value_fails_load() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        env::set_var("BIDS_UPLOADER__XNAT__TIMEOUT_SECS", "0");
        let result = config::load();
        env::remove_var("BIDS_UPLOADER__XNAT__TIMEOUT_SECS");

        assert!(result.unwrap_err().to_string().contains("xnat.timeout_secs must be > 0"));
    }

    #[test]
    fn test_config_file_and_env_priority() {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(
            &path,
            r#"
[xnat]
url = "https://xnat.internal:8443"
timeout_secs = 60

[bids]
subject_marker = "subj"
excludes = ["**/.DS_Store"]
"#,
        )
        .unwrap();

        env::set_var("BIDS_UPLOADER_CONFIG", path.to_str().unwrap());
        env::set_var("BIDS_UPLOADER__XNAT__TIMEOUT_SECS", "90");

        let result = config::load();

        env::remove_var("BIDS_UPLOADER_CONFIG");
        env::remove_var("BIDS_UPLOADER__XNAT__TIMEOUT_SECS");

        let config = result.unwrap();
        assert_eq!(config.xnat.url, "https://xnat.internal:8443");
        // Environment variables override the file.
        assert_eq!(config.xnat.timeout_secs, 90);
        assert_eq!(config.bids.subject_marker, "subj");
        // Keys the file leaves out keep their defaults.
        assert_eq!(config.bids.session_marker, "ses");
        assert_eq!(config.bids.excludes, vec!["**/.DS_Store"]);
    }
}
