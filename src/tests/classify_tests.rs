#[cfg(test)]
mod tests {
    use std::fs;

    use crate::bids::{build_excludes, classify, has_subject_folders, list_directory, Depth, Role};
    use crate::config::BidsConfig;
    use crate::tests::bids_tree;

    #[test]
    fn top_level_directories_split_into_subjects_and_resources() {
        let tree = bids_tree(&["sub-01/anat/x.nii", "subject_extra/a.txt", "code/convert.py", "derivatives/x.txt"]);
        let cfg = BidsConfig::default();
        let root = tree.path();

        assert_eq!(classify(&root.join("sub-01"), Depth::Top, &cfg), Some(Role::Subject));
        // The marker is a plain prefix.
        assert_eq!(classify(&root.join("subject_extra"), Depth::Top, &cfg), Some(Role::Subject));
        assert_eq!(classify(&root.join("code"), Depth::Top, &cfg), Some(Role::ProjectResourceDir));
        assert_eq!(classify(&root.join("derivatives"), Depth::Top, &cfg), Some(Role::ProjectResourceDir));
    }

    #[test]
    fn files_are_classified_by_depth() {
        let tree = bids_tree(&[
            "dataset_description.json",
            "sub-01/sub-01_sessions.tsv",
            "sub-01/ses-1/sub-01_ses-1_scans.tsv",
            "sub-01/anat/sub-01_T1w.nii.gz",
        ]);
        let cfg = BidsConfig::default();
        let root = tree.path();

        assert_eq!(
            classify(&root.join("dataset_description.json"), Depth::Top, &cfg),
            Some(Role::ProjectResourceFile)
        );
        assert_eq!(
            classify(&root.join("sub-01/sub-01_sessions.tsv"), Depth::Subject, &cfg),
            Some(Role::SubjectFile)
        );
        assert_eq!(classify(&root.join("sub-01/ses-1/sub-01_ses-1_scans.tsv"), Depth::Session, &cfg), None);
        assert_eq!(
            classify(&root.join("sub-01/anat/sub-01_T1w.nii.gz"), Depth::Datatype, &cfg),
            Some(Role::ScanFile)
        );
    }

    #[test]
    fn subject_subfolders() {
        let tree = bids_tree(&[
            "sub-01/anat/a.nii",
            "sub-01/meg/a.con",
            "sub-01/ses-pre/anat/a.nii",
            "sub-01/beh/events.tsv",
            "sub-01/notes/readme.txt",
        ]);
        let cfg = BidsConfig::default();
        let sub = tree.path().join("sub-01");

        assert_eq!(classify(&sub.join("anat"), Depth::Subject, &cfg), Some(Role::DatatypeDir));
        assert_eq!(classify(&sub.join("meg"), Depth::Subject, &cfg), Some(Role::DatatypeDir));
        assert_eq!(classify(&sub.join("ses-pre"), Depth::Subject, &cfg), Some(Role::SessionDir));
        // beh is BIDS but not configured, so it is only a resource folder.
        assert_eq!(classify(&sub.join("beh"), Depth::Subject, &cfg), Some(Role::SubjectResourceDir));
        assert_eq!(classify(&sub.join("notes"), Depth::Subject, &cfg), Some(Role::SubjectResourceDir));
    }

    #[test]
    fn configured_datatypes_are_honoured() {
        let tree = bids_tree(&["sub-01/beh/events.tsv", "sub-01/ses-1/beh/events.tsv"]);
        let cfg = BidsConfig {
            datatypes: vec!["beh".into()],
            ..BidsConfig::default()
        };
        let sub = tree.path().join("sub-01");

        assert_eq!(classify(&sub.join("beh"), Depth::Subject, &cfg), Some(Role::DatatypeDir));
        assert_eq!(classify(&sub.join("ses-1/beh"), Depth::Session, &cfg), Some(Role::DatatypeDir));
    }

    #[test]
    fn unmatched_nested_directories_have_no_role() {
        let tree = bids_tree(&["sub-01/ses-1/other/x.txt", "sub-01/anat/nested/x.nii"]);
        let cfg = BidsConfig::default();
        let sub = tree.path().join("sub-01");

        assert_eq!(classify(&sub.join("ses-1/other"), Depth::Session, &cfg), None);
        assert_eq!(classify(&sub.join("anat/nested"), Depth::Datatype, &cfg), None);
        assert_eq!(classify(&sub.join("missing"), Depth::Subject, &cfg), None);
    }

    #[test]
    fn subject_folder_detection() {
        let cfg = BidsConfig::default();
        let with_subject = bids_tree(&["sub-01/anat/a.nii", "README"]);
        let entries = list_directory(with_subject.path(), &build_excludes(&[]).unwrap()).unwrap();
        assert!(has_subject_folders(&entries, &cfg));

        // A subject-like file does not count.
        let without = bids_tree(&["sub-01.txt", "code/x.py"]);
        let entries = list_directory(without.path(), &build_excludes(&[]).unwrap()).unwrap();
        assert!(!has_subject_folders(&entries, &cfg));
    }

    #[test]
    fn listing_is_sorted_and_honours_excludes() {
        let tree = bids_tree(&["sub-02/a.txt", "sub-01/a.txt", ".DS_Store", "README"]);
        fs::create_dir_all(tree.path().join(".git")).unwrap();
        let excludes = build_excludes(&["**/.DS_Store".to_string(), "**/.git".to_string()]).unwrap();

        let names: Vec<String> = list_directory(tree.path(), &excludes)
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["README", "sub-01", "sub-02"]);
    }
}
