//! BIDS directory conventions: entry classification, scan-type derivation
//! and the directory listing helpers used by the traversal.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use globset::{Glob, GlobSet, GlobSetBuilder};

pub mod classify;
pub mod scan_type;

pub use classify::{classify, has_subject_folders, Depth, Role};
pub use scan_type::{resolve_scan_type, session_suffix};

/// The complete BIDS datatype vocabulary. Only the configured subset is
/// turned into experiments.
pub const BIDS_DATATYPES: &[&str] = &["anat", "func", "dwi", "fmap", "meg", "eeg", "ieeg", "beh"];

/// Lists the entries of `dir`, minus anything matching `excludes`.
///
/// The filesystem returns entries in no particular order; they are sorted by
/// name so runs log in a stable order.
pub fn list_directory(dir: &Path, excludes: &GlobSet) -> io::Result<Vec<PathBuf>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)?
        .flatten()
        .map(|e| e.path())
        .filter(|p| !matches_excludes(p, excludes))
        .collect();
    entries.sort();
    Ok(entries)
}

pub fn build_excludes(patterns: &[String]) -> Result<GlobSet, globset::Error> {
    let mut b = GlobSetBuilder::new();
    for p in patterns {
        if p.trim().is_empty() {
            continue;
        }
        // Backslashes are normalised so patterns match the '/'-form used in
        // `matches_excludes`.
        let norm = p.trim().replace('\\', "/");
        b.add(Glob::new(&norm)?);
    }
    b.build()
}

pub fn matches_excludes(path: &Path, set: &GlobSet) -> bool {
    if set.is_empty() {
        return false;
    }
    let s = path.to_string_lossy().replace('\\', "/");
    set.is_match(&s)
}

/// The UTF-8 file name of `path`. BIDS names are ASCII, so anything else is
/// not part of the dataset.
pub fn entry_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}
