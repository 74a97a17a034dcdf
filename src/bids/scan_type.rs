use crate::error::BidsError;

/// Derives the scan type from a BIDS filename.
///
/// The second `_`-token names the scan unless it is the session entity, in
/// which case the third one does. Everything from the first `.` on is the
/// extension and is dropped, so `sub-01_T1w.nii.gz` yields `T1w`.
pub fn resolve_scan_type(filename: &str, session_marker: &str) -> Result<String, BidsError> {
    let tokens: Vec<&str> = filename.split('_').collect();
    let malformed = |expected| BidsError::MalformedFilename {
        filename: filename.to_string(),
        expected,
    };

    let second = *tokens.get(1).ok_or_else(|| malformed(2))?;
    let (token, expected) = if second.contains(session_marker) {
        (*tokens.get(2).ok_or_else(|| malformed(3))?, 3)
    } else {
        (second, 2)
    };

    let scan_type = token.split_once('.').map_or(token, |(head, _)| head);
    if scan_type.is_empty() {
        return Err(malformed(expected));
    }
    Ok(scan_type.to_string())
}

/// The session label carried by a session folder name: `ses-1` gives `1`.
///
/// Falls back to the whole folder name when nothing follows the marker.
pub fn session_suffix<'a>(folder: &'a str, session_marker: &str) -> &'a str {
    match folder.find(session_marker) {
        Some(i) => {
            let rest = folder[i + session_marker.len()..].trim_start_matches('-');
            if rest.is_empty() {
                folder
            } else {
                rest
            }
        }
        None => folder,
    }
}
