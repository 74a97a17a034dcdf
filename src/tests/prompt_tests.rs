#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};
    use std::path::PathBuf;

    use crate::prompt::{clean_path, prompt_line, read_inputs};

    #[test]
    fn prompt_line_trims_answer() {
        let mut input = Cursor::new("  ME000  \n");
        let mut out = Vec::new();

        let answer = prompt_line(&mut input, &mut out, "Project ID: ").unwrap();
        assert_eq!(answer, "ME000");
        assert_eq!(String::from_utf8(out).unwrap(), "Project ID: ");
    }

    #[test]
    fn blank_answers_are_asked_again() {
        let mut input = Cursor::new("\n   \nME001\n");
        let mut out = Vec::new();

        let answer = prompt_line(&mut input, &mut out, "Project ID: ").unwrap();
        assert_eq!(answer, "ME001");
        assert_eq!(String::from_utf8(out).unwrap().matches("Project ID: ").count(), 3);
    }

    #[test]
    fn end_of_input_is_an_error() {
        let mut input = Cursor::new("\n");
        let mut out = Vec::new();

        let err = prompt_line(&mut input, &mut out, "Project ID: ").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn quoted_paths_are_unwrapped() {
        assert_eq!(clean_path("'/data/my study'"), PathBuf::from("/data/my study"));
        assert_eq!(clean_path("  \"/data/bids\" "), PathBuf::from("/data/bids"));
        assert_eq!(clean_path("/data/bids"), PathBuf::from("/data/bids"));
        // Mismatched quotes are left alone.
        assert_eq!(clean_path("'/data/bids\""), PathBuf::from("'/data/bids\""));
    }

    #[test]
    fn read_inputs_collects_credentials() {
        let mut input = Cursor::new("ME000\n'/data/bids'\nalice\n");
        let mut out = Vec::new();

        let inputs = read_inputs(&mut input, &mut out, true, || Ok("secret".to_string())).unwrap();
        assert_eq!(inputs.project_id, "ME000");
        assert_eq!(inputs.bids_root, PathBuf::from("/data/bids"));
        let credentials = inputs.credentials.unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password, "secret");
        // The password never shows up in debug output.
        assert!(!format!("{:?}", credentials).contains("secret"));
    }

    #[test]
    fn dry_run_skips_credentials() {
        let mut input = Cursor::new("ME000\n/data/bids\n");
        let mut out = Vec::new();

        let inputs = read_inputs(&mut input, &mut out, false, || panic!("password must not be read")).unwrap();
        assert!(inputs.credentials.is_none());
        assert!(!String::from_utf8(out).unwrap().contains("Username"));
    }

    #[test]
    fn password_read_failure_propagates() {
        let mut input = Cursor::new("ME000\n/data/bids\nalice\n");
        let mut out = Vec::new();

        let result = read_inputs(&mut input, &mut out, true, || {
            Err(io::Error::new(io::ErrorKind::Other, "no tty"))
        });
        assert_eq!(result.unwrap_err().to_string(), "no tty");
    }
}
