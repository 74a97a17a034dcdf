use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Context;

use crate::xnat::Credentials;

/// What the user is asked for before a run.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub project_id: String,
    pub bids_root: PathBuf,
    /// Absent for dry runs, which never contact the server.
    pub credentials: Option<Credentials>,
}

/// Writes `label`, reads one line and returns it trimmed.
///
/// Blank answers are asked again; end of input is an error.
pub fn prompt_line<R: BufRead, W: Write>(input: &mut R, out: &mut W, label: &str) -> io::Result<String> {
    loop {
        write!(out, "{}", label)?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, format!("no answer for {:?}", label.trim())));
        }
        let answer = line.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
    }
}

/// Paths pasted from a file manager often arrive quoted.
pub fn clean_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|q| trimmed.strip_prefix(*q).and_then(|s| s.strip_suffix(*q)))
        .unwrap_or(trimmed);
    PathBuf::from(unquoted)
}

pub fn read_inputs<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    with_credentials: bool,
    read_password: impl FnOnce() -> io::Result<String>,
) -> io::Result<RunInputs> {
    let project_id = prompt_line(input, out, "Project ID (e.g. ME000): ")?;
    let bids_root = clean_path(&prompt_line(input, out, "Path to your BIDS directory: ")?);
    let credentials = if with_credentials {
        let username = prompt_line(input, out, "XNAT Username: ")?;
        let password = read_password()?;
        Some(Credentials { username, password })
    } else {
        None
    };
    Ok(RunInputs {
        project_id,
        bids_root,
        credentials,
    })
}

/// Asks on the terminal; the password is read without echo.
pub fn collect_inputs(dry_run: bool) -> anyhow::Result<RunInputs> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();
    read_inputs(&mut input, &mut out, !dry_run, || rpassword::prompt_password("XNAT Password: "))
        .context("failed to read run inputs")
}
