// Userhash persistence. The token is a single line of plaintext kept next
// to the installed binary, read once per run and written only on request.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::CredentialError;

pub const CREDENTIAL_FILE_NAME: &str = ".userhash";

#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        CredentialStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `.userhash` in the directory holding the running executable. If the
    /// executable's location can't be resolved we fall back to the user's
    /// home directory, then to the working directory.
    pub fn default_path() -> PathBuf {
        let dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf))
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."));
        dir.join(CREDENTIAL_FILE_NAME)
    }

    /// Load the saved userhash. A missing file is created empty and counts
    /// as "no userhash", as does an empty file.
    pub fn load(&self) -> Result<Option<String>, CredentialError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = strip_line_break(&contents);
                debug!(
                    path = %self.path.display(),
                    present = !token.is_empty(),
                    "userhash file read"
                );
                Ok((!token.is_empty()).then(|| token.to_string()))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                fs::write(&self.path, "").map_err(|source| CredentialError::Create {
                    path: self.path.clone(),
                    source,
                })?;
                debug!(path = %self.path.display(), "created empty userhash file");
                Ok(None)
            }
            Err(source) => Err(CredentialError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Replace the file's contents with `token`.
    pub fn save(&self, token: &str) -> Result<(), CredentialError> {
        fs::write(&self.path, token).map_err(|source| CredentialError::Write {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "userhash saved");
        Ok(())
    }
}

// Editors like to append a newline; a token never ends in one.
fn strip_line_break(contents: &str) -> &str {
    contents
        .strip_suffix("\r\n")
        .or_else(|| contents.strip_suffix('\n'))
        .unwrap_or(contents)
}
