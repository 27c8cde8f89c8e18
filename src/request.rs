// An upload request is everything known about one upload before any
// network I/O: where it goes, which file, how big, and which userhash.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::CliError;
use crate::multipart::Form;
use crate::target::UploadTarget;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub target: UploadTarget,
    pub path: PathBuf,
    pub file_size: u64,
    pub credential: Option<String>,
    pub file_name: String,
}

impl UploadRequest {
    /// Stat `path` and check it against the target's size ceiling. Nothing
    /// is sent anywhere if this fails.
    pub fn new(target: UploadTarget, path: impl Into<PathBuf>) -> Result<Self, CliError> {
        let path = path.into();
        let metadata = std::fs::metadata(&path).map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                CliError::FileNotFound(path.clone())
            } else {
                CliError::FileStat {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        let file_size = metadata.len();
        target.check_size(file_size)?;

        Ok(UploadRequest {
            target,
            file_name: file_name_of(&path),
            path,
            file_size,
            credential: None,
        })
    }

    /// Attach a userhash. Empty tokens mean anonymous.
    pub fn with_credential(mut self, token: Option<String>) -> Self {
        self.credential = token.filter(|t| !t.is_empty());
        self
    }

    /// Encode the request as a multipart form: `reqtype`, then `time` for
    /// Litterbox, then the file, then `userhash` for Catbox when one is set.
    pub fn form(&self) -> Form {
        self.form_with(Form::new())
    }

    pub(crate) fn form_with(&self, form: Form) -> Form {
        let mut form = form.text("reqtype", "fileupload");
        if let UploadTarget::Temporary(ttl) = self.target {
            form = form.text("time", ttl.as_str());
        }
        form = form.file("fileToUpload", &self.file_name, &self.path, self.file_size);
        match &self.credential {
            Some(token) if self.target.accepts_credential() => form.text("userhash", token),
            _ => form,
        }
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
