// Command-line surface. Parsing produces an `Invocation`; nothing here
// touches the filesystem or the network.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::ErrorKind;
use clap::Parser;

use crate::error::CliError;
use crate::target::{Ttl, UploadTarget};

#[derive(Parser, Debug)]
#[command(
    name = "catbox",
    version,
    about = "Uploads the file permanently to Catbox and returns the URL. (200MB file size limit)",
    after_help = "Use --time to upload temporarily to Litterbox instead (1GB file size limit).\n\
                  Running with only --userhash <hash> saves it as the default userhash."
)]
pub struct Args {
    /// File to upload
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Uses a specific userhash for Catbox
    #[arg(long, value_name = "HASH", conflicts_with_all = ["anon", "time"])]
    pub userhash: Option<String>,

    /// Uploads to Catbox without any userhash
    #[arg(long, conflicts_with = "time")]
    pub anon: bool,

    /// Uploads temporarily to Litterbox; one of 1h, 12h, 24h, 72h
    #[arg(long, value_name = "TIME")]
    pub time: Option<String>,
}

/// How the user asked for the Catbox userhash to be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialFlag {
    /// Neither `--anon` nor `--userhash`: use whatever is saved.
    Default,
    Anonymous,
    Explicit(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// `--help` or `--version`; the rendered text to print.
    Help(String),
    /// `--userhash <hash>` with no file.
    SaveCredential(String),
    Upload {
        file: PathBuf,
        target: UploadTarget,
        credential: CredentialFlag,
    },
}

impl Invocation {
    /// Parse `args` (including the program name). Option conflicts and a bad
    /// `--time` value are reported before any file is looked at.
    pub fn parse_from<I, T>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = match Args::try_parse_from(args) {
            Ok(args) => args,
            Err(err) => {
                let text = err.render().to_string();
                return match err.kind() {
                    ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                        Ok(Invocation::Help(text))
                    }
                    ErrorKind::ArgumentConflict => {
                        let first = text.lines().next().unwrap_or_default();
                        Err(CliError::ConflictingOptions(without_prefix(first)))
                    }
                    _ => Err(CliError::InvalidArguments(without_prefix(text.trim_end()))),
                };
            }
        };
        Self::from_args(args)
    }

    pub fn from_args(args: Args) -> Result<Self, CliError> {
        let target = match &args.time {
            Some(raw) => UploadTarget::Temporary(raw.parse::<Ttl>()?),
            None => UploadTarget::Permanent,
        };
        let credential = match (args.anon, args.userhash) {
            (true, _) => CredentialFlag::Anonymous,
            (false, Some(hash)) => CredentialFlag::Explicit(hash),
            (false, None) => CredentialFlag::Default,
        };

        match (args.file, credential) {
            (Some(file), credential) => Ok(Invocation::Upload {
                file,
                target,
                credential,
            }),
            (None, CredentialFlag::Explicit(hash)) => Ok(Invocation::SaveCredential(hash)),
            (None, _) => Err(CliError::MissingFilePath),
        }
    }
}

// clap's conflict report is "error: ..." followed by usage; keep the gist.
// `main` adds its own `ERROR:` label.
fn without_prefix(text: &str) -> String {
    text.strip_prefix("error: ").unwrap_or(text).to_string()
}
