// Error module: every failure the CLI can hit ends up as a `CliError`.
// `main` is the only place that turns one into a message and an exit code.

use std::path::PathBuf;

use thiserror::Error;

use crate::target::UploadTarget;

/// Failures while reading or writing the saved userhash file.
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("failed to read userhash file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to create userhash file {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write userhash file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of a single upload attempt. None of these are retried.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("file is {size} bytes, over the {limit} byte limit for {service}")]
    TooLarge {
        size: u64,
        limit: u64,
        service: &'static str,
    },
    #[error("request failed: {}", causes(.0))]
    Transport(#[from] reqwest::Error),
    #[error("could not start the HTTP runtime: {0}")]
    Runtime(#[source] std::io::Error),
    #[error("server answered {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

#[derive(Error, Debug)]
pub enum CliError {
    #[error("File does not exist: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Error checking file {}: {source}", .path.display())]
    FileStat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{}", .target.limit_message())]
    SizeLimitExceeded { target: UploadTarget, size: u64 },
    #[error(
        "Invalid time option \"{0}\". Valid options are 1h, 12h, 24h, 72h. \
         Use --help for usage example."
    )]
    InvalidTimeOption(String),
    #[error("Only one option (--userhash, --anon or --time) can be used at a time.\n{0}")]
    ConflictingOptions(String),
    #[error("{0}")]
    InvalidArguments(String),
    #[error("No file path specified. Use --help for usage example.")]
    MissingFilePath,
    #[error(transparent)]
    Credential(#[from] CredentialError),
    #[error("Error uploading file: {0}")]
    Upload(#[from] UploadError),
    #[error("invalid configuration for {var}: {reason}")]
    Config { var: &'static str, reason: String },
    #[error("prompt failed: {0}")]
    Prompt(#[source] std::io::Error),
}

/// `err` followed by every source it wraps, skipping sources whose text
/// already appears in what came before.
fn causes(err: &(dyn std::error::Error + 'static)) -> String {
    let mut text = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let part = cause.to_string();
        if !text.contains(&part) {
            text.push_str(": ");
            text.push_str(&part);
        }
        source = cause.source();
    }
    text
}

impl CliError {
    /// Process exit status for this error. Every failure is terminal and
    /// reported the same way.
    pub fn exit_code(&self) -> u8 {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Ttl;

    #[test]
    fn every_error_exits_with_one() {
        let errors = [
            CliError::MissingFilePath,
            CliError::InvalidTimeOption("2h".into()),
            CliError::ConflictingOptions(String::new()),
            CliError::FileNotFound(PathBuf::from("nope")),
            CliError::SizeLimitExceeded {
                target: UploadTarget::Temporary(Ttl::OneDay),
                size: 2_147_483_648,
            },
        ];
        for err in errors {
            assert_eq!(err.exit_code(), 1, "{err}");
        }
    }

    #[derive(Error, Debug)]
    #[error("error sending request")]
    struct Outer(#[source] Inner);

    #[derive(Error, Debug)]
    #[error("tcp connect error")]
    struct Inner(#[source] std::io::Error);

    #[test]
    fn causes_names_every_layer_once() {
        let refused = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = Outer(Inner(refused));
        assert_eq!(
            causes(&err),
            "error sending request: tcp connect error: refused"
        );

        let repeated = std::io::Error::other("tcp connect error");
        assert_eq!(causes(&Inner(repeated)), "tcp connect error");
    }

    #[test]
    fn size_limit_message_names_the_service() {
        let err = CliError::SizeLimitExceeded {
            target: UploadTarget::Temporary(Ttl::OneDay),
            size: 2_147_483_648,
        };
        assert!(err.to_string().contains("1GB limit for Litterbox"));

        let err = CliError::SizeLimitExceeded {
            target: UploadTarget::Permanent,
            size: 209_715_201,
        };
        assert!(err.to_string().contains("200MB limit for Catbox"));
    }
}
