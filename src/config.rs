// Runtime configuration. Everything has a built-in default; environment
// variables exist so the endpoints and the userhash file can be pointed
// elsewhere (tests, mirrors, portable installs).

use std::path::PathBuf;
use std::time::Duration;

use tracing::debug;

use crate::credential::CredentialStore;
use crate::error::CliError;

pub const DEFAULT_PERMANENT_URL: &str = "https://catbox.moe/user/api.php";
pub const DEFAULT_TEMPORARY_URL: &str = "https://litterbox.catbox.moe/resources/internals/api.php";

#[derive(Debug, Clone)]
pub struct Config {
    /// Catbox API endpoint.
    pub permanent_url: String,
    /// Litterbox API endpoint.
    pub temporary_url: String,
    /// Where the default userhash lives.
    pub credential_path: PathBuf,
    /// Whole-request timeout. `None` waits for as long as the upload takes.
    pub timeout: Option<Duration>,
}

impl Config {
    /// Build the configuration from `CATBOX_API_URL`, `LITTERBOX_API_URL`,
    /// `CATBOX_USERHASH_FILE` and `CATBOX_TIMEOUT_SECS`, falling back to the
    /// public endpoints and a `.userhash` file next to the executable.
    pub fn from_env() -> Result<Self, CliError> {
        let permanent_url =
            std::env::var("CATBOX_API_URL").unwrap_or_else(|_| DEFAULT_PERMANENT_URL.into());
        let temporary_url =
            std::env::var("LITTERBOX_API_URL").unwrap_or_else(|_| DEFAULT_TEMPORARY_URL.into());
        let credential_path = std::env::var_os("CATBOX_USERHASH_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(CredentialStore::default_path);
        let timeout = match std::env::var("CATBOX_TIMEOUT_SECS") {
            Ok(raw) => Some(parse_timeout(&raw)?),
            Err(_) => None,
        };

        let config = Config {
            permanent_url,
            temporary_url,
            credential_path,
            timeout,
        };
        debug!(?config, "configuration loaded");
        Ok(config)
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, CliError> {
    let secs: u64 = raw.trim().parse().map_err(|err| CliError::Config {
        var: "CATBOX_TIMEOUT_SECS",
        reason: format!("{raw:?} is not a whole number of seconds ({err})"),
    })?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_parses_whole_seconds() {
        assert_eq!(parse_timeout("90").unwrap(), Duration::from_secs(90));
        assert_eq!(parse_timeout(" 5 ").unwrap(), Duration::from_secs(5));
    }

    #[test]
    fn bad_timeout_is_a_config_error() {
        let err = parse_timeout("soon").unwrap_err();
        assert!(matches!(
            err,
            CliError::Config {
                var: "CATBOX_TIMEOUT_SECS",
                ..
            }
        ));
    }
}
