// Upload targets: the permanent store (Catbox) and the temporary host
// (Litterbox). A target decides the endpoint, the size ceiling and whether
// a userhash is sent along.

use std::fmt;
use std::str::FromStr;

use crate::config::Config;
use crate::error::CliError;

/// 200 MiB, the Catbox ceiling.
pub const PERMANENT_SIZE_LIMIT: u64 = 209_715_200;
/// 1 GiB, the Litterbox ceiling.
pub const TEMPORARY_SIZE_LIMIT: u64 = 1_073_741_824;

/// How long Litterbox keeps a temporary upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    OneHour,
    TwelveHours,
    OneDay,
    ThreeDays,
}

impl Ttl {
    pub const ALL: [Ttl; 4] = [Ttl::OneHour, Ttl::TwelveHours, Ttl::OneDay, Ttl::ThreeDays];

    /// Value sent in the `time` form field.
    pub fn as_str(self) -> &'static str {
        match self {
            Ttl::OneHour => "1h",
            Ttl::TwelveHours => "12h",
            Ttl::OneDay => "24h",
            Ttl::ThreeDays => "72h",
        }
    }
}

impl FromStr for Ttl {
    type Err = CliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ttl::ALL
            .into_iter()
            .find(|ttl| ttl.as_str() == s)
            .ok_or_else(|| CliError::InvalidTimeOption(s.to_string()))
    }
}

impl fmt::Display for Ttl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadTarget {
    Permanent,
    Temporary(Ttl),
}

impl UploadTarget {
    pub fn size_limit(&self) -> u64 {
        match self {
            UploadTarget::Permanent => PERMANENT_SIZE_LIMIT,
            UploadTarget::Temporary(_) => TEMPORARY_SIZE_LIMIT,
        }
    }

    /// Service name shown to the user.
    pub fn service_name(&self) -> &'static str {
        match self {
            UploadTarget::Permanent => "Catbox",
            UploadTarget::Temporary(_) => "Litterbox",
        }
    }

    /// Label used in the progress line, e.g. `Litterbox for 24h`.
    pub fn status_label(&self) -> String {
        match self {
            UploadTarget::Permanent => self.service_name().to_string(),
            UploadTarget::Temporary(ttl) => format!("{} for {}", self.service_name(), ttl),
        }
    }

    /// Only the permanent store knows about userhashes.
    pub fn accepts_credential(&self) -> bool {
        matches!(self, UploadTarget::Permanent)
    }

    pub fn endpoint<'a>(&self, config: &'a Config) -> &'a str {
        match self {
            UploadTarget::Permanent => &config.permanent_url,
            UploadTarget::Temporary(_) => &config.temporary_url,
        }
    }

    pub fn limit_message(&self) -> &'static str {
        match self {
            UploadTarget::Permanent => concat!(
                "File size exceeds the 200MB limit for Catbox. ",
                "Try using Litterbox instead (although temporary), check --help for details."
            ),
            UploadTarget::Temporary(_) => concat!(
                "File size exceeds the 1GB limit for Litterbox. ",
                "You will need to use another service."
            ),
        }
    }

    pub fn check_size(&self, size: u64) -> Result<(), CliError> {
        if size > self.size_limit() {
            return Err(CliError::SizeLimitExceeded { target: *self, size });
        }
        Ok(())
    }
}
