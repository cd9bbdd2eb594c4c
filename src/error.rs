use std::{io, path::PathBuf};

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every way a single invocation can fail. None of these are retried.
#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "credentials file not found at {}. Create it or run `mfa-renew configure` first",
        .0.display()
    )]
    MissingFile(PathBuf),

    #[error("failed to read credentials file {}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: ini::Error,
    },

    #[error("failed to write credentials file {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("section [{0}] not found in credentials file")]
    MissingSection(String),

    #[error("key '{key}' not found in section [{section}]")]
    MissingOption { section: String, key: String },

    #[error(
        "long-term credentials section [{section}] is missing. \
         Add it to the credentials file manually or run `mfa-renew configure`"
    )]
    MissingLongTermCredentials { section: String },

    #[error(
        "no MFA device for profile '{profile}'. Pass --device, set MFA_DEVICE, \
         or add aws_mfa_device to the long-term section"
    )]
    MissingDevice { profile: String },

    #[error("a role session name is required to assume a role (--role-session-name)")]
    MissingRoleSessionName,

    #[error(
        "long-term and short-term sections would both be [{0}]; \
         adjust --long-term-suffix or --short-term-suffix"
    )]
    ProfileNameCollision(String),

    #[error("failed to read MFA code")]
    Prompt(#[source] anyhow::Error),

    #[error("token exchange failed")]
    Exchange(#[source] anyhow::Error),
}
