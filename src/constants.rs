use std::{env, path::PathBuf};

/// AWS configuration directory name
pub const AWS_CONFIG_DIR_NAME: &str = ".aws";

/// AWS shared credentials file name
pub const AWS_CREDENTIALS_FILE_NAME: &str = "credentials";

/// Overrides the shared credentials file location
pub const ENV_SHARED_CREDENTIALS_FILE: &str = "AWS_SHARED_CREDENTIALS_FILE";

/// Fallback for `--profile`
pub const ENV_PROFILE: &str = "AWS_PROFILE";

/// Fallback for `--device`
pub const ENV_MFA_DEVICE: &str = "MFA_DEVICE";

/// Fallback for `--duration`
pub const ENV_STS_DURATION: &str = "MFA_STS_DURATION";

/// Fallback for `--assume-role`
pub const ENV_ASSUME_ROLE: &str = "MFA_ASSUME_ROLE";

/// Profile used when none is given
pub const DEFAULT_PROFILE: &str = "default";

/// Session lifetime requested when neither flag nor environment provide one
pub const DEFAULT_DURATION_SECONDS: i32 = 900;

/// Suffix appended to the profile name to find the long-term section
pub const DEFAULT_LONG_TERM_SUFFIX: &str = "long-term";

/// Suffix value meaning "use the bare profile name"
pub const NO_SUFFIX: &str = "none";

/// Default AWS region for STS operations when no region is configured
pub const DEFAULT_AWS_REGION: &str = "us-east-1";

/// Format of the `expiration` key. No timezone suffix; always UTC.
pub const EXPIRATION_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Get the AWS credentials file path
/// Respects AWS_SHARED_CREDENTIALS_FILE environment variable if set
pub fn get_aws_credentials_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(ENV_SHARED_CREDENTIALS_FILE) {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|home| {
        home.join(AWS_CONFIG_DIR_NAME)
            .join(AWS_CREDENTIALS_FILE_NAME)
    })
}
