use crate::{
    aws::LongTermCredentials,
    constants::NO_SUFFIX,
    error::{Error, Result},
    store::CredentialStore,
};

pub const AWS_ACCESS_KEY_ID: &str = "aws_access_key_id";
pub const AWS_SECRET_ACCESS_KEY: &str = "aws_secret_access_key";
pub const AWS_MFA_DEVICE: &str = "aws_mfa_device";
pub const AWS_SESSION_TOKEN: &str = "aws_session_token";
/// Older SDKs read this name; it always mirrors `aws_session_token`.
pub const AWS_SECURITY_TOKEN: &str = "aws_security_token";
pub const ASSUMED_ROLE: &str = "assumed_role";
pub const ASSUMED_ROLE_ARN: &str = "assumed_role_arn";
pub const EXPIRATION: &str = "expiration";

/// Keys a cached short-term section must carry to be considered for reuse.
pub const SHORT_TERM_REQUIRED_KEYS: [&str; 6] = [
    ASSUMED_ROLE,
    AWS_ACCESS_KEY_ID,
    AWS_SECRET_ACCESS_KEY,
    AWS_SESSION_TOKEN,
    AWS_SECURITY_TOKEN,
    EXPIRATION,
];

/// Section names for one logical profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileNames {
    pub long_term: String,
    pub short_term: String,
}

impl ProfileNames {
    /// Build names from explicit suffixes. A suffix of `none` (or no suffix) means
    /// the bare profile name.
    pub fn with_suffixes(
        profile: &str,
        long_term_suffix: Option<&str>,
        short_term_suffix: Option<&str>,
    ) -> Result<Self> {
        let names = Self {
            long_term: section_name(profile, long_term_suffix),
            short_term: section_name(profile, short_term_suffix),
        };

        if names.long_term == names.short_term {
            return Err(Error::ProfileNameCollision(names.long_term));
        }
        Ok(names)
    }
}

/// `<profile>-<suffix>`, or the bare profile name when the suffix is absent, empty or `none`.
pub fn section_name(profile: &str, suffix: Option<&str>) -> String {
    match suffix {
        None | Some("") => profile.to_string(),
        Some(s) if s.eq_ignore_ascii_case(NO_SUFFIX) => profile.to_string(),
        Some(s) => format!("{profile}-{s}"),
    }
}

/// Read the operator-managed key pair from `section`.
pub fn load_long_term(store: &CredentialStore, section: &str) -> Result<LongTermCredentials> {
    if !store.has_section(section) {
        return Err(Error::MissingLongTermCredentials {
            section: section.to_string(),
        });
    }

    Ok(LongTermCredentials {
        access_key_id: store.get(section, AWS_ACCESS_KEY_ID)?.to_string(),
        secret_access_key: store.get(section, AWS_SECRET_ACCESS_KEY)?.to_string(),
        mfa_device: store.get_opt(section, AWS_MFA_DEVICE).map(str::to_string),
    })
}

/// First required key absent from the short-term section, if any.
pub fn first_missing_short_term_key(
    store: &CredentialStore,
    section: &str,
) -> Option<&'static str> {
    SHORT_TERM_REQUIRED_KEYS
        .into_iter()
        .find(|key| !store.has_option(section, key))
}
