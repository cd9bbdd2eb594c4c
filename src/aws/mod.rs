use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub mod sts;

/// Operator-provided key pair from the long-term section. Never written by this tool.
#[derive(Clone)]
pub struct LongTermCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub mfa_device: Option<String>,
}

impl std::fmt::Debug for LongTermCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LongTermCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("mfa_device", &self.mfa_device)
            .finish()
    }
}

/// AWS temporary credentials structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemporaryCredential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: DateTime<Utc>,
}

/// Role to assume instead of a plain session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleRequest {
    pub role_arn: String,
    pub session_name: String,
}

/// Everything one exchange call needs, assembled at the moment of renewal.
#[derive(Debug, Clone)]
pub struct RefreshRequest {
    pub device_arn: String,
    pub duration_seconds: i32,
    pub role: Option<RoleRequest>,
    pub mfa_code: String,
}

/// Exchanges a long-term key pair plus an MFA code for temporary credentials.
///
/// Errors are provider-reported and passed through to the operator unchanged.
#[async_trait]
pub trait TokenExchange: Send + Sync {
    async fn get_session_token(
        &self,
        long_term: &LongTermCredentials,
        duration_seconds: i32,
        device_arn: &str,
        mfa_code: &str,
    ) -> anyhow::Result<TemporaryCredential>;

    async fn assume_role(
        &self,
        long_term: &LongTermCredentials,
        role_arn: &str,
        session_name: &str,
        duration_seconds: i32,
        device_arn: &str,
        mfa_code: &str,
    ) -> anyhow::Result<TemporaryCredential>;
}
