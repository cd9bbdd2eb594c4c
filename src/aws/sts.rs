use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_sts::{Client as StsClient, config::Credentials as StaticCredentials, types};
use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::{LongTermCredentials, TemporaryCredential, TokenExchange};
use crate::constants::DEFAULT_AWS_REGION;

const PROVIDER_NAME: &str = "mfa-renew-long-term";

/// Token exchange backed by AWS STS, signing with the long-term key pair.
#[derive(Debug, Clone, Default)]
pub struct StsExchange;

impl StsExchange {
    pub fn new() -> Self {
        Self
    }

    async fn client(&self, long_term: &LongTermCredentials) -> StsClient {
        StsClient::new(&load_config(long_term).await)
    }
}

// Priority: ENV vars -> Config file -> DEFAULT_AWS_REGION
async fn load_config(long_term: &LongTermCredentials) -> SdkConfig {
    let credentials = StaticCredentials::new(
        &long_term.access_key_id,
        &long_term.secret_access_key,
        None,
        None,
        PROVIDER_NAME,
    );

    let loaded = aws_config::defaults(BehaviorVersion::latest())
        .credentials_provider(credentials.clone())
        .load()
        .await;

    match loaded.region() {
        Some(region) => {
            debug!("Using region: {}", region);
            loaded
        }
        None => {
            debug!(
                "No region configured, using default {} for STS",
                DEFAULT_AWS_REGION
            );
            aws_config::defaults(BehaviorVersion::latest())
                .credentials_provider(credentials)
                .region(Region::new(DEFAULT_AWS_REGION))
                .load()
                .await
        }
    }
}

#[async_trait]
impl TokenExchange for StsExchange {
    async fn get_session_token(
        &self,
        long_term: &LongTermCredentials,
        duration_seconds: i32,
        device_arn: &str,
        mfa_code: &str,
    ) -> Result<TemporaryCredential> {
        info!("Calling AWS STS GetSessionToken");
        debug!("MFA device: {}", device_arn);
        debug!("Duration: {} seconds", duration_seconds);

        let response = self
            .client(long_term)
            .await
            .get_session_token()
            .duration_seconds(duration_seconds)
            .serial_number(device_arn)
            .token_code(mfa_code)
            .send()
            .await
            .context("GetSessionToken failed")?;

        let sts_creds = response
            .credentials()
            .context("AWS STS returned no credentials")?;

        to_temporary(sts_creds)
    }

    async fn assume_role(
        &self,
        long_term: &LongTermCredentials,
        role_arn: &str,
        session_name: &str,
        duration_seconds: i32,
        device_arn: &str,
        mfa_code: &str,
    ) -> Result<TemporaryCredential> {
        info!("Calling AWS STS AssumeRole");
        debug!("Role ARN: {}", role_arn);
        debug!("Role session name: {}", session_name);
        debug!("MFA device: {}", device_arn);
        debug!("Duration: {} seconds", duration_seconds);

        let response = self
            .client(long_term)
            .await
            .assume_role()
            .role_arn(role_arn)
            .role_session_name(session_name)
            .duration_seconds(duration_seconds)
            .serial_number(device_arn)
            .token_code(mfa_code)
            .send()
            .await
            .context("AssumeRole failed")?;

        let sts_creds = response
            .credentials()
            .context("AWS STS returned no credentials")?;

        to_temporary(sts_creds)
    }
}

fn to_temporary(sts_creds: &types::Credentials) -> Result<TemporaryCredential> {
    let expiration = to_utc(sts_creds.expiration())?;

    Ok(TemporaryCredential {
        access_key_id: sts_creds.access_key_id().to_string(),
        secret_access_key: sts_creds.secret_access_key().to_string(),
        session_token: sts_creds.session_token().to_string(),
        expiration,
    })
}

fn to_utc(expiration: &aws_smithy_types::DateTime) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(expiration.secs(), 0)
        .with_context(|| format!("AWS STS returned an out-of-range expiration: {expiration}"))
}
