use std::path::Path;

use anyhow::Result;
use clap::Args;
use tracing::info;

use crate::{
    aws::sts::StsExchange,
    clock::SystemClock,
    constants::{DEFAULT_LONG_TERM_SUFFIX, ENV_ASSUME_ROLE, ENV_MFA_DEVICE, ENV_STS_DURATION},
    mfa::{MfaCodeSource, StaticCode, TerminalPrompt},
    refresh::{Outcome, RefreshOptions, Refresher, format_expiration},
    store::CredentialStore,
};

#[derive(Debug, Clone, Args)]
pub struct RefreshCommand {
    #[arg(long, env = ENV_MFA_DEVICE, help = "MFA device ARN")]
    pub device: Option<String>,

    #[arg(
        long,
        env = ENV_STS_DURATION,
        help = "Lifetime of the temporary credentials in seconds [default: 900]"
    )]
    pub duration: Option<i32>,

    #[arg(long, env = ENV_ASSUME_ROLE, help = "ARN of the IAM role to assume")]
    pub assume_role: Option<String>,

    #[arg(long, help = "Session name recorded for the assumed role")]
    pub role_session_name: Option<String>,

    #[arg(
        long,
        help = "Suffix of the long-term section ('none' for the bare profile name) [default: long-term]"
    )]
    pub long_term_suffix: Option<String>,

    #[arg(long, help = "Suffix of the short-term section [default: bare profile name]")]
    pub short_term_suffix: Option<String>,

    #[arg(long, help = "Renew even if the cached credentials are still valid")]
    pub force: bool,

    #[arg(long, help = "MFA code to use instead of prompting")]
    pub token: Option<String>,
}

impl RefreshCommand {
    /// Fill anything not given here from `outer`, the flags parsed before the subcommand.
    pub fn or(self, outer: RefreshCommand) -> RefreshCommand {
        RefreshCommand {
            device: self.device.or(outer.device),
            duration: self.duration.or(outer.duration),
            assume_role: self.assume_role.or(outer.assume_role),
            role_session_name: self.role_session_name.or(outer.role_session_name),
            long_term_suffix: self.long_term_suffix.or(outer.long_term_suffix),
            short_term_suffix: self.short_term_suffix.or(outer.short_term_suffix),
            force: self.force || outer.force,
            token: self.token.or(outer.token),
        }
    }

    fn options(&self) -> RefreshOptions {
        RefreshOptions {
            device: self.device.clone(),
            duration_seconds: self.duration,
            assume_role: self.assume_role.clone(),
            role_session_name: self.role_session_name.clone(),
            long_term_suffix: Some(
                self.long_term_suffix
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LONG_TERM_SUFFIX.to_string()),
            ),
            short_term_suffix: self.short_term_suffix.clone(),
            force: self.force,
        }
    }

    pub async fn execute(self, profile: &str, credentials_file: &Path) -> Result<()> {
        info!("Checking credentials for profile: {}", profile);

        let mut store = CredentialStore::load(credentials_file)?;

        let exchange = StsExchange::new();
        let clock = SystemClock;
        let prompt: Box<dyn MfaCodeSource> = match self.token.clone() {
            Some(code) => Box::new(StaticCode(code)),
            None => Box::new(TerminalPrompt),
        };

        let outcome = Refresher::new(&exchange, prompt.as_ref(), &clock)
            .reconcile(&mut store, Some(profile), &self.options())
            .await?;

        match outcome {
            Outcome::Kept {
                profile,
                expiration,
                remaining,
            } => {
                println!(
                    "Credentials in [{profile}] are still valid for {} seconds.",
                    remaining.num_seconds()
                );
                println!(
                    "Credentials will expire at: {} UTC",
                    format_expiration(&expiration)
                );
            }
            Outcome::Renewed {
                profile,
                duration_seconds,
                expiration,
                assumed_role,
                ..
            } => {
                match assumed_role {
                    Some(role) => println!(
                        "\nAssumed role {role}; credentials saved to [{profile}] for {duration_seconds} seconds."
                    ),
                    None => println!(
                        "\nSession credentials saved to [{profile}] for {duration_seconds} seconds."
                    ),
                }
                println!(
                    "Credentials will expire at: {} UTC",
                    format_expiration(&expiration)
                );
            }
        }

        Ok(())
    }
}
