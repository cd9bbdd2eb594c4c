use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};

use crate::commands::{CompletionsCommand, ConfigureCommand, RefreshCommand};
use crate::constants::{self, DEFAULT_PROFILE, ENV_PROFILE};

#[derive(Debug, Clone, Parser)]
#[command(name = "mfa-renew", version, about = "Refresh MFA-backed AWS session credentials", long_about = None)]
pub struct Cli {
    #[arg(
        short = 'p',
        long,
        global = true,
        env = ENV_PROFILE,
        default_value = DEFAULT_PROFILE,
        help = "AWS profile name"
    )]
    pub profile: String,

    #[arg(
        long,
        global = true,
        value_name = "PATH",
        help = "Credentials file [default: $AWS_SHARED_CREDENTIALS_FILE or ~/.aws/credentials]"
    )]
    pub credentials_file: Option<PathBuf>,

    #[arg(short = 'v', long, global = true, action = ArgAction::Count, help = "Increase verbosity (-v info, -vv debug, -vvv trace)")]
    pub verbose: u8,

    // Used when no subcommand is given
    #[command(flatten)]
    pub refresh: RefreshCommand,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    #[command(about = "Renew short-term credentials if they are missing, stale or for another role")]
    Refresh(RefreshCommand),
    #[command(about = "Create or update the long-term credentials section")]
    Configure(ConfigureCommand),
    #[command(about = "Generate shell completion scripts for mfa-renew")]
    Completions(CompletionsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        let profile = self.profile;
        let credentials_file = self
            .credentials_file
            .or_else(constants::get_aws_credentials_path)
            .context("Failed to determine AWS credentials path")?;

        match self.command {
            None => self.refresh.execute(&profile, &credentials_file).await,
            Some(Commands::Refresh(cmd)) => {
                cmd.or(self.refresh)
                    .execute(&profile, &credentials_file)
                    .await
            }
            Some(Commands::Configure(cmd)) => cmd.execute(&profile, &credentials_file),
            Some(Commands::Completions(cmd)) => {
                cmd.execute();
                Ok(())
            }
        }
    }
}
