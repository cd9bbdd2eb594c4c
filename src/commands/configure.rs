use std::path::Path;

use anyhow::Result;
use clap::Args;

use crate::{constants::DEFAULT_LONG_TERM_SUFFIX, profile, setup};

#[derive(Debug, Clone, Args)]
pub struct ConfigureCommand {
    #[arg(
        long,
        default_value = DEFAULT_LONG_TERM_SUFFIX,
        help = "Suffix of the long-term section ('none' for the bare profile name)"
    )]
    pub long_term_suffix: String,
}

impl ConfigureCommand {
    pub fn execute(self, profile: &str, credentials_file: &Path) -> Result<()> {
        let section = profile::section_name(profile, Some(&self.long_term_suffix));
        setup::configure_interactive(credentials_file, &section)
    }
}
