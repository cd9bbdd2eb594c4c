use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::{Input, Password, theme::ColorfulTheme};
use tracing::info;

use crate::{
    profile::{AWS_ACCESS_KEY_ID, AWS_MFA_DEVICE, AWS_SECRET_ACCESS_KEY},
    store::CredentialStore,
};

/// Values for an operator-managed long-term section.
#[derive(Clone)]
pub struct LongTermInput {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub mfa_device: Option<String>,
}

/// Write `input` into `section`, leaving every other section and unrelated key as is.
pub fn apply_long_term(store: &mut CredentialStore, section: &str, input: &LongTermInput) {
    store.set(section, AWS_ACCESS_KEY_ID, input.access_key_id.as_str());
    store.set(section, AWS_SECRET_ACCESS_KEY, input.secret_access_key.as_str());
    match input.mfa_device.as_deref() {
        Some(device) => store.set(section, AWS_MFA_DEVICE, device),
        None => {
            store.remove_option(section, AWS_MFA_DEVICE);
        }
    }
}

pub fn configure_interactive(path: &Path, section: &str) -> Result<()> {
    println!("Configuring long-term credentials in [{section}]");

    let mut store = CredentialStore::load_or_empty(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;

    let existing = store.has_section(section);
    if existing {
        println!("Press Enter to keep current values, or type new values.");
    }
    println!();

    let theme = ColorfulTheme::default();

    let current_key_id = store
        .get_opt(section, AWS_ACCESS_KEY_ID)
        .unwrap_or_default()
        .to_string();
    let access_key_id = Input::<String>::with_theme(&theme)
        .with_prompt("AWS Access Key ID")
        .default(current_key_id.clone())
        .allow_empty(!current_key_id.is_empty())
        .validate_with(|input: &String| {
            if input.trim().is_empty() {
                Err("AWS Access Key ID is required")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .context("Failed to read AWS Access Key ID")?;

    let current_secret = store
        .get_opt(section, AWS_SECRET_ACCESS_KEY)
        .map(str::to_string);
    let secret_prompt = match current_secret {
        Some(_) => "AWS Secret Access Key (leave empty to keep current)",
        None => "AWS Secret Access Key",
    };
    let entered_secret = Password::with_theme(&theme)
        .with_prompt(secret_prompt)
        .allow_empty_password(current_secret.is_some())
        .interact()
        .context("Failed to read AWS Secret Access Key")?;
    let secret_access_key = match (entered_secret.trim(), current_secret) {
        ("", Some(current)) => current,
        (entered, _) => entered.to_string(),
    };

    let mfa_device = Input::<String>::with_theme(&theme)
        .with_prompt("MFA device ARN (optional)")
        .default(
            store
                .get_opt(section, AWS_MFA_DEVICE)
                .unwrap_or_default()
                .to_string(),
        )
        .allow_empty(true)
        .interact_text()
        .context("Failed to read MFA device ARN")?;

    let input = LongTermInput {
        access_key_id: access_key_id.trim().to_string(),
        secret_access_key,
        mfa_device: Some(mfa_device.trim().to_string()).filter(|d| !d.is_empty()),
    };

    apply_long_term(&mut store, section, &input);
    store
        .save()
        .with_context(|| format!("Failed to write {}", store.path().display()))?;

    info!("Long-term credentials saved to [{}]", section);
    println!(
        "\nLong-term credentials saved to [{section}] in {}.",
        store.path().display()
    );
    Ok(())
}
