use anyhow::{Context, Result};
use dialoguer::{Input, theme::ColorfulTheme};

/// Supplies the MFA one-time code at the moment of renewal.
pub trait MfaCodeSource: Send + Sync {
    fn code(&self, device_arn: &str, duration_seconds: i32) -> Result<String>;
}

/// Reads the code from the terminal. Blocks until the operator answers.
#[derive(Debug, Clone, Default)]
pub struct TerminalPrompt;

impl MfaCodeSource for TerminalPrompt {
    fn code(&self, device_arn: &str, duration_seconds: i32) -> Result<String> {
        let code = Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Enter AWS MFA code for device [{device_arn}] (renewing for {duration_seconds} seconds)"
            ))
            .validate_with(|input: &String| validate_code(input))
            .interact_text()
            .context("Failed to read MFA code")?;

        Ok(code.trim().to_string())
    }
}

/// Code handed over up front, e.g. from a password manager or a test.
#[derive(Debug, Clone)]
pub struct StaticCode(pub String);

impl MfaCodeSource for StaticCode {
    fn code(&self, _device_arn: &str, _duration_seconds: i32) -> Result<String> {
        Ok(self.0.clone())
    }
}

fn validate_code(input: &str) -> Result<(), &'static str> {
    let code = input.trim();
    if code.is_empty() {
        Err("MFA code is required")
    } else if !code.chars().all(|c| c.is_ascii_digit()) {
        Err("MFA code must contain digits only")
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_code() {
        assert!(validate_code("123456").is_ok());
        assert!(validate_code(" 123456 ").is_ok());
        assert!(validate_code("").is_err());
        assert!(validate_code("   ").is_err());
        assert!(validate_code("12a456").is_err());
    }

    #[test]
    fn test_static_code() {
        let source = StaticCode("654321".to_string());
        assert_eq!(source.code("arn:aws:iam::123:mfa/x", 900).unwrap(), "654321");
    }
}
