//! Keeps MFA-backed AWS session credentials fresh in the shared credentials file.
//!
//! A long-term key pair lives in `[<profile>-long-term]`; temporary credentials
//! obtained with an MFA code are cached in `[<profile>]` and only renewed when
//! they are missing, incomplete, expired, or bound to a different role.

pub mod aws;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod constants;
pub mod error;
pub mod mfa;
pub mod profile;
pub mod refresh;
pub mod setup;
pub mod store;

pub use error::{Error, Result};
