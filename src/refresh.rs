//! Decides whether the cached short-term credentials can be kept, and renews them when not.
//!
//! The decision itself is [`decide`], a pure function of the store contents, the
//! requested role and the current time. [`Refresher::reconcile`] wraps it with
//! input resolution, the MFA prompt, the token exchange and the single save.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use tracing::{debug, info, warn};

use crate::{
    aws::{LongTermCredentials, RefreshRequest, RoleRequest, TemporaryCredential, TokenExchange},
    clock::Clock,
    constants::{
        DEFAULT_DURATION_SECONDS, DEFAULT_LONG_TERM_SUFFIX, DEFAULT_PROFILE, EXPIRATION_FORMAT,
    },
    error::{Error, Result},
    mfa::MfaCodeSource,
    profile::{
        self, ASSUMED_ROLE, ASSUMED_ROLE_ARN, AWS_ACCESS_KEY_ID, AWS_SECRET_ACCESS_KEY,
        AWS_SECURITY_TOKEN, AWS_SESSION_TOKEN, EXPIRATION, ProfileNames,
    },
    store::CredentialStore,
};

/// Caller-supplied inputs. Flag and environment values are already merged here;
/// stored values and defaults are applied by [`Refresher::reconcile`].
#[derive(Debug, Clone)]
pub struct RefreshOptions {
    pub device: Option<String>,
    pub duration_seconds: Option<i32>,
    pub assume_role: Option<String>,
    pub role_session_name: Option<String>,
    pub long_term_suffix: Option<String>,
    pub short_term_suffix: Option<String>,
    pub force: bool,
}

impl Default for RefreshOptions {
    fn default() -> Self {
        Self {
            device: None,
            duration_seconds: None,
            assume_role: None,
            role_session_name: None,
            long_term_suffix: Some(DEFAULT_LONG_TERM_SUFFIX.to_string()),
            short_term_suffix: None,
            force: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewReason {
    /// No short-term section yet
    Absent,
    /// Short-term section lacks this required key
    Incomplete(&'static str),
    /// Cached credentials are plain session tokens but a role was requested
    EnterRole,
    /// Cached credentials belong to a role but none was requested
    LeaveRole,
    /// Cached credentials belong to a different role
    SwitchRole,
    Expired,
    InvalidExpiration,
    Forced,
}

impl std::fmt::Display for RenewReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Absent => write!(f, "no short-term credentials found"),
            Self::Incomplete(key) => write!(f, "short-term credentials are missing '{key}'"),
            Self::EnterRole => write!(f, "switching to an assumed role"),
            Self::LeaveRole => write!(f, "switching from an assumed role to a session token"),
            Self::SwitchRole => write!(f, "switching to a different role"),
            Self::Expired => write!(f, "short-term credentials have expired"),
            Self::InvalidExpiration => write!(f, "short-term expiration could not be parsed"),
            Self::Forced => write!(f, "renewal forced"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Keep {
        expiration: DateTime<Utc>,
        remaining: TimeDelta,
    },
    Renew(RenewReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Kept {
        profile: String,
        expiration: DateTime<Utc>,
        remaining: TimeDelta,
    },
    Renewed {
        profile: String,
        reason: RenewReason,
        duration_seconds: i32,
        expiration: DateTime<Utc>,
        assumed_role: Option<String>,
    },
}

/// Pick KEEP or RENEW for the short-term `section`.
pub fn decide(
    store: &CredentialStore,
    section: &str,
    requested_role: Option<&str>,
    now: DateTime<Utc>,
) -> Decision {
    if !store.has_section(section) {
        return Decision::Renew(RenewReason::Absent);
    }

    if let Some(key) = profile::first_missing_short_term_key(store, section) {
        return Decision::Renew(RenewReason::Incomplete(key));
    }

    let current_role = store.get_opt(section, ASSUMED_ROLE_ARN);
    match (current_role, requested_role) {
        (None, Some(_)) => return Decision::Renew(RenewReason::EnterRole),
        (Some(_), None) => return Decision::Renew(RenewReason::LeaveRole),
        (Some(current), Some(requested)) if current != requested => {
            return Decision::Renew(RenewReason::SwitchRole);
        }
        _ => {}
    }

    let raw = store.get_opt(section, EXPIRATION).unwrap_or_default();
    let Some(expiration) = parse_expiration(raw) else {
        warn!("Unparseable expiration '{}' in [{}]", raw, section);
        return Decision::Renew(RenewReason::InvalidExpiration);
    };

    let remaining = expiration - now;
    if remaining <= TimeDelta::zero() {
        Decision::Renew(RenewReason::Expired)
    } else {
        Decision::Keep {
            expiration,
            remaining,
        }
    }
}

pub fn format_expiration(expiration: &DateTime<Utc>) -> String {
    expiration.format(EXPIRATION_FORMAT).to_string()
}

pub fn parse_expiration(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), EXPIRATION_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Overwrite the short-term section with freshly issued credentials.
///
/// Keys this tool does not own are left in place.
pub fn write_short_term(
    store: &mut CredentialStore,
    section: &str,
    creds: &TemporaryCredential,
    role_arn: Option<&str>,
) {
    store.set(section, ASSUMED_ROLE, role_arn.is_some().to_string());
    match role_arn {
        Some(arn) => store.set(section, ASSUMED_ROLE_ARN, arn),
        None => {
            store.remove_option(section, ASSUMED_ROLE_ARN);
        }
    }
    store.set(section, AWS_ACCESS_KEY_ID, creds.access_key_id.as_str());
    store.set(section, AWS_SECRET_ACCESS_KEY, creds.secret_access_key.as_str());
    store.set(section, AWS_SESSION_TOKEN, creds.session_token.as_str());
    store.set(section, AWS_SECURITY_TOKEN, creds.session_token.as_str());
    store.set(section, EXPIRATION, format_expiration(&creds.expiration));
}

/// Runs one reconcile against injected collaborators.
pub struct Refresher<'a> {
    exchange: &'a dyn TokenExchange,
    mfa: &'a dyn MfaCodeSource,
    clock: &'a dyn Clock,
}

impl<'a> Refresher<'a> {
    pub fn new(
        exchange: &'a dyn TokenExchange,
        mfa: &'a dyn MfaCodeSource,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            exchange,
            mfa,
            clock,
        }
    }

    /// Keep or renew the short-term credentials for `profile` (default: `default`).
    ///
    /// The store is saved only after a successful exchange, so any failure leaves
    /// the file exactly as it was.
    pub async fn reconcile(
        &self,
        store: &mut CredentialStore,
        profile: Option<&str>,
        options: &RefreshOptions,
    ) -> Result<Outcome> {
        let profile = profile.unwrap_or(DEFAULT_PROFILE);
        let names = ProfileNames::with_suffixes(
            profile,
            options.long_term_suffix.as_deref(),
            options.short_term_suffix.as_deref(),
        )?;
        debug!(
            "Long-term section: [{}], short-term section: [{}]",
            names.long_term, names.short_term
        );

        let long_term = profile::load_long_term(store, &names.long_term)?;

        let device_arn = non_empty(options.device.as_deref())
            .or_else(|| non_empty(long_term.mfa_device.as_deref()))
            .map(str::to_string)
            .ok_or_else(|| Error::MissingDevice {
                profile: profile.to_string(),
            })?;
        let duration_seconds = options.duration_seconds.unwrap_or(DEFAULT_DURATION_SECONDS);
        let requested_role = non_empty(options.assume_role.as_deref());

        let decision = if options.force {
            Decision::Renew(RenewReason::Forced)
        } else {
            decide(store, &names.short_term, requested_role, self.clock.now())
        };

        let reason = match decision {
            Decision::Keep {
                expiration,
                remaining,
            } => {
                info!(
                    "Credentials for [{}] still valid for {} seconds",
                    names.short_term,
                    remaining.num_seconds()
                );
                return Ok(Outcome::Kept {
                    profile: names.short_term,
                    expiration,
                    remaining,
                });
            }
            Decision::Renew(reason) => reason,
        };
        info!("Renewing credentials for [{}]: {}", names.short_term, reason);

        let role = match requested_role {
            Some(role_arn) => Some(RoleRequest {
                role_arn: role_arn.to_string(),
                session_name: non_empty(options.role_session_name.as_deref())
                    .ok_or(Error::MissingRoleSessionName)?
                    .to_string(),
            }),
            None => None,
        };

        let mfa_code = self
            .mfa
            .code(&device_arn, duration_seconds)
            .map_err(Error::Prompt)?;

        let request = RefreshRequest {
            device_arn,
            duration_seconds,
            role,
            mfa_code,
        };
        let creds = self.exchange_for(&long_term, &request).await?;

        let role_arn = request.role.as_ref().map(|r| r.role_arn.as_str());
        write_short_term(store, &names.short_term, &creds, role_arn);
        store.save()?;

        info!(
            "Saved new credentials to [{}], expiring at {}",
            names.short_term,
            format_expiration(&creds.expiration)
        );

        Ok(Outcome::Renewed {
            profile: names.short_term,
            reason,
            duration_seconds,
            expiration: creds.expiration,
            assumed_role: role_arn.map(str::to_string),
        })
    }

    async fn exchange_for(
        &self,
        long_term: &LongTermCredentials,
        request: &RefreshRequest,
    ) -> Result<TemporaryCredential> {
        let result = match &request.role {
            Some(role) => {
                self.exchange
                    .assume_role(
                        long_term,
                        &role.role_arn,
                        &role.session_name,
                        request.duration_seconds,
                        &request.device_arn,
                        &request.mfa_code,
                    )
                    .await
            }
            None => {
                self.exchange
                    .get_session_token(
                        long_term,
                        request.duration_seconds,
                        &request.device_arn,
                        &request.mfa_code,
                    )
                    .await
            }
        };

        result.map_err(Error::Exchange)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::profile::{AWS_MFA_DEVICE, SHORT_TERM_REQUIRED_KEYS};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const DEVICE: &str = "arn:aws:iam::123:mfa/x";

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        SessionToken {
            duration: i32,
            device: String,
            code: String,
        },
        AssumeRole {
            role_arn: String,
            session_name: String,
            duration: i32,
            device: String,
            code: String,
        },
    }

    struct FakeExchange {
        calls: Mutex<Vec<Call>>,
        fail: bool,
    }

    impl FakeExchange {
        fn ok() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn respond(&self, call: Call) -> anyhow::Result<TemporaryCredential> {
            self.calls.lock().unwrap().push(call);
            if self.fail {
                return Err(anyhow!(
                    "MultiFactorAuthentication failed with invalid MFA one time pass code"
                ));
            }
            Ok(issued())
        }
    }

    #[async_trait]
    impl TokenExchange for FakeExchange {
        async fn get_session_token(
            &self,
            _long_term: &LongTermCredentials,
            duration_seconds: i32,
            device_arn: &str,
            mfa_code: &str,
        ) -> anyhow::Result<TemporaryCredential> {
            self.respond(Call::SessionToken {
                duration: duration_seconds,
                device: device_arn.to_string(),
                code: mfa_code.to_string(),
            })
        }

        async fn assume_role(
            &self,
            _long_term: &LongTermCredentials,
            role_arn: &str,
            session_name: &str,
            duration_seconds: i32,
            device_arn: &str,
            mfa_code: &str,
        ) -> anyhow::Result<TemporaryCredential> {
            self.respond(Call::AssumeRole {
                role_arn: role_arn.to_string(),
                session_name: session_name.to_string(),
                duration: duration_seconds,
                device: device_arn.to_string(),
                code: mfa_code.to_string(),
            })
        }
    }

    #[derive(Default)]
    struct CountingCode {
        prompts: AtomicUsize,
    }

    impl MfaCodeSource for CountingCode {
        fn code(&self, _device_arn: &str, _duration_seconds: i32) -> anyhow::Result<String> {
            self.prompts.fetch_add(1, Ordering::SeqCst);
            Ok("123456".to_string())
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn issued() -> TemporaryCredential {
        TemporaryCredential {
            access_key_id: "ASIANEW".to_string(),
            secret_access_key: "new-secret".to_string(),
            session_token: "new-token".to_string(),
            expiration: Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap(),
        }
    }

    fn store_path(dir: &TempDir) -> PathBuf {
        dir.path().join("credentials")
    }

    fn long_term_store(path: PathBuf) -> CredentialStore {
        let mut store = CredentialStore::empty(path);
        store.set("default-long-term", AWS_ACCESS_KEY_ID, "AKIAEXAMPLE");
        store.set("default-long-term", AWS_SECRET_ACCESS_KEY, "secret");
        store.set("default-long-term", AWS_MFA_DEVICE, DEVICE);
        store
    }

    fn cached(store: &mut CredentialStore, role: Option<&str>, expiration: DateTime<Utc>) {
        store.set("default", ASSUMED_ROLE, role.is_some().to_string());
        if let Some(role) = role {
            store.set("default", ASSUMED_ROLE_ARN, role);
        }
        store.set("default", AWS_ACCESS_KEY_ID, "ASIAOLD");
        store.set("default", AWS_SECRET_ACCESS_KEY, "old-secret");
        store.set("default", AWS_SESSION_TOKEN, "old-token");
        store.set("default", AWS_SECURITY_TOKEN, "old-token");
        store.set("default", EXPIRATION, format_expiration(&expiration));
    }

    fn with_role(role: &str) -> RefreshOptions {
        RefreshOptions {
            assume_role: Some(role.to_string()),
            role_session_name: Some("alice".to_string()),
            ..RefreshOptions::default()
        }
    }

    #[test]
    fn test_decide_absent() {
        let store = long_term_store(PathBuf::from("unused"));
        assert_eq!(
            decide(&store, "default", None, now()),
            Decision::Renew(RenewReason::Absent)
        );
        assert_eq!(
            decide(&store, "default", Some("roleA"), now()),
            Decision::Renew(RenewReason::Absent)
        );
    }

    #[test]
    fn test_decide_each_missing_field() {
        for key in SHORT_TERM_REQUIRED_KEYS {
            let mut store = long_term_store(PathBuf::from("unused"));
            cached(&mut store, None, now() + TimeDelta::hours(1));
            store.remove_option("default", key);

            assert_eq!(
                decide(&store, "default", None, now()),
                Decision::Renew(RenewReason::Incomplete(key)),
                "missing {key}"
            );
        }
    }

    #[test]
    fn test_decide_role_transitions() {
        let later = now() + TimeDelta::hours(1);

        let mut plain = long_term_store(PathBuf::from("unused"));
        cached(&mut plain, None, later);
        assert_eq!(
            decide(&plain, "default", Some("roleB"), now()),
            Decision::Renew(RenewReason::EnterRole)
        );

        let mut role_a = long_term_store(PathBuf::from("unused"));
        cached(&mut role_a, Some("roleA"), later);
        assert_eq!(
            decide(&role_a, "default", None, now()),
            Decision::Renew(RenewReason::LeaveRole)
        );
        assert_eq!(
            decide(&role_a, "default", Some("roleB"), now()),
            Decision::Renew(RenewReason::SwitchRole)
        );
        assert!(matches!(
            decide(&role_a, "default", Some("roleA"), now()),
            Decision::Keep { .. }
        ));
    }

    #[test]
    fn test_decide_expiry_boundaries() {
        let mut store = long_term_store(PathBuf::from("unused"));

        cached(&mut store, None, now() + TimeDelta::seconds(10));
        assert_eq!(
            decide(&store, "default", None, now()),
            Decision::Keep {
                expiration: now() + TimeDelta::seconds(10),
                remaining: TimeDelta::seconds(10),
            }
        );

        cached(&mut store, None, now());
        assert_eq!(
            decide(&store, "default", None, now()),
            Decision::Renew(RenewReason::Expired)
        );

        cached(&mut store, None, now() - TimeDelta::seconds(1));
        assert_eq!(
            decide(&store, "default", None, now()),
            Decision::Renew(RenewReason::Expired)
        );
    }

    #[test]
    fn test_decide_keeps_sub_second_remainder() {
        let mut store = long_term_store(PathBuf::from("unused"));
        cached(&mut store, None, now() + TimeDelta::seconds(1));
        let almost = now() + TimeDelta::milliseconds(500);

        assert_eq!(
            decide(&store, "default", None, almost),
            Decision::Keep {
                expiration: now() + TimeDelta::seconds(1),
                remaining: TimeDelta::milliseconds(500),
            }
        );
    }

    #[test]
    fn test_decide_invalid_expiration() {
        let mut store = long_term_store(PathBuf::from("unused"));
        cached(&mut store, None, now() + TimeDelta::hours(1));
        store.set("default", EXPIRATION, "2024-01-01T01:00:00Z");

        assert_eq!(
            decide(&store, "default", None, now()),
            Decision::Renew(RenewReason::InvalidExpiration)
        );
    }

    #[test]
    fn test_expiration_format_round_trip() {
        let expiration = Utc.with_ymd_and_hms(2024, 1, 1, 0, 5, 0).unwrap();
        assert_eq!(format_expiration(&expiration), "2024-01-01 00:05:00");
        assert_eq!(parse_expiration("2024-01-01 00:05:00"), Some(expiration));
        assert_eq!(parse_expiration("not a date"), None);
    }

    #[tokio::test]
    async fn test_end_to_end_session_token() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let mut store = CredentialStore::empty(&path);
        store.set("default-long-term", AWS_ACCESS_KEY_ID, "AKIAEXAMPLE");
        store.set("default-long-term", AWS_SECRET_ACCESS_KEY, "secret");
        store.save().unwrap();
        let mut store = CredentialStore::load(&path).unwrap();

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());
        let options = RefreshOptions {
            device: Some(DEVICE.to_string()),
            duration_seconds: Some(900),
            ..RefreshOptions::default()
        };

        let outcome = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, Some("default"), &options)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Renewed {
                profile: "default".to_string(),
                reason: RenewReason::Absent,
                duration_seconds: 900,
                expiration: issued().expiration,
                assumed_role: None,
            }
        );
        assert_eq!(
            exchange.calls(),
            vec![Call::SessionToken {
                duration: 900,
                device: DEVICE.to_string(),
                code: "123456".to_string(),
            }]
        );

        let saved = CredentialStore::load(&path).unwrap();
        assert_eq!(saved.get("default", ASSUMED_ROLE).unwrap(), "false");
        assert!(!saved.has_option("default", ASSUMED_ROLE_ARN));
        assert_eq!(saved.get("default", AWS_ACCESS_KEY_ID).unwrap(), "ASIANEW");
        assert_eq!(saved.get("default", AWS_SECRET_ACCESS_KEY).unwrap(), "new-secret");
        assert_eq!(saved.get("default", AWS_SESSION_TOKEN).unwrap(), "new-token");
        assert_eq!(saved.get("default", AWS_SECURITY_TOKEN).unwrap(), "new-token");
        assert_eq!(saved.get("default", EXPIRATION).unwrap(), "2024-01-01 00:05:00");
        assert_eq!(
            saved.options("default-long-term"),
            vec![
                (AWS_ACCESS_KEY_ID, "AKIAEXAMPLE"),
                (AWS_SECRET_ACCESS_KEY, "secret"),
            ]
        );
    }

    #[tokio::test]
    async fn test_keep_does_not_prompt_or_write() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let mut store = long_term_store(path.clone());
        cached(&mut store, None, now() + TimeDelta::seconds(10));

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());

        let outcome = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &RefreshOptions::default())
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Kept {
                profile: "default".to_string(),
                expiration: now() + TimeDelta::seconds(10),
                remaining: TimeDelta::seconds(10),
            }
        );
        assert!(exchange.calls().is_empty());
        assert_eq!(code.prompts.load(Ordering::SeqCst), 0);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_keep_matching_role() {
        let dir = TempDir::new().unwrap();
        let mut store = long_term_store(store_path(&dir));
        cached(&mut store, Some("roleA"), now() + TimeDelta::seconds(10));

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());

        let outcome = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &with_role("roleA"))
            .await
            .unwrap();

        assert!(matches!(outcome, Outcome::Kept { .. }));
        assert!(exchange.calls().is_empty());
    }

    #[tokio::test]
    async fn test_expired_renews() {
        let dir = TempDir::new().unwrap();
        let mut store = long_term_store(store_path(&dir));
        cached(&mut store, None, now() - TimeDelta::minutes(5));

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());

        let outcome = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &RefreshOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::Renewed {
                reason: RenewReason::Expired,
                ..
            }
        ));
        assert_eq!(code.prompts.load(Ordering::SeqCst), 1);
        assert_eq!(store.get("default", AWS_ACCESS_KEY_ID).unwrap(), "ASIANEW");
    }

    #[tokio::test]
    async fn test_force_renews_valid_credentials() {
        let dir = TempDir::new().unwrap();
        let mut store = long_term_store(store_path(&dir));
        cached(&mut store, None, now() + TimeDelta::hours(1));

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());
        let options = RefreshOptions {
            force: true,
            ..RefreshOptions::default()
        };

        let outcome = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &options)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::Renewed {
                reason: RenewReason::Forced,
                ..
            }
        ));
        assert_eq!(exchange.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_leaving_role_drops_role_arn() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let mut store = long_term_store(path.clone());
        cached(&mut store, Some("roleA"), now() + TimeDelta::hours(1));

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());

        let outcome = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &RefreshOptions::default())
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::Renewed {
                reason: RenewReason::LeaveRole,
                assumed_role: None,
                ..
            }
        ));
        assert!(matches!(
            exchange.calls().as_slice(),
            [Call::SessionToken { .. }]
        ));

        let saved = CredentialStore::load(&path).unwrap();
        assert_eq!(saved.get("default", ASSUMED_ROLE).unwrap(), "false");
        assert!(!saved.has_option("default", ASSUMED_ROLE_ARN));
    }

    #[tokio::test]
    async fn test_entering_role_records_role_arn() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let mut store = long_term_store(path.clone());
        cached(&mut store, None, now() + TimeDelta::hours(1));

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());
        let options = RefreshOptions {
            duration_seconds: Some(3600),
            ..with_role("roleB")
        };

        let outcome = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &options)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::Renewed {
                reason: RenewReason::EnterRole,
                duration_seconds: 3600,
                ..
            }
        ));
        assert_eq!(
            exchange.calls(),
            vec![Call::AssumeRole {
                role_arn: "roleB".to_string(),
                session_name: "alice".to_string(),
                duration: 3600,
                device: DEVICE.to_string(),
                code: "123456".to_string(),
            }]
        );

        let saved = CredentialStore::load(&path).unwrap();
        assert_eq!(saved.get("default", ASSUMED_ROLE).unwrap(), "true");
        assert_eq!(saved.get("default", ASSUMED_ROLE_ARN).unwrap(), "roleB");
    }

    #[tokio::test]
    async fn test_missing_long_term_section() {
        let dir = TempDir::new().unwrap();
        let mut store = CredentialStore::empty(store_path(&dir));

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());

        let err = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, Some("dev"), &RefreshOptions::default())
            .await
            .unwrap_err();

        assert!(
            matches!(err, Error::MissingLongTermCredentials { section } if section == "dev-long-term")
        );
    }

    #[tokio::test]
    async fn test_missing_device() {
        let dir = TempDir::new().unwrap();
        let mut store = long_term_store(store_path(&dir));
        store.remove_option("default-long-term", AWS_MFA_DEVICE);

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());

        let err = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &RefreshOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingDevice { profile } if profile == "default"));
    }

    #[tokio::test]
    async fn test_explicit_device_wins_over_stored() {
        let dir = TempDir::new().unwrap();
        let mut store = long_term_store(store_path(&dir));

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());
        let options = RefreshOptions {
            device: Some("arn:aws:iam::123:mfa/other".to_string()),
            ..RefreshOptions::default()
        };

        Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &options)
            .await
            .unwrap();

        assert_eq!(
            exchange.calls(),
            vec![Call::SessionToken {
                duration: DEFAULT_DURATION_SECONDS,
                device: "arn:aws:iam::123:mfa/other".to_string(),
                code: "123456".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn test_missing_role_session_name() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let mut store = long_term_store(path.clone());

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());
        let options = RefreshOptions {
            role_session_name: None,
            ..with_role("roleA")
        };

        let err = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &options)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::MissingRoleSessionName));
        assert_eq!(code.prompts.load(Ordering::SeqCst), 0);
        assert!(exchange.calls().is_empty());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_exchange_failure_leaves_store_untouched() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let mut store = long_term_store(path.clone());
        cached(&mut store, None, now() - TimeDelta::minutes(1));
        store.save().unwrap();
        let before = std::fs::read_to_string(&path).unwrap();

        let exchange = FakeExchange::failing();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());

        let err = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &RefreshOptions::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Exchange(_)));
        let provider = std::error::Error::source(&err).map(ToString::to_string);
        assert!(
            provider
                .unwrap_or_default()
                .contains("invalid MFA one time pass code")
        );
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert_eq!(store.get("default", AWS_ACCESS_KEY_ID).unwrap(), "ASIAOLD");
    }

    #[tokio::test]
    async fn test_custom_short_term_suffix() {
        let dir = TempDir::new().unwrap();
        let path = store_path(&dir);
        let mut store = long_term_store(path.clone());
        cached(&mut store, None, now() + TimeDelta::hours(1));

        let exchange = FakeExchange::ok();
        let code = CountingCode::default();
        let clock = FixedClock::new(now());
        let options = RefreshOptions {
            short_term_suffix: Some("mfa".to_string()),
            ..RefreshOptions::default()
        };

        let outcome = Refresher::new(&exchange, &code, &clock)
            .reconcile(&mut store, None, &options)
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            Outcome::Renewed { ref profile, reason: RenewReason::Absent, .. } if profile == "default-mfa"
        ));
        let saved = CredentialStore::load(&path).unwrap();
        assert_eq!(saved.get("default-mfa", AWS_ACCESS_KEY_ID).unwrap(), "ASIANEW");
        assert_eq!(saved.get("default", AWS_ACCESS_KEY_ID).unwrap(), "ASIAOLD");
    }
}
