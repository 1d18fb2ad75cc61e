use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use argon2::password_hash::{SaltString, rand_core::OsRng};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};
use utoipa::ToSchema;

/// Number of sent verification mails kept for inspection.
pub const OUTBOX_CAPACITY: usize = 64;

static EMAIL_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("regex compiles"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub uid: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub email_verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Please verify your email before logging in.")]
    EmailNotVerified,
    #[error("An account with this email already exists")]
    EmailAlreadyInUse,
    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("'{0}' is not a valid email address")]
    InvalidEmail(String),
    #[error("Verification code is invalid or has already been used")]
    InvalidVerificationCode,
    #[error("Not signed in")]
    NotSignedIn,
    #[error("Identity service unavailable")]
    Unavailable,
}

/// The external identity service the marketplace authenticates against.
pub trait IdentityProvider: Send + Sync {
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity, AuthError>;

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError>;

    /// Sends a verification link for `identity`'s email address.
    fn send_verification(&self, identity: &Identity) -> Result<(), AuthError>;

    /// Completes a verification link and returns the now verified identity.
    fn confirm_verification(&self, code: &str) -> Result<Identity, AuthError>;

    fn lookup(&self, uid: &str) -> Option<Identity>;
}

/// A verification message that would have been mailed out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationMail {
    pub email: String,
    pub code: String,
}

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Accounts {
    by_email: HashMap<String, Account>,
    pending_codes: HashMap<String, String>,
    outbox: VecDeque<VerificationMail>,
}

impl Accounts {
    fn by_uid_mut(&mut self, uid: &str) -> Option<&mut Account> {
        self.by_email
            .values_mut()
            .find(|account| account.identity.uid == uid)
    }
}

/// Process-local identity service. Accounts are lost on restart.
#[derive(Debug)]
pub struct InMemoryIdentityProvider {
    min_password_length: usize,
    accounts: RwLock<Accounts>,
}

impl InMemoryIdentityProvider {
    pub fn new(min_password_length: usize) -> Self {
        Self {
            min_password_length,
            accounts: RwLock::new(Accounts::default()),
        }
    }

    /// The most recent verification mails, oldest first. At most
    /// [`OUTBOX_CAPACITY`] are kept.
    pub fn sent_verifications(&self) -> Vec<VerificationMail> {
        self.accounts
            .read()
            .map(|accounts| accounts.outbox.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Code of the most recent verification mail sent to `email`.
    pub fn latest_verification_code(&self, email: &str) -> Option<String> {
        self.sent_verifications()
            .into_iter()
            .rev()
            .find(|mail| mail.email.eq_ignore_ascii_case(email))
            .map(|mail| mail.code)
    }
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new(6)
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| {
            tracing::error!(error = %err, "password hashing failed");
            AuthError::Unavailable
        })
}

fn verify_password(password: &str, hash: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

impl IdentityProvider for InMemoryIdentityProvider {
    fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let accounts = self.accounts.read().map_err(|_| AuthError::Unavailable)?;
        match accounts.by_email.get(&email_key(email)) {
            Some(account) if verify_password(password, &account.password_hash) => {
                Ok(account.identity.clone())
            }
            _ => {
                warn!(email, "sign-in rejected");
                Err(AuthError::InvalidCredentials)
            }
        }
    }

    fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let email = email.trim();
        if !EMAIL_SHAPE.is_match(email) {
            return Err(AuthError::InvalidEmail(email.to_string()));
        }
        if password.chars().count() < self.min_password_length {
            return Err(AuthError::WeakPassword {
                min: self.min_password_length,
            });
        }

        let key = email_key(email);
        let password_hash = hash_password(password)?;
        let mut accounts = self.accounts.write().map_err(|_| AuthError::Unavailable)?;
        if accounts.by_email.contains_key(&key) {
            return Err(AuthError::EmailAlreadyInUse);
        }

        let identity = Identity {
            uid: uuid::Uuid::new_v4().to_string(),
            email: email.to_string(),
            display_name: display_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            email_verified: false,
        };
        accounts.by_email.insert(
            key,
            Account {
                identity: identity.clone(),
                password_hash,
            },
        );
        info!(uid = %identity.uid, email = %identity.email, "account created");
        Ok(identity)
    }

    fn send_verification(&self, identity: &Identity) -> Result<(), AuthError> {
        let mut accounts = self.accounts.write().map_err(|_| AuthError::Unavailable)?;
        if accounts.by_uid_mut(&identity.uid).is_none() {
            return Err(AuthError::NotSignedIn);
        }
        // a new link supersedes any earlier one for the same account
        accounts
            .pending_codes
            .retain(|_, pending| *pending != identity.uid);
        let code = uuid::Uuid::new_v4().simple().to_string();
        accounts
            .pending_codes
            .insert(code.clone(), identity.uid.clone());
        if accounts.outbox.len() == OUTBOX_CAPACITY {
            accounts.outbox.pop_front();
        }
        accounts.outbox.push_back(VerificationMail {
            email: identity.email.clone(),
            code: code.clone(),
        });
        info!(email = %identity.email, %code, "verification email queued");
        Ok(())
    }

    fn confirm_verification(&self, code: &str) -> Result<Identity, AuthError> {
        let mut accounts = self.accounts.write().map_err(|_| AuthError::Unavailable)?;
        let uid = accounts
            .pending_codes
            .remove(code)
            .ok_or(AuthError::InvalidVerificationCode)?;
        let account = accounts
            .by_uid_mut(&uid)
            .ok_or(AuthError::InvalidVerificationCode)?;
        account.identity.email_verified = true;
        let identity = account.identity.clone();
        accounts.pending_codes.retain(|_, pending| *pending != uid);
        info!(uid = %identity.uid, "email verified");
        Ok(identity)
    }

    fn lookup(&self, uid: &str) -> Option<Identity> {
        let accounts = self.accounts.read().ok()?;
        accounts
            .by_email
            .values()
            .find(|account| account.identity.uid == uid)
            .map(|account| account.identity.clone())
    }
}
