use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::identity::{AuthError, Identity, IdentityProvider};

/// Handle to a running identity subscription. Dropping it, or calling
/// [`Subscription::unsubscribe`], stops further callbacks.
#[derive(Debug)]
pub struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The signed-in identity of one client, observable through
/// [`AuthSession::subscribe`].
pub struct AuthSession {
    provider: Arc<dyn IdentityProvider>,
    current: watch::Sender<Option<Identity>>,
}

impl AuthSession {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        let (current, _) = watch::channel(None);
        Self { provider, current }
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.current.borrow().clone()
    }

    /// Signs in. An unverified account stays signed in so a new
    /// verification mail can be requested, but the call still fails with
    /// [`AuthError::EmailNotVerified`].
    pub fn login_with_password(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let identity = self.provider.sign_in_with_password(email, password)?;
        let verified = identity.email_verified;
        self.current.send_replace(Some(identity.clone()));
        if !verified {
            info!(email = %identity.email, "login refused until email is verified");
            return Err(AuthError::EmailNotVerified);
        }
        info!(email = %identity.email, "logged in");
        Ok(identity)
    }

    /// Creates the account, mails a verification link and signs the new
    /// account in.
    pub fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<Identity, AuthError> {
        let identity = self.provider.sign_up(email, password, display_name)?;
        self.provider.send_verification(&identity)?;
        self.current.send_replace(Some(identity.clone()));
        Ok(identity)
    }

    pub fn logout(&self) {
        if let Some(identity) = self.current.send_replace(None) {
            info!(email = %identity.email, "logged out");
        }
    }

    /// Resends the verification mail. A no-op once the email is verified.
    pub fn send_verification_email(&self) -> Result<(), AuthError> {
        match self.current_identity() {
            Some(identity) if !identity.email_verified => {
                self.provider.send_verification(&identity)
            }
            Some(_) => Ok(()),
            None => Err(AuthError::NotSignedIn),
        }
    }

    /// Re-reads the signed-in identity from the provider, e.g. after the
    /// email was verified elsewhere. Subscribers are only notified when the
    /// identity actually changed.
    pub fn refresh(&self) -> Option<Identity> {
        let uid = self.current.borrow().as_ref().map(|identity| identity.uid.clone())?;
        let fresh = self.provider.lookup(&uid);
        self.current.send_if_modified(|current| {
            if *current != fresh {
                *current = fresh.clone();
                true
            } else {
                false
            }
        });
        fresh
    }

    /// Runs `on_change` with the current identity right away and again on
    /// every sign-in, sign-out or refresh that changes it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe<F>(&self, mut on_change: F) -> Subscription
    where
        F: FnMut(Option<&Identity>) + Send + 'static,
    {
        let mut rx = self.current.subscribe();
        rx.mark_changed();
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let identity = rx.borrow_and_update().clone();
                on_change(identity.as_ref());
            }
            debug!("identity subscription closed");
        });
        Subscription { task }
    }
}

/// How long a bearer token stays valid when no other lifetime is set.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

struct OpenSession {
    session: Arc<AuthSession>,
    expires_at: Instant,
}

/// Bearer token to session map backing the HTTP API. Tokens expire after
/// the store's TTL; expired entries are dropped on lookup and whenever a
/// new session is opened.
pub struct SessionStore {
    provider: Arc<dyn IdentityProvider>,
    ttl: Duration,
    sessions: RwLock<HashMap<String, OpenSession>>,
}

impl SessionStore {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            ttl: DEFAULT_SESSION_TTL,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.provider
    }

    /// A fresh, signed-out session not yet reachable by any token.
    pub fn session(&self) -> AuthSession {
        AuthSession::new(self.provider.clone())
    }

    /// Registers `session` and returns the token that reaches it.
    pub async fn open(&self, session: AuthSession) -> String {
        let token = uuid::Uuid::new_v4().simple().to_string();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, open| open.expires_at > now);
        if sessions.len() < before {
            debug!(expired = before - sessions.len(), "dropped expired sessions");
        }
        sessions.insert(
            token.clone(),
            OpenSession {
                session: Arc::new(session),
                expires_at: now + self.ttl,
            },
        );
        token
    }

    pub async fn get(&self, token: &str) -> Option<Arc<AuthSession>> {
        {
            let sessions = self.sessions.read().await;
            let open = sessions.get(token)?;
            if open.expires_at > Instant::now() {
                return Some(open.session.clone());
            }
        }
        if let Some(expired) = self.sessions.write().await.remove(token) {
            expired.session.logout();
        }
        None
    }

    /// Number of tokens currently held, expired ones included until pruned.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Signs the session out and forgets its token.
    pub async fn close(&self, token: &str) -> bool {
        match self.sessions.write().await.remove(token) {
            Some(open) => {
                open.session.logout();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::identity::InMemoryIdentityProvider;

    fn provider() -> Arc<InMemoryIdentityProvider> {
        Arc::new(InMemoryIdentityProvider::default())
    }

    #[test]
    fn test_unverified_login_fails_but_keeps_identity() {
        let provider = provider();
        provider
            .sign_up("t@example.com", "secret-pass", Some("T"))
            .unwrap();
        let session = AuthSession::new(provider.clone());

        let err = session
            .login_with_password("t@example.com", "secret-pass")
            .unwrap_err();
        assert_eq!(err, AuthError::EmailNotVerified);
        let current = session.current_identity().unwrap();
        assert_eq!(current.email, "t@example.com");
        assert!(!current.email_verified);

        session.send_verification_email().unwrap();
        let code = provider.latest_verification_code("t@example.com").unwrap();
        provider.confirm_verification(&code).unwrap();
        assert!(session.refresh().unwrap().email_verified);

        session.logout();
        let identity = session
            .login_with_password("t@example.com", "secret-pass")
            .unwrap();
        assert!(identity.email_verified);
    }

    #[test]
    fn test_signup_signs_in_and_sends_verification() {
        let provider = provider();
        let session = AuthSession::new(provider.clone());
        let identity = session.signup("new@example.com", "secret-pass", None).unwrap();
        assert_eq!(session.current_identity(), Some(identity));
        assert_eq!(provider.sent_verifications().len(), 1);
    }

    #[test]
    fn test_failed_login_leaves_session_signed_out() {
        let session = AuthSession::new(provider());
        assert_eq!(
            session.login_with_password("x@example.com", "whatever"),
            Err(AuthError::InvalidCredentials)
        );
        assert!(session.current_identity().is_none());
        assert_eq!(
            session.send_verification_email(),
            Err(AuthError::NotSignedIn)
        );
    }

    #[tokio::test]
    async fn test_subscription_sees_changes_until_unsubscribed() {
        let provider = provider();
        let session = AuthSession::new(provider.clone());
        let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::default();

        let sink = seen.clone();
        let subscription = session.subscribe(move |identity| {
            sink.lock()
                .unwrap()
                .push(identity.map(|i| i.email.clone()));
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(subscription.is_active());

        session.signup("s@example.com", "secret-pass", None).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.logout();
        tokio::time::sleep(Duration::from_millis(10)).await;

        subscription.unsubscribe();
        session.signup("late@example.com", "secret-pass", None).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![None, Some("s@example.com".to_string()), None]
        );
    }

    #[tokio::test]
    async fn test_subscription_ends_with_its_session() {
        let session = AuthSession::new(provider());
        let subscription = session.subscribe(|_| {});
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(subscription.is_active());

        drop(session);
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!subscription.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_tokens_expire() {
        let store = SessionStore::new(provider()).with_ttl(Duration::from_secs(60));

        let session = store.session();
        session.signup("e@example.com", "secret-pass", None).unwrap();
        let token = store.open(session).await;
        let held = store.get(&token).await.unwrap();

        tokio::time::advance(Duration::from_secs(61)).await;
        assert!(store.get(&token).await.is_none());
        assert!(held.current_identity().is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_opening_a_session_prunes_expired_tokens() {
        let store = SessionStore::new(provider()).with_ttl(Duration::from_secs(60));
        store.open(store.session()).await;
        store.open(store.session()).await;
        assert_eq!(store.len().await, 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        let fresh = store.open(store.session()).await;
        assert_eq!(store.len().await, 1);
        assert!(store.get(&fresh).await.is_some());
    }

    #[tokio::test]
    async fn test_session_store_tokens() {
        let provider = provider();
        provider.sign_up("a@example.com", "secret-pass", None).unwrap();
        let store = SessionStore::new(provider.clone());

        let session = store.session();
        session.signup("b@example.com", "secret-pass", None).unwrap();
        let token = store.open(session).await;

        let found = store.get(&token).await.unwrap();
        assert_eq!(found.current_identity().unwrap().email, "b@example.com");

        assert!(store.close(&token).await);
        assert!(found.current_identity().is_none());
        assert!(store.get(&token).await.is_none());
        assert!(!store.close(&token).await);
    }
}
