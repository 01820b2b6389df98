//! Access gate: who may mutate the document collection.
//!
//! Authentication is delegated to an [`AuthProvider`]. A successful sign-in yields a
//! [`Session`] carrying an opaque bearer token that the gate tracks server-side until it is
//! signed out or expires. [`crate::DocumentStore`] mutations take a `&Session` and call
//! [`AccessGate::authorize`] before touching the collection.

use crate::config::AuthConfig;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("not signed in or session has been revoked")]
    InvalidSession,
    #[error("session has expired, sign in again")]
    SessionExpired,
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

/// Email and password submitted at sign-in.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub email: String,
}

/// A live sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    token: String,
    user: User,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl Session {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Verifies credentials. Implementations must be usable from several threads.
pub trait AuthProvider: Send + Sync + fmt::Debug {
    fn authenticate(&self, credentials: &Credentials) -> AuthResult<User>;
}

/// Single admin account configured at startup.
///
/// Only the SHA-256 digest of the password is retained.
pub struct StaticCredentialsProvider {
    email: String,
    password_digest: [u8; 32],
}

impl StaticCredentialsProvider {
    pub fn new(email: &str, password: &str) -> Self {
        Self {
            email: email.trim().to_owned(),
            password_digest: digest(password),
        }
    }
}

impl fmt::Debug for StaticCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialsProvider")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

impl AuthProvider for StaticCredentialsProvider {
    fn authenticate(&self, credentials: &Credentials) -> AuthResult<User> {
        let email_matches = credentials.email.trim().eq_ignore_ascii_case(&self.email);
        let password_matches = constant_time_eq(&digest(&credentials.password), &self.password_digest);
        if email_matches && password_matches {
            Ok(User {
                email: self.email.clone(),
            })
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

fn digest(password: &str) -> [u8; 32] {
    Sha256::digest(password.as_bytes()).into()
}

fn constant_time_eq(a: &[u8; 32], b: &[u8; 32]) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Notification delivered to [`AccessGate::on_auth_change`] listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn(User),
    SignedOut(User),
}

type Listener = dyn Fn(&AuthEvent) + Send + Sync;

/// Keeps an auth-change listener registered. Dropping it unsubscribes.
#[must_use = "the listener is removed when the subscription is dropped"]
pub struct Subscription {
    _listener: Arc<Listener>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

/// Issues and checks sessions.
pub struct AccessGate {
    provider: Box<dyn AuthProvider>,
    session_ttl: chrono::Duration,
    sessions: Mutex<HashMap<String, Session>>,
    listeners: Mutex<Vec<Weak<Listener>>>,
}

impl fmt::Debug for AccessGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessGate")
            .field("provider", &self.provider)
            .field("session_ttl", &self.session_ttl)
            .finish_non_exhaustive()
    }
}

impl AccessGate {
    pub fn new(provider: Box<dyn AuthProvider>, session_ttl: chrono::Duration) -> Self {
        Self {
            provider,
            session_ttl,
            sessions: Mutex::new(HashMap::new()),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// Gate backed by the configured admin account.
    pub fn from_config(cfg: &AuthConfig) -> Self {
        let provider = StaticCredentialsProvider::new(cfg.admin_email(), cfg.admin_password());
        Self::new(Box::new(provider), cfg.session_ttl())
    }

    /// Authenticates `credentials` and opens a session.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] when the provider rejects them.
    pub fn sign_in(&self, credentials: &Credentials) -> AuthResult<Session> {
        let user = match self.provider.authenticate(credentials) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("rejected sign-in for {}", credentials.email);
                return Err(e);
            }
        };

        let issued_at = Utc::now();
        let session = Session {
            token: hex::encode(rand::random::<[u8; 32]>()),
            user: user.clone(),
            issued_at,
            expires_at: issued_at + self.session_ttl,
        };

        {
            let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
            sessions.retain(|_, s| !s.is_expired_at(issued_at));
            sessions.insert(session.token.clone(), session.clone());
        }

        tracing::info!("{} signed in", user.email);
        self.notify(&AuthEvent::SignedIn(user));
        Ok(session)
    }

    /// Revokes `session`. Signing out twice is a no-op.
    pub fn sign_out(&self, session: &Session) {
        let removed = self
            .sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(session.token());

        if let Some(removed) = removed {
            tracing::info!("{} signed out", removed.user.email);
            self.notify(&AuthEvent::SignedOut(removed.user));
        }
    }

    /// User of the most recently issued live session.
    pub fn current_user(&self) -> Option<User> {
        let now = Utc::now();
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions
            .values()
            .filter(|s| !s.is_expired_at(now))
            .max_by_key(|s| s.issued_at)
            .map(|s| s.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_user().is_some()
    }

    /// Registers `callback` for sign-in and sign-out events.
    pub fn on_auth_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let listener: Arc<Listener> = Arc::new(callback);
        let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
        listeners.retain(|l| l.strong_count() > 0);
        listeners.push(Arc::downgrade(&listener));
        Subscription {
            _listener: listener,
        }
    }

    /// Checks that `session` is still live.
    ///
    /// # Errors
    ///
    /// [`AuthError::InvalidSession`] for unknown or revoked tokens, [`AuthError::SessionExpired`]
    /// once the session has passed its expiry.
    pub fn authorize(&self, session: &Session) -> AuthResult<()> {
        self.resolve(session.token()).map(|_| ())
    }

    /// Looks up the live session for a bearer token.
    pub fn resolve(&self, token: &str) -> AuthResult<Session> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let session = sessions.get(token).cloned().ok_or(AuthError::InvalidSession)?;
        if session.is_expired_at(now) {
            sessions.remove(token);
            return Err(AuthError::SessionExpired);
        }
        Ok(session)
    }

    fn notify(&self, event: &AuthEvent) {
        let live: Vec<Arc<Listener>> = {
            let mut listeners = self.listeners.lock().unwrap_or_else(PoisonError::into_inner);
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in live {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const EMAIL: &str = "admin@example.com";
    const PASSWORD: &str = "correct horse battery staple";

    fn gate_with_ttl(ttl: chrono::Duration) -> AccessGate {
        AccessGate::new(Box::new(StaticCredentialsProvider::new(EMAIL, PASSWORD)), ttl)
    }

    fn gate() -> AccessGate {
        gate_with_ttl(chrono::Duration::hours(1))
    }

    #[test]
    fn sign_in_with_valid_credentials() {
        let gate = gate();
        assert!(!gate.is_authenticated());

        let session = gate.sign_in(&Credentials::new("Admin@Example.com", PASSWORD)).unwrap();

        assert_eq!(session.user().email, EMAIL);
        assert_eq!(session.token().len(), 64);
        assert!(session.expires_at() > session.issued_at());
        assert!(gate.is_authenticated());
        assert_eq!(gate.current_user().unwrap().email, EMAIL);
        assert!(gate.authorize(&session).is_ok());
    }

    #[test]
    fn sign_in_rejects_wrong_password_and_email() {
        let gate = gate();
        assert_eq!(
            gate.sign_in(&Credentials::new(EMAIL, "wrong")),
            Err(AuthError::InvalidCredentials)
        );
        assert_eq!(
            gate.sign_in(&Credentials::new("someone@example.com", PASSWORD)),
            Err(AuthError::InvalidCredentials)
        );
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn tokens_are_unique() {
        let gate = gate();
        let a = gate.sign_in(&Credentials::new(EMAIL, PASSWORD)).unwrap();
        let b = gate.sign_in(&Credentials::new(EMAIL, PASSWORD)).unwrap();
        assert_ne!(a.token(), b.token());
    }

    #[test]
    fn sign_out_revokes_session() {
        let gate = gate();
        let session = gate.sign_in(&Credentials::new(EMAIL, PASSWORD)).unwrap();

        gate.sign_out(&session);
        gate.sign_out(&session);

        assert_eq!(gate.authorize(&session), Err(AuthError::InvalidSession));
        assert!(gate.current_user().is_none());
    }

    #[test]
    fn unknown_token_is_invalid() {
        let gate = gate();
        assert_eq!(gate.resolve("deadbeef").unwrap_err(), AuthError::InvalidSession);
    }

    #[test]
    fn expired_session_is_rejected() {
        let gate = gate_with_ttl(chrono::Duration::zero());
        let session = gate.sign_in(&Credentials::new(EMAIL, PASSWORD)).unwrap();

        assert_eq!(gate.authorize(&session), Err(AuthError::SessionExpired));
        // The expired session is dropped on first use.
        assert_eq!(gate.authorize(&session), Err(AuthError::InvalidSession));
        assert!(!gate.is_authenticated());
    }

    #[test]
    fn sessions_from_another_gate_are_rejected() {
        let session = gate().sign_in(&Credentials::new(EMAIL, PASSWORD)).unwrap();
        assert_eq!(gate().authorize(&session), Err(AuthError::InvalidSession));
    }

    #[test]
    fn listeners_observe_changes_until_unsubscribed() {
        let gate = gate();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        let subscription = gate.on_auth_change(move |event| {
            sink.lock().unwrap().push(event.clone());
        });

        let session = gate.sign_in(&Credentials::new(EMAIL, PASSWORD)).unwrap();
        gate.sign_out(&session);
        subscription.unsubscribe();
        gate.sign_in(&Credentials::new(EMAIL, PASSWORD)).unwrap();

        let user = User {
            email: EMAIL.to_string(),
        };
        assert_eq!(
            *events.lock().unwrap(),
            vec![AuthEvent::SignedIn(user.clone()), AuthEvent::SignedOut(user)]
        );
    }

    #[test]
    fn dropping_subscription_unsubscribes() {
        let gate = gate();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&count);
        {
            let _subscription = gate.on_auth_change(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            gate.sign_in(&Credentials::new(EMAIL, PASSWORD)).unwrap();
        }
        gate.sign_in(&Credentials::new(EMAIL, PASSWORD)).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credentials = Credentials::new(EMAIL, PASSWORD);
        assert!(!format!("{:?}", credentials).contains(PASSWORD));
        assert!(!format!("{:?}", gate()).contains(PASSWORD));
    }

    #[test]
    fn from_config_uses_admin_account() {
        let cfg = AuthConfig::new(EMAIL.into(), PASSWORD.into(), chrono::Duration::minutes(5)).unwrap();
        let gate = AccessGate::from_config(&cfg);
        let session = gate.sign_in(&Credentials::new(EMAIL, PASSWORD)).unwrap();
        assert!(session.expires_at() - session.issued_at() == chrono::Duration::minutes(5));
    }
}
