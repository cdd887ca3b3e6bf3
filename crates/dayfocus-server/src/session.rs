//! Session and pending sign-in storage with TTL.
//!
//! Sessions are keyed by the opaque id carried in the session cookie.
//! Pending sign-ins are keyed by the OAuth `state` parameter and consumed
//! exactly once by the callback.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dayfocus_core::Provider;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// How long a sign-in may take between redirect and callback.
pub const PENDING_SIGN_IN_TTL: Duration = Duration::from_secs(600);

/// Session lifetime when the token endpoint does not report `expires_in`.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(3600);

/// Upper bound on any session lifetime, whatever the provider reports.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(24 * 3600);

/// Sign-ins that may be in flight at once. Past this the oldest is dropped.
pub const MAX_PENDING_SIGN_INS: usize = 1024;

/// Session lifetime for a token response's `expires_in`.
///
/// Missing or non-positive values get [`DEFAULT_SESSION_TTL`]; everything is
/// capped at [`MAX_SESSION_TTL`].
pub fn session_ttl(expires_in: Option<i64>) -> Duration {
    expires_in
        .filter(|secs| *secs > 0)
        .map(|secs| Duration::from_secs(secs.unsigned_abs()))
        .unwrap_or(DEFAULT_SESSION_TTL)
        .min(MAX_SESSION_TTL)
}

/// `now + ttl`, saturating at [`MAX_SESSION_TTL`] so it cannot overflow.
fn deadline(ttl: Duration) -> Instant {
    Instant::now() + ttl.min(MAX_SESSION_TTL)
}

/// A signed-in identity: the provider and its access token.
#[derive(Clone)]
pub struct Session {
    pub provider: Provider,
    pub access_token: String,
    pub created_at: DateTime<Utc>,
    expires_at: Instant,
}

impl Session {
    pub fn new(provider: Provider, access_token: impl Into<String>, ttl: Duration) -> Self {
        Self {
            provider,
            access_token: access_token.into(),
            created_at: Utc::now(),
            expires_at: deadline(ttl),
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// True when the session can be used for upstream calls.
    pub fn has_token(&self) -> bool {
        !self.access_token.is_empty()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("provider", &self.provider)
            .field("access_token", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A sign-in started by `/api/auth/signin/{provider}` awaiting its callback.
#[derive(Debug, Clone)]
pub struct PendingSignIn {
    pub provider: Provider,
    pub verifier: String,
    pub callback_url: String,
    expires_at: Instant,
    sequence: u64,
}

impl PendingSignIn {
    pub fn new(
        provider: Provider,
        verifier: impl Into<String>,
        callback_url: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            verifier: verifier.into(),
            callback_url: callback_url.into(),
            expires_at: deadline(PENDING_SIGN_IN_TTL),
            sequence: 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory session store.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    pending: HashMap<String, PendingSignIn>,
    next_sequence: u64,
}

/// Session store shared across request handlers.
pub type SharedSessions = Arc<RwLock<SessionStore>>;

/// Creates an empty shared store.
pub fn new_shared_sessions() -> SharedSessions {
    Arc::new(RwLock::new(SessionStore::new()))
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `id`, ignoring expired ones.
    pub fn get(&self, id: &str) -> Option<&Session> {
        self.sessions.get(id).filter(|s| !s.is_expired())
    }

    /// Stores a session, evicting anything expired first.
    pub fn insert(&mut self, id: impl Into<String>, session: Session) {
        self.evict_expired();
        let id = id.into();
        debug!(provider = %session.provider, "created session");
        self.sessions.insert(id, session);
    }

    /// Removes a session; this is a global sign-out for its holder.
    pub fn remove(&mut self, id: &str) -> Option<Session> {
        let session = self.sessions.remove(id);
        if let Some(session) = &session {
            debug!(provider = %session.provider, "removed session");
        }
        session
    }

    /// Remembers a pending sign-in under its `state`.
    ///
    /// At most [`MAX_PENDING_SIGN_INS`] are kept; the oldest goes first.
    pub fn insert_pending(&mut self, state: impl Into<String>, mut pending: PendingSignIn) {
        self.evict_expired();
        while self.pending.len() >= MAX_PENDING_SIGN_INS {
            let Some(oldest) = self
                .pending
                .iter()
                .min_by_key(|(_, p)| p.sequence)
                .map(|(state, _)| state.clone())
            else {
                break;
            };
            self.pending.remove(&oldest);
            debug!("too many sign-ins in flight, dropped the oldest");
        }
        pending.sequence = self.next_sequence;
        self.next_sequence += 1;
        self.pending.insert(state.into(), pending);
    }

    /// Consumes the pending sign-in for `state`, if still valid.
    pub fn take_pending(&mut self, state: &str) -> Option<PendingSignIn> {
        self.pending.remove(state).filter(|p| !p.is_expired())
    }

    /// Drops expired sessions and pending sign-ins.
    pub fn evict_expired(&mut self) -> usize {
        let before = self.sessions.len() + self.pending.len();
        self.sessions.retain(|_, session| {
            let keep = !session.is_expired();
            if !keep {
                trace!(provider = %session.provider, "evicting expired session");
            }
            keep
        });
        self.pending.retain(|_, pending| !pending.is_expired());
        let evicted = before - (self.sessions.len() + self.pending.len());
        if evicted > 0 {
            debug!(evicted, "evicted expired session entries");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}
