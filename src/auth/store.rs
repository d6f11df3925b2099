//! The session/credential store.
//!
//! Owns the registered-account ledger and the current session, both kept in
//! a [`KeyValueStore`]. The ledger is re-read from storage on every
//! operation, so several stores over the same storage see each other's
//! registrations.
//!
//! `register` and `authenticate` are serialized by a single-slot guard: an
//! overlapping call fails with [`AuthError::Busy`] instead of racing. The
//! `pending` flag is raised for the whole operation and lowered by a drop
//! guard, so it is cleared on success, failure, timeout and cancellation
//! alike.

use super::credentials::SecretHasher;
use super::storage::{KeyValueStore, LEDGER_KEY, SESSION_KEY};
use super::transport::{AuthRequest, AuthTransport};
use super::types::{Account, PublicAccount, Role};
use super::AuthError;
use crate::config::{AuthConfig, DuplicateEmailPolicy, KdfConfig};
use anyhow::Context;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    transport: Arc<dyn AuthTransport>,
    hasher: Arc<SecretHasher>,
    config: AuthConfig,
    session: watch::Sender<Option<PublicAccount>>,
    pending: watch::Sender<bool>,
    op_slot: tokio::sync::Mutex<()>,
    /// Parent of every per-operation token; cancelled on dispose.
    shutdown: CancellationToken,
    in_flight: Mutex<Option<CancellationToken>>,
}

/// Lowers `pending` and forgets the in-flight token on drop.
struct PendingGuard<'a> {
    store: &'a SessionStore,
    _slot: tokio::sync::MutexGuard<'a, ()>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.store.in_flight.lock().take();
        self.store.pending.send_replace(false);
    }
}

impl SessionStore {
    // ── Lifecycle ───────────────────────────────────────────────

    /// Build a store with no active session. Call [`restore`](Self::restore)
    /// to pick up a persisted one.
    pub fn create(
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn AuthTransport>,
        config: AuthConfig,
        kdf: &KdfConfig,
    ) -> anyhow::Result<Self> {
        let hasher = SecretHasher::new(kdf)?;
        let (session, _) = watch::channel(None);
        let (pending, _) = watch::channel(false);

        Ok(Self {
            storage,
            transport,
            hasher: Arc::new(hasher),
            config,
            session,
            pending,
            op_slot: tokio::sync::Mutex::new(()),
            shutdown: CancellationToken::new(),
            in_flight: Mutex::new(None),
        })
    }

    /// [`create`](Self::create) followed by [`restore`](Self::restore).
    pub fn open(
        storage: Arc<dyn KeyValueStore>,
        transport: Arc<dyn AuthTransport>,
        config: AuthConfig,
        kdf: &KdfConfig,
    ) -> anyhow::Result<Self> {
        let store = Self::create(storage, transport, config, kdf)?;
        store.restore();
        Ok(store)
    }

    /// Cancel any in-flight operation. Operations started afterwards fail
    /// with [`AuthError::Cancelled`].
    pub fn dispose(&self) {
        self.shutdown.cancel();
        tracing::debug!(storage = self.storage.name(), "Session store disposed");
    }

    /// Load the persisted session, if any. Unreadable or malformed data
    /// yields no session.
    pub fn restore(&self) -> Option<PublicAccount> {
        let restored = match self.storage.get(SESSION_KEY) {
            Ok(Some(bytes)) => match serde_json::from_slice::<PublicAccount>(&bytes) {
                Ok(account) => Some(account),
                Err(e) => {
                    tracing::warn!("Ignoring malformed stored session: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!("Failed to read stored session: {e:#}");
                None
            }
        };

        tracing::debug!(restored = restored.is_some(), "Session restore");
        self.session.send_replace(restored.clone());
        restored
    }

    // ── Observation ─────────────────────────────────────────────

    /// Current session, if any.
    pub fn session(&self) -> Option<PublicAccount> {
        self.session.borrow().clone()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<Option<PublicAccount>> {
        self.session.subscribe()
    }

    /// Whether a register/authenticate call is in flight.
    pub fn is_pending(&self) -> bool {
        *self.pending.borrow()
    }

    pub fn subscribe_pending(&self) -> watch::Receiver<bool> {
        self.pending.subscribe()
    }

    /// Number of accounts in the ledger.
    pub fn account_count(&self) -> usize {
        self.ledger_or_empty().len()
    }

    /// Public projection of the account registered under `email`.
    pub fn find_account(&self, email: &str) -> Option<PublicAccount> {
        self.ledger_or_empty()
            .iter()
            .find(|a| a.email == email)
            .map(Account::public)
    }

    // ── Operations ──────────────────────────────────────────────

    /// Create an account and sign it in, replacing any current session.
    ///
    /// Under the default [`DuplicateEmailPolicy::Replace`] an existing
    /// account with the same email is dropped from the ledger.
    pub async fn register(
        &self,
        email: &str,
        secret: &str,
        name: &str,
        role: Role,
    ) -> Result<PublicAccount, AuthError> {
        require("email", email)?;
        if secret.is_empty() {
            return Err(AuthError::MissingField("secret"));
        }
        require("name", name)?;

        let _guard = self.begin()?;
        self.round_trip(AuthRequest::Register).await?;

        let mut ledger = self.load_ledger()?;
        let existing = ledger.iter().any(|a| a.email == email);
        if existing && self.config.duplicate_email == DuplicateEmailPolicy::Reject {
            return Err(AuthError::EmailTaken(email.to_string()));
        }

        let account = Account::new(name, email, role, self.hash_secret(secret).await?);
        let public = account.public();

        ledger.retain(|a| a.email != email);
        ledger.push(account);
        self.persist_ledger(&ledger)?;
        // Ledger is committed from here on: a failed session write leaves the
        // account registered but not signed in.
        self.persist_session(&public)?;
        self.session.send_replace(Some(public.clone()));

        tracing::info!(
            account_id = %public.id,
            role = %public.role,
            replaced = existing,
            "Account registered"
        );
        Ok(public)
    }

    /// Sign in with email + secret. On failure the current session is left
    /// as it was.
    pub async fn authenticate(
        &self,
        email: &str,
        secret: &str,
    ) -> Result<PublicAccount, AuthError> {
        let _guard = self.begin()?;
        self.round_trip(AuthRequest::Authenticate).await?;

        let ledger = self.load_ledger()?;
        let candidate = ledger.iter().find(|a| a.email == email);
        let verified = self
            .verify_secret(secret, candidate.map(|a| a.secret_hash.clone()))
            .await?;

        let Some(account) = candidate.filter(|_| verified) else {
            tracing::info!("Authentication rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let public = account.public();
        self.persist_session(&public)?;
        self.session.send_replace(Some(public.clone()));

        tracing::info!(account_id = %public.id, role = %public.role, "Signed in");
        Ok(public)
    }

    /// Sign out. Never fails; the ledger is untouched.
    pub fn terminate(&self) {
        let previous = self.session.send_replace(None);
        if let Err(e) = self.storage.remove(SESSION_KEY) {
            tracing::warn!("Failed to remove stored session: {e:#}");
        }
        if let Some(account) = previous {
            tracing::info!(account_id = %account.id, "Signed out");
        }
    }

    /// Abort the in-flight register/authenticate call, if any. It fails
    /// with [`AuthError::Cancelled`] and changes nothing.
    pub fn cancel_pending(&self) -> bool {
        match self.in_flight.lock().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    // ── Internals ───────────────────────────────────────────────

    fn begin(&self) -> Result<PendingGuard<'_>, AuthError> {
        let slot = self.op_slot.try_lock().map_err(|_| AuthError::Busy)?;
        *self.in_flight.lock() = Some(self.shutdown.child_token());
        self.pending.send_replace(true);
        Ok(PendingGuard { store: self, _slot: slot })
    }

    async fn round_trip(&self, request: AuthRequest) -> Result<(), AuthError> {
        let token = self
            .in_flight
            .lock()
            .clone()
            .unwrap_or_else(|| self.shutdown.child_token());
        let timeout = self.config.request_timeout();

        tokio::select! {
            biased;
            () = token.cancelled() => {
                tracing::info!(request = request.as_str(), "Auth request cancelled");
                Err(AuthError::Cancelled)
            }
            result = tokio::time::timeout(timeout, self.transport.round_trip(request)) => {
                match result {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(e)) => {
                        tracing::warn!(
                            transport = self.transport.name(),
                            request = request.as_str(),
                            "Auth transport failed: {e:#}"
                        );
                        Err(AuthError::Transport(e))
                    }
                    Err(_) => {
                        tracing::warn!(
                            request = request.as_str(),
                            timeout_ms = timeout.as_millis() as u64,
                            "Auth request timed out"
                        );
                        Err(AuthError::Timeout(timeout))
                    }
                }
            }
        }
    }

    /// Argon2 is CPU- and memory-bound, so it runs off the executor.
    async fn hash_secret(&self, secret: &str) -> Result<String, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let secret = secret.to_string();
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| AuthError::Hashing(format!("hashing task failed: {e}")))?
    }

    /// `None` spends a dummy verification and never matches.
    async fn verify_secret(
        &self,
        secret: &str,
        stored_hash: Option<String>,
    ) -> Result<bool, AuthError> {
        let hasher = Arc::clone(&self.hasher);
        let secret = secret.to_string();
        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&secret, &hash),
            None => hasher.verify_dummy(&secret),
        })
        .await
        .map_err(|e| AuthError::Hashing(format!("verification task failed: {e}")))
    }

    /// Missing or malformed ledgers read as empty. A failed read is an
    /// error: the caller must not write back a ledger it could not see.
    fn load_ledger(&self) -> Result<Vec<Account>, AuthError> {
        let bytes = self
            .storage
            .get(LEDGER_KEY)
            .context("Failed to read account ledger")
            .map_err(AuthError::Storage)?;
        let Some(bytes) = bytes else {
            return Ok(Vec::new());
        };
        Ok(serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed account ledger: {e}");
            Vec::new()
        }))
    }

    fn ledger_or_empty(&self) -> Vec<Account> {
        self.load_ledger().unwrap_or_else(|e| {
            tracing::warn!("{e}");
            Vec::new()
        })
    }

    fn persist_ledger(&self, ledger: &[Account]) -> Result<(), AuthError> {
        let bytes = serde_json::to_vec_pretty(ledger)
            .context("Failed to serialize account ledger")
            .map_err(AuthError::Storage)?;
        self.storage
            .set(LEDGER_KEY, &bytes)
            .map_err(AuthError::Storage)
    }

    fn persist_session(&self, session: &PublicAccount) -> Result<(), AuthError> {
        let bytes = serde_json::to_vec(session)
            .context("Failed to serialize session")
            .map_err(AuthError::Storage)?;
        self.storage
            .set(SESSION_KEY, &bytes)
            .map_err(AuthError::Storage)
    }
}

/// Whitespace-only names and emails count as empty.
fn require(field: &'static str, value: &str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(())
}
