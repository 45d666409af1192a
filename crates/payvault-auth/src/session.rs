//! Per-principal authentication state
//!
//! An [`AuthSession`] owns everything the core tracks for one principal:
//! the failure counter and lock, the authenticated flag, an optional active
//! session, and an optional outstanding password-reset token.
//!
//! # State machine
//!
//! - `Unauthenticated` --correct password--> `Authenticated`
//! - `Unauthenticated` --fifth consecutive failure--> `Locked`
//! - `Locked` refuses every candidate, correct or not
//! - `Locked` --password reset / unlock / auto-unlock window--> `Unauthenticated`
//!
//! The reset flow is independent of the lock, since it is how a locked
//! principal recovers.
//!
//! An `AuthSession` is not synchronized. Callers serialize calls per
//! principal, e.g. one instance per request or a lock keyed by principal id.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::authz::{self, Permission};
use crate::clock::{Clock, SystemClock};
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};
use crate::hasher::CredentialHasher;
use crate::policy;
use crate::principal::{CredentialRecord, Principal, PrincipalId};
use crate::store::CredentialStore;

/// Random bytes in a reset token (hex encoded to twice as many characters)
pub const RESET_TOKEN_BYTES: usize = 32;

/// Where a principal stands in the login state machine
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    /// No successful authentication yet, or it was revoked
    Unauthenticated,
    /// Too many consecutive failures
    Locked {
        /// When the lock was set
        since: DateTime<FixedOffset>,
    },
    /// Password verified
    Authenticated {
        /// Whether a session has been started and not ended
        session_active: bool,
    },
}

/// A session started after successful authentication
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveSession {
    pub id: Uuid,
    pub started_at: DateTime<FixedOffset>,
    pub last_activity: DateTime<FixedOffset>,
    pub client_address: String,
    pub client_agent: String,
}

/// Outstanding reset token; only its digest is kept
struct PendingReset {
    digest: [u8; 32],
    expires_at: DateTime<FixedOffset>,
}

/// Authentication and session state for one principal
pub struct AuthSession {
    principal: Principal,
    credential: Option<CredentialRecord>,
    config: AuthConfig,
    hasher: CredentialHasher,
    clock: Arc<dyn Clock>,
    failed_attempts: u32,
    locked_since: Option<DateTime<FixedOffset>>,
    authenticated: bool,
    session: Option<ActiveSession>,
    reset: Option<PendingReset>,
}

impl AuthSession {
    /// Create an unbound model; it refuses every candidate until bound
    pub fn new(config: AuthConfig, clock: Arc<dyn Clock>) -> Self {
        let hasher = CredentialHasher::new(config.hasher);
        Self {
            principal: Principal::default(),
            credential: None,
            config,
            hasher,
            clock,
            failed_attempts: 0,
            locked_since: None,
            authenticated: false,
            session: None,
            reset: None,
        }
    }

    /// Create an unbound model reading the wall clock in the configured offset
    pub fn with_system_clock(config: AuthConfig) -> Self {
        let clock = Arc::new(SystemClock::with_offset(config.offset()));
        Self::new(config, clock)
    }

    /// Create a model bound to a principal and its credential
    pub fn bound(
        principal: Principal,
        credential: CredentialRecord,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let mut session = Self::new(config, clock);
        session.bind(principal, credential)?;
        Ok(session)
    }

    /// Look up a principal and credential in a store and bind to them
    ///
    /// Returns `Ok(None)` when either is missing.
    pub fn load(
        store: &dyn CredentialStore,
        id: PrincipalId,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Option<Self>> {
        let Some(principal) = store.find_principal(id)? else {
            debug!(principal_id = %id, "No principal found");
            return Ok(None);
        };
        let Some(credential) = store.find_credential_record(id)? else {
            debug!(principal_id = %id, "No credential record found");
            return Ok(None);
        };
        Self::bound(principal, credential, config, clock).map(Some)
    }

    /// Bind to a principal, discarding all prior per-principal state
    pub fn bind(&mut self, principal: Principal, credential: CredentialRecord) -> Result<()> {
        if !principal.id.is_bound() {
            return Err(AuthError::InvalidInput(
                "cannot bind to principal id 0".to_string(),
            ));
        }
        if principal.id != credential.identifier() {
            return Err(AuthError::InvalidInput(format!(
                "credential for principal {} cannot bind to principal {}",
                credential.identifier(),
                principal.id
            )));
        }

        debug!(principal_id = %principal.id, "Bound authentication session");
        self.principal = principal;
        self.credential = Some(credential);
        self.failed_attempts = 0;
        self.locked_since = None;
        self.authenticated = false;
        self.session = None;
        self.reset = None;
        Ok(())
    }

    /// Write the current credential back to a store
    pub fn persist_credential(&self, store: &dyn CredentialStore) -> Result<()> {
        let credential = self.credential.as_ref().ok_or_else(|| {
            AuthError::InvalidInput("session is not bound to a credential".to_string())
        })?;
        store.save_credential_record(credential)
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn principal_id(&self) -> PrincipalId {
        self.principal.id
    }

    pub fn credential(&self) -> Option<&CredentialRecord> {
        self.credential.as_ref()
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Consecutive failures; 0 once an auto-unlock window has elapsed
    pub fn failed_attempt_count(&self) -> u32 {
        match self.locked_since {
            Some(since) if self.auto_unlock_due(since, self.now()) => 0,
            _ => self.failed_attempts,
        }
    }

    /// Attempts left before the account locks
    pub fn attempts_remaining(&self) -> u32 {
        match self.locked_since {
            Some(_) if self.is_locked() => 0,
            // Lock window elapsed; the counter resets on the next attempt
            Some(_) => self.config.lockout.threshold,
            None => self.config.lockout.attempts_remaining(self.failed_attempts),
        }
    }

    /// Whether the account currently refuses authentication
    pub fn is_locked(&self) -> bool {
        match self.locked_since {
            Some(since) => !self.auto_unlock_due(since, self.now()),
            None => false,
        }
    }

    /// When the lock was set, if the account is locked
    pub fn locked_since(&self) -> Option<DateTime<FixedOffset>> {
        self.locked_since.filter(|_| self.is_locked())
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated && !self.is_locked()
    }

    pub fn state(&self) -> AuthState {
        if let Some(since) = self.locked_since() {
            AuthState::Locked { since }
        } else if self.authenticated {
            AuthState::Authenticated {
                session_active: self.is_session_active(),
            }
        } else {
            AuthState::Unauthenticated
        }
    }

    pub fn session(&self) -> Option<&ActiveSession> {
        self.session.as_ref()
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    // ------------------------------------------------------------------
    // Authentication
    // ------------------------------------------------------------------

    /// Check a candidate password
    ///
    /// An empty candidate or an unbound model returns false without counting
    /// a failure. A locked account returns false without checking the
    /// candidate or touching the counter. Any other failure revokes
    /// authentication and ends the active session.
    pub fn authenticate(&mut self, candidate: &str) -> bool {
        if candidate.is_empty() {
            debug!(principal_id = %self.principal.id, "Empty password candidate ignored");
            return false;
        }

        let now = self.now();
        if self.lock_in_force(now) {
            warn!(
                principal_id = %self.principal.id,
                "Authentication refused: account locked"
            );
            return false;
        }

        let matched = match &self.credential {
            Some(credential) => self
                .hasher
                .verify_password(candidate, credential.salted_hash()),
            None => {
                debug!("Authentication attempted on an unbound session");
                return false;
            }
        };

        if matched {
            self.failed_attempts = 0;
            self.authenticated = true;
            info!(principal_id = %self.principal.id, "Authentication succeeded");
            return true;
        }

        self.failed_attempts = self.failed_attempts.saturating_add(1);
        self.authenticated = false;
        self.end_session();

        if self.config.lockout.is_locked(self.failed_attempts) {
            self.locked_since = Some(now);
            warn!(
                principal_id = %self.principal.id,
                failed_attempts = self.failed_attempts,
                "Account locked after repeated failures"
            );
        } else {
            info!(
                principal_id = %self.principal.id,
                failed_attempts = self.failed_attempts,
                "Authentication failed"
            );
        }

        false
    }

    /// Administrative unlock; clears the lock and counter without authenticating
    pub fn unlock(&mut self) {
        if self.locked_since.is_some() {
            info!(principal_id = %self.principal.id, "Account unlocked");
        }
        self.clear_lock();
    }

    /// Change the password, proving knowledge of the current one
    ///
    /// A wrong current password counts toward lockout. The new password must
    /// satisfy the password policy. The active session ends on success.
    pub fn change_password(&mut self, current: &str, new_password: &str) -> bool {
        if !self.authenticate(current) {
            return false;
        }

        if !policy::is_password_valid(new_password) {
            warn!(
                principal_id = %self.principal.id,
                "Password change rejected by policy"
            );
            return false;
        }

        if !self.replace_password(new_password) {
            return false;
        }

        self.session = None;
        info!(principal_id = %self.principal.id, "Password changed");
        true
    }

    // ------------------------------------------------------------------
    // Sessions
    // ------------------------------------------------------------------

    /// Start a session; only after successful authentication on an unlocked account
    pub fn start_session(&mut self, client_address: &str, client_agent: &str) -> bool {
        if !self.is_authenticated() {
            debug!(
                principal_id = %self.principal.id,
                "Session refused: not authenticated"
            );
            return false;
        }

        let now = self.now();
        let session = ActiveSession {
            id: Uuid::new_v4(),
            started_at: now,
            last_activity: now,
            client_address: client_address.to_string(),
            client_agent: client_agent.to_string(),
        };

        info!(
            principal_id = %self.principal.id,
            session_id = %session.id,
            client_address = %session.client_address,
            "Session started"
        );
        self.session = Some(session);
        true
    }

    /// Whether a session has been started and not ended
    pub fn is_session_active(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the principal is authenticated and the session is within the idle timeout
    pub fn is_session_valid(&self) -> bool {
        if !self.is_authenticated() {
            return false;
        }
        match &self.session {
            Some(session) => self.now() - session.last_activity < self.config.session.timeout(),
            None => false,
        }
    }

    /// Record activity on a valid session
    ///
    /// Returns false when there is no session or it has already timed out.
    pub fn update_session_activity(&mut self) -> bool {
        if !self.is_session_valid() {
            return false;
        }
        let now = self.now();
        match self.session.as_mut() {
            Some(session) => {
                session.last_activity = now;
                true
            }
            None => false,
        }
    }

    /// End the session; safe to call without one
    ///
    /// The principal stays authenticated and may start a new session.
    pub fn end_session(&mut self) {
        if let Some(session) = self.session.take() {
            info!(
                principal_id = %self.principal.id,
                session_id = %session.id,
                "Session ended"
            );
        }
    }

    /// End the session and drop the authenticated flag
    pub fn logout(&mut self) {
        self.end_session();
        self.authenticated = false;
    }

    /// Whole minutes since the session started; 0 without a session
    pub fn session_duration_minutes(&self) -> i64 {
        match &self.session {
            Some(session) => (self.now() - session.started_at).num_minutes().max(0),
            None => 0,
        }
    }

    /// Whole minutes until the idle timeout; 0 without a session or once expired
    pub fn time_until_expiry_minutes(&self) -> i64 {
        match &self.session {
            Some(session) => {
                let idle = self.now() - session.last_activity;
                (self.config.session.timeout() - idle).num_minutes().max(0)
            }
            None => 0,
        }
    }

    /// Whether the principal's role grants a permission on a valid session
    pub fn has_permission(&self, permission: Permission) -> bool {
        self.is_authenticated()
            && self.is_session_valid()
            && authz::has_permission(&self.principal.role, permission)
    }

    pub fn is_admin(&self) -> bool {
        self.principal.is_admin()
    }

    pub fn is_employee(&self) -> bool {
        self.principal.is_employee()
    }

    // ------------------------------------------------------------------
    // Password reset
    // ------------------------------------------------------------------

    /// Issue a reset token, replacing any outstanding one
    ///
    /// Works while locked. The caller delivers the token out of band; only
    /// its digest is kept here.
    pub fn generate_password_reset_token(&mut self) -> String {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let now = self.now();
        let expires_at = now
            .checked_add_signed(self.config.reset.token_ttl())
            .unwrap_or(now);

        if self.reset.is_some() {
            debug!(
                principal_id = %self.principal.id,
                "Replacing outstanding reset token"
            );
        }
        self.reset = Some(PendingReset {
            digest: token_digest(&token),
            expires_at,
        });

        info!(
            principal_id = %self.principal.id,
            expires_at = %expires_at,
            "Password reset token issued"
        );
        token
    }

    /// Whether the token matches the outstanding one and has not expired; does not consume it
    pub fn verify_password_reset_token(&self, token: &str) -> bool {
        let Some(pending) = &self.reset else {
            return false;
        };
        if token.is_empty() || self.now() >= pending.expires_at {
            return false;
        }
        bool::from(token_digest(token).as_slice().ct_eq(pending.digest.as_slice()))
    }

    /// Replace the password using a reset token
    ///
    /// On success the token is consumed, the lock and failure counter are
    /// cleared, the authenticated flag drops and any session ends. On
    /// failure nothing changes, including the outstanding token.
    pub fn reset_password(&mut self, token: &str, new_password: &str) -> bool {
        if !self.verify_password_reset_token(token) {
            warn!(
                principal_id = %self.principal.id,
                "Password reset rejected: invalid or expired token"
            );
            return false;
        }

        if self.config.reset.enforce_policy && !policy::is_password_valid(new_password) {
            warn!(
                principal_id = %self.principal.id,
                "Password reset rejected by policy"
            );
            return false;
        }

        if !self.replace_password(new_password) {
            return false;
        }

        self.reset = None;
        self.clear_lock();
        self.authenticated = false;
        self.session = None;

        info!(principal_id = %self.principal.id, "Password reset completed");
        true
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn now(&self) -> DateTime<FixedOffset> {
        self.clock.now().with_timezone(&self.config.offset())
    }

    fn auto_unlock_due(&self, since: DateTime<FixedOffset>, now: DateTime<FixedOffset>) -> bool {
        match self.config.lockout.auto_unlock_after() {
            Some(window) => now - since >= window,
            None => false,
        }
    }

    /// Whether a lock blocks authentication, clearing it if its window has elapsed
    fn lock_in_force(&mut self, now: DateTime<FixedOffset>) -> bool {
        let Some(since) = self.locked_since else {
            return false;
        };
        if self.auto_unlock_due(since, now) {
            info!(
                principal_id = %self.principal.id,
                "Lock window elapsed, account unlocked"
            );
            self.clear_lock();
            return false;
        }
        true
    }

    fn clear_lock(&mut self) {
        self.locked_since = None;
        self.failed_attempts = 0;
    }

    fn replace_password(&mut self, new_password: &str) -> bool {
        let hashed = match self.hasher.hash_password(new_password) {
            Ok(hashed) => hashed,
            Err(e) => {
                warn!(principal_id = %self.principal.id, "Could not hash new password: {}", e);
                return false;
            }
        };
        match self.credential.as_mut() {
            Some(credential) => {
                credential.replace_hash(hashed);
                true
            }
            None => {
                debug!("Password replacement attempted on an unbound session");
                false
            }
        }
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSession")
            .field("principal", &self.principal)
            .field("credential", &self.credential)
            .field("failed_attempts", &self.failed_attempts)
            .field("locked_since", &self.locked_since)
            .field("authenticated", &self.authenticated)
            .field("session", &self.session)
            .field("reset_pending", &self.reset.is_some())
            .finish_non_exhaustive()
    }
}

fn token_digest(token: &str) -> [u8; 32] {
    Sha256::digest(token.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{canonical_offset, ManualClock};
    use crate::hasher::HasherConfig;
    use crate::lockout::LockoutPolicy;
    use chrono::{Duration, TimeZone};

    const PASSWORD: &str = "Payroll#2024";
    const NEW_PASSWORD: &str = "Ledger$2025";

    fn test_config() -> AuthConfig {
        AuthConfig {
            hasher: HasherConfig::low_cost(),
            ..Default::default()
        }
    }

    fn test_clock() -> ManualClock {
        ManualClock::new(
            canonical_offset()
                .with_ymd_and_hms(2024, 6, 3, 9, 0, 0)
                .unwrap(),
        )
    }

    fn test_session_with(config: AuthConfig) -> (AuthSession, ManualClock) {
        let clock = test_clock();
        let hasher = CredentialHasher::new(config.hasher);
        let principal = Principal::new(17, "ana@example.com", "Ana", "Reyes", "Employee");
        let credential = CredentialRecord::from_password(17, PASSWORD, &hasher).unwrap();
        let session =
            AuthSession::bound(principal, credential, config, Arc::new(clock.clone())).unwrap();
        (session, clock)
    }

    fn test_session() -> (AuthSession, ManualClock) {
        test_session_with(test_config())
    }

    fn lock(session: &mut AuthSession) {
        for _ in 0..5 {
            assert!(!session.authenticate("wrong-password"));
        }
        assert!(session.is_locked());
    }

    #[test]
    fn test_authenticate_success_and_failure() {
        let (mut session, _) = test_session();
        assert_eq!(session.state(), AuthState::Unauthenticated);

        assert!(!session.authenticate("wrong-password"));
        assert_eq!(session.failed_attempt_count(), 1);

        assert!(session.authenticate(PASSWORD));
        assert_eq!(session.failed_attempt_count(), 0);
        assert_eq!(
            session.state(),
            AuthState::Authenticated {
                session_active: false
            }
        );
    }

    #[test]
    fn test_empty_candidate_is_not_a_failure() {
        let (mut session, _) = test_session();
        assert!(!session.authenticate(""));
        assert_eq!(session.failed_attempt_count(), 0);
    }

    #[test]
    fn test_unbound_session_refuses() {
        let mut session = AuthSession::new(test_config(), Arc::new(test_clock()));
        assert_eq!(session.principal_id(), PrincipalId::UNBOUND);
        assert!(!session.authenticate(PASSWORD));
        assert_eq!(session.failed_attempt_count(), 0);
        assert!(!session.start_session("10.0.0.1", "test"));
    }

    #[test]
    fn test_bind_rejects_mismatch() {
        let mut session = AuthSession::new(test_config(), Arc::new(test_clock()));
        let principal = Principal::new(1, "a@example.com", "A", "B", "Employee");

        let err = session
            .bind(principal.clone(), CredentialRecord::new(2, "x:y"))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));

        let err = session
            .bind(Principal::default(), CredentialRecord::new(0, "x:y"))
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidInput(_)));

        assert!(session.bind(principal, CredentialRecord::new(1, "x:y")).is_ok());
    }

    #[test]
    fn test_five_failures_lock_even_correct_password() {
        let (mut session, _) = test_session();

        for attempt in 1..=4 {
            assert!(!session.authenticate("wrong-password"));
            assert_eq!(session.failed_attempt_count(), attempt);
            assert!(!session.is_locked());
        }
        assert_eq!(session.attempts_remaining(), 1);

        assert!(!session.authenticate("wrong-password"));
        assert!(session.is_locked());
        assert_eq!(session.attempts_remaining(), 0);
        assert!(matches!(session.state(), AuthState::Locked { .. }));

        assert!(!session.authenticate(PASSWORD));
        assert_eq!(session.failed_attempt_count(), 5);
    }

    #[test]
    fn test_lock_does_not_expire_by_default() {
        let (mut session, clock) = test_session();
        lock(&mut session);

        clock.advance(Duration::days(30));
        assert!(session.is_locked());
        assert!(!session.authenticate(PASSWORD));
    }

    #[test]
    fn test_auto_unlock_policy() {
        let (mut session, clock) = test_session_with(AuthConfig {
            lockout: LockoutPolicy::with_auto_unlock(15),
            ..test_config()
        });
        lock(&mut session);

        clock.advance(Duration::minutes(14));
        assert!(session.is_locked());
        assert!(!session.authenticate(PASSWORD));

        clock.advance(Duration::minutes(1));
        assert!(!session.is_locked());
        assert_eq!(session.attempts_remaining(), 5);
        assert_eq!(session.failed_attempt_count(), 0);
        assert!(session.authenticate(PASSWORD));
        assert_eq!(session.failed_attempt_count(), 0);
    }

    #[test]
    fn test_auto_unlock_resets_counter_before_checking() {
        let (mut session, clock) = test_session_with(AuthConfig {
            lockout: LockoutPolicy::with_auto_unlock(15),
            ..test_config()
        });
        lock(&mut session);
        clock.advance(Duration::minutes(20));

        assert!(!session.authenticate("wrong-password"));
        assert_eq!(session.failed_attempt_count(), 1);
        assert!(!session.is_locked());
    }

    #[test]
    fn test_explicit_unlock() {
        let (mut session, _) = test_session();
        lock(&mut session);

        session.unlock();
        assert!(!session.is_locked());
        assert_eq!(session.failed_attempt_count(), 0);
        assert_eq!(session.state(), AuthState::Unauthenticated);
        assert!(session.authenticate(PASSWORD));
    }

    #[test]
    fn test_lock_ends_active_session() {
        let (mut session, _) = test_session();
        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));

        lock(&mut session);
        assert!(!session.is_session_active());
        assert!(!session.start_session("10.0.0.1", "test"));
    }

    #[test]
    fn test_failed_attempt_ends_active_session() {
        let clock = test_clock();
        let config = test_config();
        let hasher = CredentialHasher::new(config.hasher);
        let principal = Principal::new(3, "it@example.com", "Iris", "Tan", "IT");
        let credential = CredentialRecord::from_password(3, PASSWORD, &hasher).unwrap();
        let mut session =
            AuthSession::bound(principal, credential, config, Arc::new(clock)).unwrap();

        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));
        assert!(session.has_permission(Permission::ManageAccounts));

        assert!(!session.authenticate("wrong-password"));
        assert_eq!(session.state(), AuthState::Unauthenticated);
        assert!(!session.is_session_active());
        assert!(!session.is_session_valid());
        assert!(!session.update_session_activity());
        assert!(!session.has_permission(Permission::ManageAccounts));
        assert!(!session.start_session("10.0.0.1", "test"));
    }

    #[test]
    fn test_logout_revokes_permissions() {
        let (mut session, _) = test_session();
        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));

        session.logout();
        assert!(!session.is_session_valid());
        assert!(!session.has_permission(Permission::ViewOwnRecords));
    }

    #[test]
    fn test_session_requires_authentication() {
        let (mut session, _) = test_session();
        assert!(!session.start_session("10.0.0.1", "test"));

        assert!(!session.authenticate("wrong-password"));
        assert!(!session.start_session("10.0.0.1", "test"));

        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "Mozilla/5.0"));

        let active = session.session().unwrap();
        assert_eq!(active.client_address, "10.0.0.1");
        assert_eq!(active.client_agent, "Mozilla/5.0");
        assert_eq!(active.started_at, active.last_activity);
        assert_eq!(active.started_at.offset().local_minus_utc(), 8 * 3600);
    }

    #[test]
    fn test_session_ids_are_unique() {
        let (mut session, _) = test_session();
        assert!(session.authenticate(PASSWORD));

        assert!(session.start_session("10.0.0.1", "test"));
        let first = session.session_id().unwrap();
        session.end_session();
        assert!(session.start_session("10.0.0.1", "test"));
        let second = session.session_id().unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_session_lifecycle() {
        let (mut session, _) = test_session();
        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));

        assert!(session.is_session_active());
        assert!(session.is_session_valid());
        assert_eq!(
            session.state(),
            AuthState::Authenticated {
                session_active: true
            }
        );

        session.end_session();
        assert!(!session.is_session_active());
        assert!(!session.is_session_valid());
        assert!(session.session_id().is_none());
        assert!(session.is_authenticated());

        // Idempotent
        session.end_session();
        assert!(!session.is_session_active());
    }

    #[test]
    fn test_session_timeout() {
        let (mut session, clock) = test_session();
        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));

        clock.advance(Duration::minutes(29));
        assert!(session.is_session_valid());

        clock.advance(Duration::minutes(1));
        assert!(session.is_session_active());
        assert!(!session.is_session_valid());
        assert!(!session.update_session_activity());
    }

    #[test]
    fn test_activity_extends_session() {
        let (mut session, clock) = test_session();
        assert!(!session.update_session_activity());

        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));

        clock.advance(Duration::minutes(20));
        assert!(session.update_session_activity());
        clock.advance(Duration::minutes(20));

        assert!(session.is_session_valid());
        assert_eq!(session.session_duration_minutes(), 40);
        assert_eq!(session.time_until_expiry_minutes(), 10);
    }

    #[test]
    fn test_duration_and_expiry_never_negative() {
        let (mut session, clock) = test_session();
        assert_eq!(session.session_duration_minutes(), 0);
        assert_eq!(session.time_until_expiry_minutes(), 0);

        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));
        assert_eq!(session.session_duration_minutes(), 0);
        assert_eq!(session.time_until_expiry_minutes(), 30);

        clock.advance(Duration::hours(5));
        assert_eq!(session.session_duration_minutes(), 300);
        assert_eq!(session.time_until_expiry_minutes(), 0);

        clock.advance(Duration::hours(-10));
        assert_eq!(session.session_duration_minutes(), 0);
        assert!(session.time_until_expiry_minutes() >= 0);
    }

    #[test]
    fn test_logout_drops_authentication() {
        let (mut session, _) = test_session();
        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));

        session.logout();
        assert_eq!(session.state(), AuthState::Unauthenticated);
        assert!(!session.start_session("10.0.0.1", "test"));
    }

    #[test]
    fn test_reset_token_verify() {
        let (mut session, _) = test_session();
        assert!(!session.verify_password_reset_token("anything"));

        let token = session.generate_password_reset_token();
        assert_eq!(token.len(), RESET_TOKEN_BYTES * 2);
        assert!(session.verify_password_reset_token(&token));
        // Verification does not consume
        assert!(session.verify_password_reset_token(&token));

        assert!(!session.verify_password_reset_token(""));
        assert!(!session.verify_password_reset_token("not-the-token"));
        assert!(!session.verify_password_reset_token(&token.to_uppercase()));
    }

    #[test]
    fn test_new_token_replaces_old() {
        let (mut session, _) = test_session();
        let first = session.generate_password_reset_token();
        let second = session.generate_password_reset_token();

        assert_ne!(first, second);
        assert!(!session.verify_password_reset_token(&first));
        assert!(session.verify_password_reset_token(&second));
    }

    #[test]
    fn test_reset_token_expires() {
        let (mut session, clock) = test_session();
        let token = session.generate_password_reset_token();

        clock.advance(Duration::minutes(59));
        assert!(session.verify_password_reset_token(&token));

        clock.advance(Duration::minutes(1));
        assert!(!session.verify_password_reset_token(&token));
        assert!(!session.reset_password(&token, NEW_PASSWORD));
    }

    #[test]
    fn test_reset_password_single_use() {
        let (mut session, _) = test_session();
        let token = session.generate_password_reset_token();

        assert!(session.reset_password(&token, NEW_PASSWORD));
        assert!(!session.verify_password_reset_token(&token));
        assert!(!session.reset_password(&token, "Another$2026"));

        assert!(!session.authenticate(PASSWORD));
        assert!(session.authenticate(NEW_PASSWORD));
    }

    #[test]
    fn test_reset_clears_lock() {
        let (mut session, _) = test_session();
        lock(&mut session);

        let token = session.generate_password_reset_token();
        assert!(session.reset_password(&token, NEW_PASSWORD));

        assert!(!session.is_locked());
        assert_eq!(session.failed_attempt_count(), 0);
        assert_eq!(session.state(), AuthState::Unauthenticated);
        assert!(session.authenticate(NEW_PASSWORD));
    }

    #[test]
    fn test_reset_ends_session() {
        let (mut session, _) = test_session();
        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));

        let token = session.generate_password_reset_token();
        assert!(session.reset_password(&token, NEW_PASSWORD));
        assert!(!session.is_session_active());
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_reset_enforces_policy_by_default() {
        let (mut session, _) = test_session();
        let token = session.generate_password_reset_token();
        let before = session.credential().unwrap().clone();

        assert!(!session.reset_password(&token, "weak"));
        assert_eq!(session.credential().unwrap(), &before);
        // Token survives a rejected attempt
        assert!(session.verify_password_reset_token(&token));
        assert!(session.reset_password(&token, NEW_PASSWORD));
    }

    #[test]
    fn test_reset_without_policy_enforcement() {
        let mut config = test_config();
        config.reset.enforce_policy = false;
        let (mut session, _) = test_session_with(config);

        let token = session.generate_password_reset_token();
        assert!(!session.reset_password(&token, ""));
        assert!(session.reset_password(&token, "weak"));
        assert!(session.authenticate("weak"));
    }

    #[test]
    fn test_reset_does_not_block_authentication() {
        let (mut session, _) = test_session();
        let token = session.generate_password_reset_token();

        assert!(session.authenticate(PASSWORD));
        assert!(session.verify_password_reset_token(&token));
    }

    #[test]
    fn test_change_password() {
        let (mut session, _) = test_session();
        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));

        assert!(!session.change_password(PASSWORD, "weak"));
        assert!(session.change_password(PASSWORD, NEW_PASSWORD));
        assert!(!session.is_session_active());

        assert!(!session.authenticate(PASSWORD));
        assert!(session.authenticate(NEW_PASSWORD));
    }

    #[test]
    fn test_change_password_wrong_current_counts_as_failure() {
        let (mut session, _) = test_session();
        assert!(!session.change_password("wrong-password", NEW_PASSWORD));
        assert_eq!(session.failed_attempt_count(), 1);
        assert!(session.authenticate(PASSWORD));
    }

    #[test]
    fn test_permissions_require_valid_session() {
        let clock = test_clock();
        let config = test_config();
        let hasher = CredentialHasher::new(config.hasher);
        let principal = Principal::new(3, "hr@example.com", "Hana", "Lim", "HR");
        let credential = CredentialRecord::from_password(3, PASSWORD, &hasher).unwrap();
        let mut session =
            AuthSession::bound(principal, credential, config, Arc::new(clock.clone())).unwrap();

        assert!(session.is_admin());
        assert!(!session.has_permission(Permission::ProcessPayroll));

        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));
        assert!(session.has_permission(Permission::ProcessPayroll));

        clock.advance(Duration::hours(1));
        assert!(!session.has_permission(Permission::ProcessPayroll));
    }

    #[test]
    fn test_employee_permissions() {
        let (mut session, _) = test_session();
        assert!(session.is_employee());
        assert!(!session.is_admin());

        assert!(session.authenticate(PASSWORD));
        assert!(session.start_session("10.0.0.1", "test"));
        assert!(session.has_permission(Permission::ViewOwnRecords));
        assert!(!session.has_permission(Permission::ManageEmployees));
    }

    #[test]
    fn test_debug_hides_secrets() {
        let (mut session, _) = test_session();
        let token = session.generate_password_reset_token();
        let hash = session.credential().unwrap().salted_hash().to_string();

        let debug = format!("{:?}", session);
        assert!(!debug.contains(&token));
        assert!(!debug.contains(&hash));
        assert!(debug.contains("reset_pending: true"));
    }
}
