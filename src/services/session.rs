// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session/identity binder.
//!
//! Turns a verified ID token into a signed-in session: checks freshness,
//! runs the profile synchronizer at most once at a time per identity, and
//! broadcasts the session state to per-identity watchers.

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};

use crate::error::{AppError, Result};
use crate::models::{AuthErrorCode, Identity, UserProfile};
use crate::services::id_token::VerifiedCredential;
use crate::services::profile::ProfileSynchronizer;
use crate::time_utils::now_unix_secs;

/// Shortest password the email form accepts.
pub const MIN_PASSWORD_LEN: usize = 6;

/// What watchers of one identity see.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    SignedOut,
    SignedIn(Identity),
}

/// Next step for an email/password submission, based on the sign-in
/// methods the provider already knows for that address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailFlow {
    SignIn,
    CreateAccount,
    /// Address belongs to a Google account
    UseGoogle,
}

/// Per-identity sign-in locks
type SignInLocks = DashMap<String, Arc<Mutex<()>>>;

pub struct SessionBinder {
    profiles: ProfileSynchronizer,
    token_freshness_secs: u64,
    sessions: DashMap<String, watch::Sender<SessionState>>,
    sign_in_locks: SignInLocks,
}

impl SessionBinder {
    pub fn new(profiles: ProfileSynchronizer, token_freshness_secs: u64) -> Self {
        Self {
            profiles,
            token_freshness_secs,
            sessions: DashMap::new(),
            sign_in_locks: DashMap::new(),
        }
    }

    /// Watch the session state of `uid`. Starts out `SignedOut`.
    pub fn subscribe(&self, uid: &str) -> watch::Receiver<SessionState> {
        self.sessions
            .entry(uid.to_string())
            .or_insert_with(|| watch::channel(SessionState::SignedOut).0)
            .subscribe()
    }

    /// Complete a sign-in with a verified credential.
    ///
    /// Only a freshly minted token is accepted, so profile writes never run
    /// on a credential the backend may still reject. Concurrent sign-ins for
    /// the same identity are coalesced: a caller that finds another sign-in
    /// in flight waits for it and returns the profile it produced.
    pub async fn sign_in(&self, credential: &VerifiedCredential) -> Result<UserProfile> {
        let identity = &credential.identity;
        let uid = identity.uid.as_str();

        if !credential.is_fresh(now_unix_secs(), self.token_freshness_secs) {
            tracing::warn!(
                uid,
                issued_at = credential.issued_at,
                max_age_secs = self.token_freshness_secs,
                "Rejecting sign-in with stale ID token"
            );
            return Err(AppError::StaleToken);
        }

        let lock = self
            .sign_in_locks
            .entry(uid.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();

        let result = match lock.try_lock() {
            Ok(_guard) => self.profiles.ensure_profile(identity).await,
            Err(_) => {
                tracing::debug!(uid, "Sign-in already in progress; waiting for it");
                let _guard = lock.lock().await;
                match self.profiles.get_profile(uid).await {
                    Ok(profile) if profile.tag.is_some() => Ok(profile),
                    // The other sign-in failed partway; run the flow ourselves
                    _ => self.profiles.ensure_profile(identity).await,
                }
            }
        };

        // Last one out removes the lock
        drop(lock);
        self.sign_in_locks
            .remove_if(uid, |_, lock| Arc::strong_count(lock) == 1);

        let profile = result?;
        self.publish(uid, SessionState::SignedIn(identity.clone()));
        tracing::info!(uid, "Signed in");
        Ok(profile)
    }

    /// End the session; watchers see `SignedOut`.
    pub fn sign_out(&self, uid: &str) {
        self.publish(uid, SessionState::SignedOut);
        self.sessions
            .remove_if(uid, |_, tx| tx.receiver_count() == 0);
        tracing::info!(uid, "Signed out");
    }

    /// Number of identities with session state or a sign-in lock held.
    pub fn tracked_identities(&self) -> (usize, usize) {
        (self.sessions.len(), self.sign_in_locks.len())
    }

    fn publish(&self, uid: &str, state: SessionState) {
        self.sessions
            .entry(uid.to_string())
            .or_insert_with(|| watch::channel(SessionState::SignedOut).0)
            .send_replace(state);
    }
}

/// Map a provider error code to the message shown to the user.
///
/// `None` means the user cancelled and nothing should be shown.
pub fn report_auth_error(code: &str) -> Option<&'static str> {
    let parsed = AuthErrorCode::from_code(code);
    if parsed == AuthErrorCode::Unknown {
        tracing::warn!(code, "Unrecognized identity provider error");
    }
    parsed.user_message()
}

/// Client-side checks before the email form talks to the provider.
pub fn validate_email_credentials(email: &str, password: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Auth(AuthErrorCode::InvalidEmail));
    }
    if password.trim().chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Auth(AuthErrorCode::WeakPassword));
    }
    Ok(())
}

/// Choose the email flow from the provider's known sign-in methods.
pub fn resolve_email_flow<S: AsRef<str>>(methods: &[S]) -> Result<EmailFlow> {
    let has = |m: &str| methods.iter().any(|x| x.as_ref() == m);

    if has("password") {
        Ok(EmailFlow::SignIn)
    } else if methods.is_empty() {
        Ok(EmailFlow::CreateAccount)
    } else if has("google.com") {
        Ok(EmailFlow::UseGoogle)
    } else {
        Err(AppError::Auth(AuthErrorCode::LinkedToOtherMethod))
    }
}
