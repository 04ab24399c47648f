//! The auth/mode transition service.
//!
//! Every mutation follows the same pipeline:
//!
//! ```text
//! operation
//!   ↓
//! 1. Acquire the write gate (one mutation in flight at a time)
//!   ↓
//! 2. Check policy against the current snapshot (pure)
//!   ↓
//! 3. Call the external collaborator (credential / profile backend)
//!   ↓
//! 4. Build the next snapshot and publish it (version + 1)
//! ```
//!
//! A failure at any step returns before publication, so observers never see
//! a partially applied transition: the snapshot either stays what it was or
//! becomes the fully settled next state. Versions are stamped monotonically
//! and never reset, so a consumer holding a stale snapshot can always detect
//! that it has been superseded.

use chrono::{Duration, Utc};
use tokio::sync::{Mutex, watch};
use uuid::Uuid;

use tradepost_auth::{
    AuthStatus, AuthorizationState, Capability, CapabilitySet, Mode, OnboardingState,
    OnboardingStep, PermissionKey, Profile, Session, has,
};

use crate::collaborator::{CredentialProvider, OtpRequestAck, ProfileStore, VendorOnboardingDraft};
use crate::error::TransitionError;

/// Single writer of [`AuthorizationState`].
///
/// Generic over its collaborators so tests run against the in-memory mocks
/// and an application wires in real backends without touching this code.
#[derive(Debug)]
pub struct SessionService<C, P> {
    credentials: C,
    profiles: P,
    state: watch::Sender<AuthorizationState>,
    write_gate: Mutex<()>,
}

impl<C, P> SessionService<C, P> {
    pub fn new(credentials: C, profiles: P) -> Self {
        let (state, _) = watch::channel(AuthorizationState::anonymous());
        Self {
            credentials,
            profiles,
            state,
            write_gate: Mutex::new(()),
        }
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> AuthorizationState {
        self.state.borrow().clone()
    }

    /// Change notification; yields whenever a transition is published.
    pub fn subscribe(&self) -> watch::Receiver<AuthorizationState> {
        self.state.subscribe()
    }

    /// Replace the published snapshot. Callers hold the write gate.
    fn publish(
        &self,
        build: impl FnOnce(&AuthorizationState) -> AuthorizationState,
    ) -> AuthorizationState {
        let current = self.state.borrow().clone();
        let next = build(&current);
        self.state.send_replace(next.clone());
        next
    }
}

impl<C, P> SessionService<C, P>
where
    C: CredentialProvider,
    P: ProfileStore,
{
    /// Ask the credential backend to send a one-time code. No state change.
    pub async fn request_otp(&self, contact: &str) -> Result<OtpRequestAck, TransitionError> {
        let ack = self.credentials.request_otp(contact).await?;
        tracing::debug!(contact = %ack.contact, "one-time code requested");
        Ok(ack)
    }

    /// Exchange a one-time code for a signed-in session.
    ///
    /// `Ok(None)` means the code was wrong: the published state is untouched
    /// and the caller surfaces the failure to the user.
    pub async fn verify_otp(
        &self,
        code: &str,
    ) -> Result<Option<AuthorizationState>, TransitionError> {
        let _gate = self.write_gate.lock().await;
        let Some(profile) = self.credentials.verify_otp(code).await? else {
            tracing::warn!("one-time code rejected");
            return Ok(None);
        };
        Ok(Some(self.adopt_login(profile)))
    }

    pub async fn sign_in_with_google(&self) -> Result<AuthorizationState, TransitionError> {
        let _gate = self.write_gate.lock().await;
        let profile = self.credentials.sign_in_with_google().await?;
        Ok(self.adopt_login(profile))
    }

    /// Rebuild the signed-in state from the profile backend, for application
    /// start with a server-side session still alive. Publishes nothing when
    /// no account is signed in.
    pub async fn restore(&self) -> Result<Option<AuthorizationState>, TransitionError> {
        let _gate = self.write_gate.lock().await;
        let Some(profile) = self.profiles.get_me().await? else {
            return Ok(None);
        };
        Ok(Some(self.adopt_login(profile)))
    }

    /// Switch the operating mode.
    ///
    /// The only sanctioned path to change the active mode. Switching into
    /// vendor mode without the switch permission is a policy violation, not
    /// a silent no-op. The preference is persisted before anything is
    /// published, so the snapshot and the stored profile cannot desync.
    pub async fn set_active_mode(
        &self,
        next_mode: Mode,
    ) -> Result<AuthorizationState, TransitionError> {
        let _gate = self.write_gate.lock().await;
        let current = self.current();

        // 1) Policy checks against the current snapshot.
        if next_mode == Mode::Vendor && !has(&current, PermissionKey::CanSwitchToVendorMode) {
            tracing::warn!(mode = %next_mode, "mode switch denied");
            return Err(TransitionError::policy(
                "switching to vendor mode requires a signed-in account with the sell capability",
            ));
        }
        if current.profile.is_none() {
            return Err(TransitionError::policy(
                "no signed-in account to switch modes for",
            ));
        }

        // 2) Persist the preference.
        let Some(profile) = self.profiles.update_active_mode(next_mode).await? else {
            return Err(TransitionError::policy(
                "profile backend has no signed-in account",
            ));
        };

        // 3) Publish the switched snapshot.
        let next = self.publish(|current| AuthorizationState {
            onboarding: onboarding_for(&profile, &current.capabilities),
            profile: Some(profile),
            active_mode: next_mode,
            version: current.version + 1,
            ..current.clone()
        });
        tracing::info!(mode = %next_mode, version = next.version, "mode switched");
        Ok(next)
    }

    /// First-time seller path: grant the sell capability, open onboarding,
    /// and land in vendor mode. Bypasses the ordinary switch guard, since a
    /// customer cannot "switch" into a capability they are acquiring here.
    ///
    /// Idempotent for accounts that already sell: the grant is a set insert
    /// and a completed onboarding never regresses.
    pub async fn upgrade_to_vendor_from_onboarding(
        &self,
    ) -> Result<AuthorizationState, TransitionError> {
        let _gate = self.write_gate.lock().await;
        let current = self.current();
        if current.status != AuthStatus::Authenticated {
            return Err(TransitionError::policy(
                "vendor upgrade requires a signed-in account",
            ));
        }

        let profile = self.profiles.upgrade_to_vendor().await?;

        let next = self.publish(|current| {
            let mut capabilities = current.capabilities.clone();
            capabilities.grant(Capability::CanSell);
            let onboarding = match current.onboarding {
                OnboardingState::Completed => OnboardingState::Completed,
                _ => OnboardingState::InProgress,
            };
            AuthorizationState {
                profile: Some(profile),
                capabilities,
                active_mode: Mode::Vendor,
                onboarding,
                version: current.version + 1,
                ..current.clone()
            }
        });
        tracing::info!(version = next.version, "account upgraded to vendor");
        Ok(next)
    }

    /// Save partial onboarding form data.
    pub async fn update_vendor_onboarding_draft(
        &self,
        draft: VendorOnboardingDraft,
    ) -> Result<AuthorizationState, TransitionError> {
        let _gate = self.write_gate.lock().await;
        self.require_seller("updating the vendor onboarding draft")?;
        let profile = self.profiles.update_vendor_onboarding_draft(draft).await?;
        Ok(self.adopt_profile(profile, "onboarding draft saved"))
    }

    /// Record the wizard stage the user is on.
    pub async fn set_vendor_onboarding_step(
        &self,
        step: OnboardingStep,
    ) -> Result<AuthorizationState, TransitionError> {
        let _gate = self.write_gate.lock().await;
        self.require_seller("moving the vendor onboarding step")?;
        let profile = self.profiles.set_vendor_onboarding_step(step).await?;
        Ok(self.adopt_profile(profile, "onboarding step saved"))
    }

    /// Finish onboarding. Completion pins the onboarding state; later
    /// transitions never regress it.
    pub async fn complete_vendor_onboarding(
        &self,
    ) -> Result<AuthorizationState, TransitionError> {
        let _gate = self.write_gate.lock().await;
        self.require_seller("completing vendor onboarding")?;
        let profile = self.profiles.complete_vendor_onboarding().await?;
        let next = self.publish(|current| AuthorizationState {
            profile: Some(profile),
            onboarding: OnboardingState::Completed,
            version: current.version + 1,
            ..current.clone()
        });
        tracing::info!(version = next.version, "vendor onboarding completed");
        Ok(next)
    }

    /// Sign out: clear the external session copies, then reset to anonymous.
    ///
    /// The version keeps counting across logout so snapshots of the previous
    /// session remain detectably stale.
    pub async fn logout(&self) -> Result<AuthorizationState, TransitionError> {
        let _gate = self.write_gate.lock().await;
        self.credentials.logout().await?;
        let next = self.publish(|current| AuthorizationState {
            version: current.version + 1,
            ..AuthorizationState::anonymous()
        });
        tracing::info!(version = next.version, "signed out");
        Ok(next)
    }

    /// Publish the authenticated state for a freshly obtained profile.
    fn adopt_login(&self, profile: Profile) -> AuthorizationState {
        let capabilities = CapabilitySet::from_role(profile.role);
        let can_sell = capabilities.contains(Capability::CanSell);

        // Honor the persisted mode preference, but never publish vendor mode
        // for an account that cannot sell.
        let active_mode = match profile.active_role {
            Some(Mode::Vendor) if can_sell => Mode::Vendor,
            _ => Mode::Customer,
        };

        let onboarding = onboarding_for(&profile, &capabilities);
        let session = issue_session();
        let user_id = profile.user_id;

        let next = self.publish(|current| AuthorizationState {
            status: AuthStatus::Authenticated,
            session: Some(session),
            profile: Some(profile),
            capabilities,
            active_mode,
            onboarding,
            version: current.version + 1,
        });
        tracing::info!(
            user = %user_id,
            mode = %next.active_mode,
            version = next.version,
            "session established"
        );
        next
    }

    /// Adopt an updated profile without changing mode or capabilities.
    fn adopt_profile(&self, profile: Profile, message: &'static str) -> AuthorizationState {
        let next = self.publish(|current| AuthorizationState {
            onboarding: onboarding_for(&profile, &current.capabilities),
            profile: Some(profile),
            version: current.version + 1,
            ..current.clone()
        });
        tracing::info!(version = next.version, "{message}");
        next
    }

    fn require_seller(&self, action: &str) -> Result<(), TransitionError> {
        let current = self.current();
        if !has(&current, PermissionKey::IsAuthenticated)
            || !has(&current, PermissionKey::CanSell)
        {
            tracing::warn!(action, "onboarding operation denied");
            return Err(TransitionError::policy(format!(
                "{action} requires a signed-in account with the sell capability"
            )));
        }
        Ok(())
    }
}

/// Onboarding as seen on the snapshot: mirrors the profile for accounts that
/// can sell, `NotApplicable` for everyone else.
fn onboarding_for(profile: &Profile, capabilities: &CapabilitySet) -> OnboardingState {
    if capabilities.contains(Capability::CanSell) {
        profile.vendor_onboarding_status
    } else {
        OnboardingState::NotApplicable
    }
}

/// Issue an opaque token bundle. Token contents carry no meaning inside this
/// core; verification is the backend's concern.
fn issue_session() -> Session {
    Session {
        access_token: format!("tp-access-{}", Uuid::now_v7()),
        refresh_token: format!("tp-refresh-{}", Uuid::now_v7()),
        expires_at: Utc::now() + Duration::hours(1),
    }
}
