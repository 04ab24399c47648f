//! In-memory collaborators for dev and tests.
//!
//! Both stand-ins honor the collaborator contracts: invalid input is a
//! `None`/`Rejected`, transport failure is switchable for exercising the
//! no-partial-update guarantee, and a poisoned lock degrades to a transport
//! error rather than a panic.

use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::Utc;

use tradepost_auth::{Mode, OnboardingState, OnboardingStep, Profile, Role};

use crate::collaborator::{
    CollaboratorError, CredentialProvider, OtpRequestAck, ProfileStore, VendorOnboardingDraft,
};

fn poisoned() -> CollaboratorError {
    CollaboratorError::Transport("collaborator state lock poisoned".into())
}

#[derive(Debug, Clone)]
struct SeededAccount {
    code: String,
    profile: Profile,
}

/// Credential backend stand-in with pre-seeded accounts.
#[derive(Debug, Default)]
pub struct MockCredentialProvider {
    accounts: RwLock<HashMap<String, SeededAccount>>,
    google_account: RwLock<Option<Profile>>,
    fail_transport: AtomicBool,
    logout_calls: AtomicU32,
}

impl MockCredentialProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an account reachable at `contact` with a fixed one-time code.
    pub fn seed(&self, contact: impl Into<String>, code: impl Into<String>, profile: Profile) {
        if let Ok(mut accounts) = self.accounts.write() {
            accounts.insert(
                contact.into(),
                SeededAccount {
                    code: code.into(),
                    profile,
                },
            );
        }
    }

    /// Link a profile to federated sign-in.
    pub fn seed_google(&self, profile: Profile) {
        if let Ok(mut slot) = self.google_account.write() {
            *slot = Some(profile);
        }
    }

    /// Make every subsequent call fail with a transport error.
    pub fn break_transport(&self) {
        self.fail_transport.store(true, Ordering::SeqCst);
    }

    pub fn restore_transport(&self) {
        self.fail_transport.store(false, Ordering::SeqCst);
    }

    /// How many times the service asked for external session teardown.
    pub fn logout_calls(&self) -> u32 {
        self.logout_calls.load(Ordering::SeqCst)
    }

    fn check_transport(&self) -> Result<(), CollaboratorError> {
        if self.fail_transport.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Transport(
                "credential backend unreachable".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for MockCredentialProvider {
    async fn request_otp(&self, contact: &str) -> Result<OtpRequestAck, CollaboratorError> {
        self.check_transport()?;
        // Acknowledge for unknown contacts too; account existence is not
        // leaked through this call.
        Ok(OtpRequestAck {
            contact: contact.to_string(),
            requested_at: Utc::now(),
        })
    }

    async fn verify_otp(&self, code: &str) -> Result<Option<Profile>, CollaboratorError> {
        self.check_transport()?;
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts
            .values()
            .find(|account| account.code == code)
            .map(|account| account.profile.clone()))
    }

    async fn sign_in_with_google(&self) -> Result<Profile, CollaboratorError> {
        self.check_transport()?;
        let slot = self.google_account.read().map_err(|_| poisoned())?;
        slot.clone()
            .ok_or_else(|| CollaboratorError::Rejected("no google account linked".into()))
    }

    async fn logout(&self) -> Result<(), CollaboratorError> {
        self.check_transport()?;
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Profile backend stand-in holding at most one signed-in account.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    me: RwLock<Option<Profile>>,
    draft: RwLock<VendorOnboardingDraft>,
    fail_transport: AtomicBool,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an account as signed in on the backend side.
    pub fn sign_in(&self, profile: Profile) {
        if let Ok(mut me) = self.me.write() {
            *me = Some(profile);
        }
    }

    /// The persisted copy, for asserting what actually got stored.
    pub fn stored_profile(&self) -> Option<Profile> {
        self.me.read().ok()?.clone()
    }

    /// The accumulated onboarding draft.
    pub fn draft(&self) -> VendorOnboardingDraft {
        self.draft
            .read()
            .map(|draft| draft.clone())
            .unwrap_or_default()
    }

    /// Make every subsequent call fail with a transport error.
    pub fn break_transport(&self) {
        self.fail_transport.store(true, Ordering::SeqCst);
    }

    pub fn restore_transport(&self) {
        self.fail_transport.store(false, Ordering::SeqCst);
    }

    fn check_transport(&self) -> Result<(), CollaboratorError> {
        if self.fail_transport.load(Ordering::SeqCst) {
            return Err(CollaboratorError::Transport(
                "profile backend unreachable".into(),
            ));
        }
        Ok(())
    }

    fn with_me<T>(
        &self,
        apply: impl FnOnce(&mut Profile) -> T,
    ) -> Result<T, CollaboratorError> {
        let mut me = self.me.write().map_err(|_| poisoned())?;
        let Some(profile) = me.as_mut() else {
            return Err(CollaboratorError::Rejected("no signed-in account".into()));
        };
        Ok(apply(profile))
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_me(&self) -> Result<Option<Profile>, CollaboratorError> {
        self.check_transport()?;
        let me = self.me.read().map_err(|_| poisoned())?;
        Ok(me.clone())
    }

    async fn update_active_mode(&self, mode: Mode) -> Result<Option<Profile>, CollaboratorError> {
        self.check_transport()?;
        let mut me = self.me.write().map_err(|_| poisoned())?;
        Ok(me.as_mut().map(|profile| {
            profile.active_role = Some(mode);
            profile.clone()
        }))
    }

    async fn upgrade_to_vendor(&self) -> Result<Profile, CollaboratorError> {
        self.check_transport()?;
        self.with_me(|profile| {
            if profile.role == Role::Customer {
                profile.role = Role::Vendor;
            }
            if profile.vendor_onboarding_status != OnboardingState::Completed {
                profile.vendor_onboarding_status = OnboardingState::InProgress;
            }
            if profile.vendor_onboarding_step.is_none() {
                profile.vendor_onboarding_step = Some(OnboardingStep::Account);
            }
            profile.active_role = Some(Mode::Vendor);
            profile.clone()
        })
    }

    async fn update_vendor_onboarding_draft(
        &self,
        patch: VendorOnboardingDraft,
    ) -> Result<Profile, CollaboratorError> {
        self.check_transport()?;
        {
            let mut draft = self.draft.write().map_err(|_| poisoned())?;
            if let Some(store_name) = patch.store_name {
                draft.store_name = Some(store_name);
            }
            if let Some(payout_account) = patch.payout_account {
                draft.payout_account = Some(payout_account);
            }
            if let Some(listing_title) = patch.listing_title {
                draft.listing_title = Some(listing_title);
            }
        }
        self.with_me(|profile| {
            if profile.vendor_onboarding_status == OnboardingState::NotStarted {
                profile.vendor_onboarding_status = OnboardingState::InProgress;
            }
            profile.clone()
        })
    }

    async fn set_vendor_onboarding_step(
        &self,
        step: OnboardingStep,
    ) -> Result<Profile, CollaboratorError> {
        self.check_transport()?;
        self.with_me(|profile| {
            profile.vendor_onboarding_step = Some(step);
            if profile.vendor_onboarding_status == OnboardingState::NotStarted {
                profile.vendor_onboarding_status = OnboardingState::InProgress;
            }
            profile.clone()
        })
    }

    async fn complete_vendor_onboarding(&self) -> Result<Profile, CollaboratorError> {
        self.check_transport()?;
        self.with_me(|profile| {
            profile.vendor_onboarding_status = OnboardingState::Completed;
            profile.vendor_onboarding_step = Some(OnboardingStep::SellerHub);
            profile.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradepost_core::UserId;

    fn profile() -> Profile {
        Profile {
            user_id: UserId::new(),
            display_name: "Mock Account".into(),
            contact: "mock@example.com".into(),
            role: Role::Customer,
            active_role: None,
            vendor_onboarding_status: OnboardingState::NotStarted,
            vendor_onboarding_step: None,
        }
    }

    #[tokio::test]
    async fn otp_request_acknowledges_unknown_contacts() {
        let provider = MockCredentialProvider::new();

        let ack = provider.request_otp("nobody@example.com").await.unwrap();
        assert_eq!(ack.contact, "nobody@example.com");
        assert!(provider.verify_otp("123456").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn broken_transport_fails_every_call() {
        let provider = MockCredentialProvider::new();
        provider.seed("mock@example.com", "123456", profile());
        provider.break_transport();

        let err = provider.verify_otp("123456").await.unwrap_err();
        let CollaboratorError::Transport(_) = err else {
            panic!("expected transport failure, got {err:?}");
        };

        provider.restore_transport();
        assert!(provider.verify_otp("123456").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn profile_ops_reject_without_a_signed_in_account() {
        let store = InMemoryProfileStore::new();

        assert!(store.get_me().await.unwrap().is_none());
        assert!(store.update_active_mode(Mode::Vendor).await.unwrap().is_none());

        let err = store.upgrade_to_vendor().await.unwrap_err();
        let CollaboratorError::Rejected(_) = err else {
            panic!("expected rejection, got {err:?}");
        };
    }

    #[tokio::test]
    async fn draft_patches_accumulate() {
        let store = InMemoryProfileStore::new();
        store.sign_in(profile());

        store
            .update_vendor_onboarding_draft(VendorOnboardingDraft {
                store_name: Some("Corner Shop".into()),
                ..VendorOnboardingDraft::default()
            })
            .await
            .unwrap();
        store
            .update_vendor_onboarding_draft(VendorOnboardingDraft {
                payout_account: Some("IBAN-1".into()),
                ..VendorOnboardingDraft::default()
            })
            .await
            .unwrap();

        let draft = store.draft();
        assert_eq!(draft.store_name.as_deref(), Some("Corner Shop"));
        assert_eq!(draft.payout_account.as_deref(), Some("IBAN-1"));
        assert_eq!(draft.listing_title, None);
    }

    #[tokio::test]
    async fn upgrade_keeps_an_admin_role() {
        let store = InMemoryProfileStore::new();
        let mut admin = profile();
        admin.role = Role::Admin;
        store.sign_in(admin);

        let upgraded = store.upgrade_to_vendor().await.unwrap();
        assert_eq!(upgraded.role, Role::Admin);
        assert_eq!(upgraded.vendor_onboarding_status, OnboardingState::InProgress);
    }
}
