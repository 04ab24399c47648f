//! Contracts of the external collaborators the transition service drives.
//!
//! The real implementations live outside this repository (a credential
//! backend and a profile API); [`crate::mock`] provides in-memory stand-ins
//! for dev and tests. Shared rule across both traits: invalid input is a
//! `None` or a `Rejected`, never a panic; `Transport` is reserved for the
//! collaborator being unreachable or failing unexpectedly.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use tradepost_auth::{Mode, OnboardingStep, Profile};

/// Failure surfaced by a collaborator call.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// The collaborator could not be reached or failed unexpectedly.
    #[error("collaborator transport failure: {0}")]
    Transport(String),
    /// The collaborator understood the request and refused it.
    #[error("collaborator rejected the request: {0}")]
    Rejected(String),
}

/// Acknowledgement of a one-time code request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpRequestAck {
    pub contact: String,
    pub requested_at: DateTime<Utc>,
}

/// Patch applied to the stored vendor onboarding draft.
///
/// `Some` overwrites the field, `None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorOnboardingDraft {
    pub store_name: Option<String>,
    pub payout_account: Option<String>,
    pub listing_title: Option<String>,
}

/// Credential backend: one-time codes, federated sign-in, session teardown.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Ask the backend to send a one-time code. Acknowledges regardless of
    /// whether an account exists for the contact (existence is not leaked).
    async fn request_otp(&self, contact: &str) -> Result<OtpRequestAck, CollaboratorError>;

    /// `Ok(None)` when the code does not match any pending sign-in.
    async fn verify_otp(&self, code: &str) -> Result<Option<Profile>, CollaboratorError>;

    async fn sign_in_with_google(&self) -> Result<Profile, CollaboratorError>;

    /// Clear every externally persisted session copy.
    async fn logout(&self) -> Result<(), CollaboratorError>;
}

/// Profile persistence backend.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The signed-in account, if the backend has one.
    async fn get_me(&self) -> Result<Option<Profile>, CollaboratorError>;

    /// Persist the selected mode. `Ok(None)` when no account is signed in
    /// on the backend side.
    async fn update_active_mode(&self, mode: Mode) -> Result<Option<Profile>, CollaboratorError>;

    async fn upgrade_to_vendor(&self) -> Result<Profile, CollaboratorError>;

    async fn update_vendor_onboarding_draft(
        &self,
        draft: VendorOnboardingDraft,
    ) -> Result<Profile, CollaboratorError>;

    async fn set_vendor_onboarding_step(
        &self,
        step: OnboardingStep,
    ) -> Result<Profile, CollaboratorError>;

    async fn complete_vendor_onboarding(&self) -> Result<Profile, CollaboratorError>;
}

#[async_trait]
impl<T> CredentialProvider for Arc<T>
where
    T: CredentialProvider + ?Sized,
{
    async fn request_otp(&self, contact: &str) -> Result<OtpRequestAck, CollaboratorError> {
        (**self).request_otp(contact).await
    }

    async fn verify_otp(&self, code: &str) -> Result<Option<Profile>, CollaboratorError> {
        (**self).verify_otp(code).await
    }

    async fn sign_in_with_google(&self) -> Result<Profile, CollaboratorError> {
        (**self).sign_in_with_google().await
    }

    async fn logout(&self) -> Result<(), CollaboratorError> {
        (**self).logout().await
    }
}

#[async_trait]
impl<T> ProfileStore for Arc<T>
where
    T: ProfileStore + ?Sized,
{
    async fn get_me(&self) -> Result<Option<Profile>, CollaboratorError> {
        (**self).get_me().await
    }

    async fn update_active_mode(&self, mode: Mode) -> Result<Option<Profile>, CollaboratorError> {
        (**self).update_active_mode(mode).await
    }

    async fn upgrade_to_vendor(&self) -> Result<Profile, CollaboratorError> {
        (**self).upgrade_to_vendor().await
    }

    async fn update_vendor_onboarding_draft(
        &self,
        draft: VendorOnboardingDraft,
    ) -> Result<Profile, CollaboratorError> {
        (**self).update_vendor_onboarding_draft(draft).await
    }

    async fn set_vendor_onboarding_step(
        &self,
        step: OnboardingStep,
    ) -> Result<Profile, CollaboratorError> {
        (**self).set_vendor_onboarding_step(step).await
    }

    async fn complete_vendor_onboarding(&self) -> Result<Profile, CollaboratorError> {
        (**self).complete_vendor_onboarding().await
    }
}
