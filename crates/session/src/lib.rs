//! Auth/mode transition service and its collaborator contracts.
//!
//! [`SessionService`] is the single writer of
//! [`AuthorizationState`](tradepost_auth::AuthorizationState): every login,
//! logout, mode switch and onboarding action funnels through it. Readers
//! take explicit snapshots via [`SessionService::current`] or subscribe to
//! change notification via [`SessionService::subscribe`]; nothing else holds
//! mutable session state.

pub mod collaborator;
pub mod error;
pub mod mock;
pub mod service;

pub use collaborator::{
    CollaboratorError, CredentialProvider, OtpRequestAck, ProfileStore, VendorOnboardingDraft,
};
pub use error::TransitionError;
pub use mock::{InMemoryProfileStore, MockCredentialProvider};
pub use service::SessionService;
