//! `tradepost-auth` — pure authorization core for the storefront session.
//!
//! This crate is intentionally decoupled from IO: everything here is a total
//! function over an [`AuthorizationState`] snapshot. The single writer of
//! that snapshot lives in `tradepost-session`.

pub mod permissions;
pub mod policy;
pub mod redirect;
pub mod state;

pub use permissions::{PermissionKey, Permissions, evaluate, has};
pub use policy::{AuthorizeResult, DenyReason, RoutePolicy, authorize};
pub use redirect::{
    CUSTOMER_HOME, LOGIN_PATH, ROOT_PATH, VENDOR_HOME, VENDOR_ONBOARDING_PATH, home_path_for,
    post_switch_path,
};
pub use state::{
    AuthStatus, AuthorizationState, Capability, CapabilitySet, Mode, OnboardingState,
    OnboardingStep, Profile, Role, Session,
};
