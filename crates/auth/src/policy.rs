//! Route entry authorization.
//!
//! A [`RoutePolicy`] declares what a route requires; [`authorize`] combines
//! it with the current snapshot into an allow, or a deny carrying both a
//! redirect target and a machine-readable reason. Guards run in a fixed
//! order and the first failure wins, so the reason code is deterministic
//! even when several requirements fail at once.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::permissions::{PermissionKey, has};
use crate::redirect::{LOGIN_PATH, ROOT_PATH, VENDOR_ONBOARDING_PATH, home_path_for};
use crate::state::{AuthorizationState, Capability, Mode, OnboardingStep};

/// Requirements a route declares for itself.
///
/// `Default` is the common case: signed-in, no further demands. Public pages
/// opt out via [`RoutePolicy::public`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutePolicy {
    pub require_auth: bool,
    pub required_capability: Option<Capability>,
    pub required_mode: Option<Mode>,
    pub require_vendor_onboarded: bool,
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self {
            require_auth: true,
            required_capability: None,
            required_mode: None,
            require_vendor_onboarded: false,
        }
    }
}

impl RoutePolicy {
    /// Policy for routes anyone may enter.
    pub fn public() -> Self {
        Self {
            require_auth: false,
            ..Self::default()
        }
    }

    /// Policy of the vendor area: signed in, selling, in vendor mode, done
    /// with onboarding.
    pub fn vendor_area() -> Self {
        Self {
            require_auth: true,
            required_capability: Some(Capability::CanSell),
            required_mode: Some(Mode::Vendor),
            require_vendor_onboarded: true,
        }
    }
}

/// Why a route entry was denied. Closed set with stable codes, fit for
/// telemetry counters and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    Unauthenticated,
    MissingCapability,
    InvalidMode,
    VendorOnboardingRequired,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::Unauthenticated => "unauthenticated",
            DenyReason::MissingCapability => "missing_capability",
            DenyReason::InvalidMode => "invalid_mode",
            DenyReason::VendorOnboardingRequired => "vendor_onboarding_required",
        }
    }
}

/// Outcome of a route entry check.
///
/// A denial always carries a redirect target, so the consuming shell has a
/// deterministic next screen and never falls back to an error page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizeResult {
    Allowed,
    Denied {
        redirect_to: Cow<'static, str>,
        reason: DenyReason,
    },
}

impl AuthorizeResult {
    fn denied(redirect_to: impl Into<Cow<'static, str>>, reason: DenyReason) -> Self {
        Self::Denied {
            redirect_to: redirect_to.into(),
            reason,
        }
    }

    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    pub fn redirect_to(&self) -> Option<&str> {
        match self {
            Self::Allowed => None,
            Self::Denied { redirect_to, .. } => Some(redirect_to),
        }
    }

    pub fn reason(&self) -> Option<DenyReason> {
        match self {
            Self::Allowed => None,
            Self::Denied { reason, .. } => Some(*reason),
        }
    }
}

/// Decide whether a route may be entered under the given snapshot.
///
/// Guard order: authentication, capability, mode, vendor onboarding.
pub fn authorize(state: &AuthorizationState, policy: &RoutePolicy) -> AuthorizeResult {
    if policy.require_auth && !has(state, PermissionKey::IsAuthenticated) {
        return AuthorizeResult::denied(LOGIN_PATH, DenyReason::Unauthenticated);
    }

    if let Some(required) = policy.required_capability {
        if !state.capabilities.contains(required) {
            return AuthorizeResult::denied(ROOT_PATH, DenyReason::MissingCapability);
        }
    }

    if let Some(required) = policy.required_mode {
        if state.active_mode != required {
            return AuthorizeResult::denied(home_path_for(state), DenyReason::InvalidMode);
        }
    }

    // Gated on the sell grant rather than on the route's mode requirement:
    // a seller with unfinished onboarding is pulled into the wizard from any
    // onboarding-gated route, while accounts that cannot sell are handled by
    // the earlier guards or allowed through.
    if policy.require_vendor_onboarded
        && has(state, PermissionKey::CanSell)
        && !has(state, PermissionKey::VendorOnboardingCompleted)
    {
        let step = state
            .profile
            .as_ref()
            .and_then(|profile| profile.vendor_onboarding_step)
            .unwrap_or(OnboardingStep::Listing);
        return AuthorizeResult::denied(
            format!("{VENDOR_ONBOARDING_PATH}?step={step}"),
            DenyReason::VendorOnboardingRequired,
        );
    }

    AuthorizeResult::Allowed
}
