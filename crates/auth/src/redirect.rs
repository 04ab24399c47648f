//! Canonical landing paths and post-mode-switch navigation.
//!
//! Paths live here and nowhere else; the route authorizer and the transition
//! service both resolve through these functions so redirect targets cannot
//! drift apart.

use crate::permissions::{PermissionKey, has};
use crate::state::{AuthorizationState, Mode};

/// Customer landing page.
pub const CUSTOMER_HOME: &str = "/dashboard";
/// Vendor landing page.
pub const VENDOR_HOME: &str = "/vendor/dashboard";
/// Sign-in screen; unauthenticated denials land here.
pub const LOGIN_PATH: &str = "/auth/login";
/// Storefront root; capability denials land here.
pub const ROOT_PATH: &str = "/";
/// Vendor registration wizard. Takes a `step` query parameter.
pub const VENDOR_ONBOARDING_PATH: &str = "/vendor/onboarding";

/// Prefix shared by every vendor-area route.
const VENDOR_PREFIX: &str = "/vendor/";

/// Canonical landing page for a snapshot.
///
/// Vendor home only when vendor mode is actually backed by the sell grant;
/// every other state (including vendor mode without the grant) lands on the
/// customer dashboard.
pub fn home_path_for(state: &AuthorizationState) -> &'static str {
    if state.active_mode == Mode::Vendor && has(state, PermissionKey::CanSell) {
        VENDOR_HOME
    } else {
        CUSTOMER_HOME
    }
}

/// Where to navigate right after a mode switch, if anywhere.
///
/// Entering vendor mode always jumps to the vendor dashboard. Returning to
/// customer mode only forces navigation off vendor pages; on a neutral page
/// the user stays put.
pub fn post_switch_path(next_mode: Mode, current_path: &str) -> Option<&'static str> {
    match next_mode {
        Mode::Vendor => Some(VENDOR_HOME),
        Mode::Customer if current_path.starts_with(VENDOR_PREFIX) => Some(CUSTOMER_HOME),
        Mode::Customer => None,
    }
}
