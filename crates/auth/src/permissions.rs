//! Permission evaluation.
//!
//! Permissions form a fixed, named set of booleans derived purely from an
//! [`AuthorizationState`] snapshot. The UI reads them to show or hide
//! surfaces; the route authorizer reads them to gate navigation. Both go
//! through [`has`], so a single permission can never be computed two ways.

use serde::{Deserialize, Serialize};

use crate::state::{AuthStatus, AuthorizationState, Capability, Mode, OnboardingState};

/// Identifier of a derived permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKey {
    IsAuthenticated,
    CanBuy,
    CanSell,
    IsVendorMode,
    IsCustomerMode,
    CanAccessVendorArea,
    CanAccessCustomerArea,
    CanSwitchToVendorMode,
    VendorOnboardingCompleted,
}

impl PermissionKey {
    /// Every key, in a stable order.
    pub const ALL: [PermissionKey; 9] = [
        PermissionKey::IsAuthenticated,
        PermissionKey::CanBuy,
        PermissionKey::CanSell,
        PermissionKey::IsVendorMode,
        PermissionKey::IsCustomerMode,
        PermissionKey::CanAccessVendorArea,
        PermissionKey::CanAccessCustomerArea,
        PermissionKey::CanSwitchToVendorMode,
        PermissionKey::VendorOnboardingCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionKey::IsAuthenticated => "is_authenticated",
            PermissionKey::CanBuy => "can_buy",
            PermissionKey::CanSell => "can_sell",
            PermissionKey::IsVendorMode => "is_vendor_mode",
            PermissionKey::IsCustomerMode => "is_customer_mode",
            PermissionKey::CanAccessVendorArea => "can_access_vendor_area",
            PermissionKey::CanAccessCustomerArea => "can_access_customer_area",
            PermissionKey::CanSwitchToVendorMode => "can_switch_to_vendor_mode",
            PermissionKey::VendorOnboardingCompleted => "vendor_onboarding_completed",
        }
    }
}

/// Check a single permission against a snapshot.
///
/// The single source of truth for every rule. Total over all states: an
/// unexpected combination (vendor mode without the sell grant, say) degrades
/// to `false` on the composite keys rather than panicking.
pub fn has(state: &AuthorizationState, key: PermissionKey) -> bool {
    match key {
        PermissionKey::IsAuthenticated => state.status == AuthStatus::Authenticated,
        PermissionKey::CanBuy => state.capabilities.contains(Capability::CanBuy),
        PermissionKey::CanSell => state.capabilities.contains(Capability::CanSell),
        PermissionKey::IsVendorMode => state.active_mode == Mode::Vendor,
        PermissionKey::IsCustomerMode => state.active_mode == Mode::Customer,
        PermissionKey::CanAccessVendorArea => {
            has(state, PermissionKey::IsAuthenticated)
                && has(state, PermissionKey::CanSell)
                && has(state, PermissionKey::IsVendorMode)
        }
        PermissionKey::CanAccessCustomerArea => {
            has(state, PermissionKey::IsAuthenticated)
                && has(state, PermissionKey::CanBuy)
                && has(state, PermissionKey::IsCustomerMode)
        }
        PermissionKey::CanSwitchToVendorMode => {
            has(state, PermissionKey::IsAuthenticated) && has(state, PermissionKey::CanSell)
        }
        PermissionKey::VendorOnboardingCompleted => {
            state.onboarding == OnboardingState::Completed
        }
    }
}

/// The full evaluation: every permission as a named flag.
///
/// Handy for handing the whole picture to a rendering layer in one read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Permissions {
    pub is_authenticated: bool,
    pub can_buy: bool,
    pub can_sell: bool,
    pub is_vendor_mode: bool,
    pub is_customer_mode: bool,
    pub can_access_vendor_area: bool,
    pub can_access_customer_area: bool,
    pub can_switch_to_vendor_mode: bool,
    pub vendor_onboarding_completed: bool,
}

impl Permissions {
    /// Keyed lookup; agrees with the named fields by construction.
    pub fn get(&self, key: PermissionKey) -> bool {
        match key {
            PermissionKey::IsAuthenticated => self.is_authenticated,
            PermissionKey::CanBuy => self.can_buy,
            PermissionKey::CanSell => self.can_sell,
            PermissionKey::IsVendorMode => self.is_vendor_mode,
            PermissionKey::IsCustomerMode => self.is_customer_mode,
            PermissionKey::CanAccessVendorArea => self.can_access_vendor_area,
            PermissionKey::CanAccessCustomerArea => self.can_access_customer_area,
            PermissionKey::CanSwitchToVendorMode => self.can_switch_to_vendor_mode,
            PermissionKey::VendorOnboardingCompleted => self.vendor_onboarding_completed,
        }
    }
}

/// Evaluate every permission for a snapshot.
pub fn evaluate(state: &AuthorizationState) -> Permissions {
    Permissions {
        is_authenticated: has(state, PermissionKey::IsAuthenticated),
        can_buy: has(state, PermissionKey::CanBuy),
        can_sell: has(state, PermissionKey::CanSell),
        is_vendor_mode: has(state, PermissionKey::IsVendorMode),
        is_customer_mode: has(state, PermissionKey::IsCustomerMode),
        can_access_vendor_area: has(state, PermissionKey::CanAccessVendorArea),
        can_access_customer_area: has(state, PermissionKey::CanAccessCustomerArea),
        can_switch_to_vendor_mode: has(state, PermissionKey::CanSwitchToVendorMode),
        vendor_onboarding_completed: has(state, PermissionKey::VendorOnboardingCompleted),
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::state::{CapabilitySet, OnboardingStep, Profile, Role, Session};
    use chrono::Utc;
    use tradepost_core::UserId;

    fn test_profile(role: Role) -> Profile {
        Profile {
            user_id: UserId::new(),
            display_name: "Test Account".into(),
            contact: "+15550100".into(),
            role,
            active_role: None,
            vendor_onboarding_status: OnboardingState::NotStarted,
            vendor_onboarding_step: None,
        }
    }

    fn test_session() -> Session {
        Session {
            access_token: "access-token".into(),
            refresh_token: "refresh-token".into(),
            expires_at: Utc::now(),
        }
    }

    fn signed_in(role: Role, mode: Mode) -> AuthorizationState {
        AuthorizationState {
            status: AuthStatus::Authenticated,
            session: Some(test_session()),
            profile: Some(test_profile(role)),
            capabilities: CapabilitySet::from_role(role),
            active_mode: mode,
            onboarding: match role {
                Role::Customer => OnboardingState::NotApplicable,
                _ => OnboardingState::NotStarted,
            },
            version: 1,
        }
    }

    #[test]
    fn anonymous_state_denies_everything_but_customer_mode() {
        let state = AuthorizationState::anonymous();
        let perms = evaluate(&state);

        assert!(!perms.is_authenticated);
        assert!(!perms.can_buy);
        assert!(!perms.can_sell);
        assert!(!perms.can_access_vendor_area);
        assert!(!perms.can_access_customer_area);
        assert!(!perms.can_switch_to_vendor_mode);
        assert!(!perms.vendor_onboarding_completed);
        assert!(perms.is_customer_mode);
        assert!(!perms.is_vendor_mode);
    }

    #[test]
    fn vendor_in_vendor_mode_reaches_the_vendor_area() {
        let state = signed_in(Role::Vendor, Mode::Vendor);

        assert!(has(&state, PermissionKey::CanAccessVendorArea));
        assert!(!has(&state, PermissionKey::CanAccessCustomerArea));
        assert!(has(&state, PermissionKey::CanSwitchToVendorMode));
    }

    #[test]
    fn vendor_in_customer_mode_shops_like_a_customer() {
        let state = signed_in(Role::Vendor, Mode::Customer);

        assert!(!has(&state, PermissionKey::CanAccessVendorArea));
        assert!(has(&state, PermissionKey::CanAccessCustomerArea));
        // The switch stays available; mode does not revoke the grant.
        assert!(has(&state, PermissionKey::CanSwitchToVendorMode));
    }

    #[test]
    fn customer_never_reaches_the_vendor_area_even_in_vendor_mode() {
        let state = signed_in(Role::Customer, Mode::Vendor);

        assert!(!has(&state, PermissionKey::CanAccessVendorArea));
        assert!(!has(&state, PermissionKey::CanSwitchToVendorMode));
        // Mode flag still reports what was asked for, access does not follow.
        assert!(has(&state, PermissionKey::IsVendorMode));
        assert!(!has(&state, PermissionKey::CanAccessCustomerArea));
    }

    #[test]
    fn refreshing_is_not_authenticated() {
        let mut state = signed_in(Role::Vendor, Mode::Vendor);
        state.status = AuthStatus::Refreshing;

        assert!(!has(&state, PermissionKey::IsAuthenticated));
        assert!(!has(&state, PermissionKey::CanAccessVendorArea));
        // Capability grants survive the refresh window.
        assert!(has(&state, PermissionKey::CanSell));
    }

    #[test]
    fn onboarding_completion_tracks_the_snapshot_field() {
        let mut state = signed_in(Role::Vendor, Mode::Vendor);
        assert!(!has(&state, PermissionKey::VendorOnboardingCompleted));

        state.onboarding = OnboardingState::Completed;
        assert!(has(&state, PermissionKey::VendorOnboardingCompleted));
    }

    // ── property coverage ───────────────────────────────────────────────────

    fn arb_status() -> impl Strategy<Value = AuthStatus> {
        prop_oneof![
            Just(AuthStatus::Anonymous),
            Just(AuthStatus::Authenticating),
            Just(AuthStatus::Authenticated),
            Just(AuthStatus::Refreshing),
            Just(AuthStatus::Error),
        ]
    }

    fn arb_capabilities() -> impl Strategy<Value = CapabilitySet> {
        prop::collection::btree_set(
            prop_oneof![
                Just(Capability::CanBuy),
                Just(Capability::CanSell),
                Just(Capability::CanAdmin),
            ],
            0..=3,
        )
        .prop_map(|set| set.into_iter().collect())
    }

    fn arb_mode() -> impl Strategy<Value = Mode> {
        prop_oneof![Just(Mode::Customer), Just(Mode::Vendor)]
    }

    fn arb_onboarding() -> impl Strategy<Value = OnboardingState> {
        prop_oneof![
            Just(OnboardingState::NotStarted),
            Just(OnboardingState::InProgress),
            Just(OnboardingState::Completed),
            Just(OnboardingState::NotApplicable),
        ]
    }

    prop_compose! {
        fn arb_state()(
            status in arb_status(),
            capabilities in arb_capabilities(),
            active_mode in arb_mode(),
            onboarding in arb_onboarding(),
            version in 0u64..1_000,
        ) -> AuthorizationState {
            AuthorizationState {
                status,
                session: None,
                profile: None,
                capabilities,
                active_mode,
                onboarding,
                version,
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        #[test]
        fn vendor_area_needs_the_sell_grant(state in arb_state()) {
            if !state.capabilities.contains(Capability::CanSell) {
                prop_assert!(!has(&state, PermissionKey::CanAccessVendorArea));
                prop_assert!(!has(&state, PermissionKey::CanSwitchToVendorMode));
            }
        }

        #[test]
        fn areas_are_mutually_exclusive(state in arb_state()) {
            let vendor = has(&state, PermissionKey::CanAccessVendorArea);
            let customer = has(&state, PermissionKey::CanAccessCustomerArea);
            prop_assert!(!(vendor && customer));
        }

        #[test]
        fn only_authenticated_states_reach_any_area(state in arb_state()) {
            if state.status != AuthStatus::Authenticated {
                prop_assert!(!has(&state, PermissionKey::CanAccessVendorArea));
                prop_assert!(!has(&state, PermissionKey::CanAccessCustomerArea));
                prop_assert!(!has(&state, PermissionKey::CanSwitchToVendorMode));
            }
        }

        #[test]
        fn evaluate_agrees_with_single_key_checks(state in arb_state()) {
            let perms = evaluate(&state);
            for key in PermissionKey::ALL {
                prop_assert_eq!(perms.get(key), has(&state, key));
            }
        }
    }
}
