//! Session state model: who is signed in, what they may do, and which
//! operating mode the storefront is running in.
//!
//! [`AuthorizationState`] is an immutable snapshot. Nothing in this crate
//! mutates one; the transition service in `tradepost-session` builds a fresh
//! snapshot for every accepted transition and replaces the old one wholesale.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::UserId;

// ─────────────────────────────────────────────────────────────────────────────
// Authentication lifecycle
// ─────────────────────────────────────────────────────────────────────────────

/// Authentication lifecycle status of the session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthStatus {
    /// Nobody signed in. The start state, and the state after logout.
    #[default]
    Anonymous,
    /// A sign-in flow is in flight.
    Authenticating,
    /// A verified session exists.
    Authenticated,
    /// Token refresh is in flight; the old session is still usable.
    Refreshing,
    /// The last transition attempt failed terminally.
    Error,
}

/// Declared account role. Capability grants are derived from it once at
/// login; permission checks never read the role directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Customer,
    Vendor,
    Admin,
}

// ─────────────────────────────────────────────────────────────────────────────
// Capabilities
// ─────────────────────────────────────────────────────────────────────────────

/// A granted permission token.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    CanBuy,
    CanSell,
    CanAdmin,
}

/// The set of capability grants held by a session.
///
/// Set semantics keep grants idempotent: upgrading an account that already
/// sells cannot produce a duplicate entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    /// No grants at all; what an anonymous session holds.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Derive the grants for a declared role.
    ///
    /// Admin implies both marketplace sides, vendor implies buying; every
    /// signed-in account can buy.
    pub fn from_role(role: Role) -> Self {
        let granted: &[Capability] = match role {
            Role::Admin => &[Capability::CanAdmin, Capability::CanSell, Capability::CanBuy],
            Role::Vendor => &[Capability::CanSell, Capability::CanBuy],
            Role::Customer => &[Capability::CanBuy],
        };
        granted.iter().copied().collect()
    }

    pub fn contains(&self, capability: Capability) -> bool {
        self.0.contains(&capability)
    }

    pub fn grant(&mut self, capability: Capability) {
        self.0.insert(capability);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operating mode
// ─────────────────────────────────────────────────────────────────────────────

/// Operating mode currently in effect for routing and presentation.
///
/// Exactly one mode is active at a time. Mode is presentation-side state;
/// holding [`Capability::CanSell`] is what actually opens the vendor area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Customer,
    Vendor,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Customer => "customer",
            Mode::Vendor => "vendor",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Vendor onboarding
// ─────────────────────────────────────────────────────────────────────────────

/// Vendor onboarding progress.
///
/// `NotApplicable` only ever appears on the session snapshot (for accounts
/// that cannot sell); a stored profile tracks the other three values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingState {
    NotStarted,
    InProgress,
    Completed,
    NotApplicable,
}

/// Stage of the vendor registration wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    Account,
    VerificationPayment,
    Listing,
    SellerHub,
}

impl OnboardingStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            OnboardingStep::Account => "account",
            OnboardingStep::VerificationPayment => "verification_payment",
            OnboardingStep::Listing => "listing",
            OnboardingStep::SellerHub => "seller_hub",
        }
    }
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session and profile
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque token bundle returned by the credential provider.
///
/// The transition service owns it; permission evaluation and route
/// authorization never look inside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

/// Account profile as persisted by the profile store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: UserId,
    pub display_name: String,
    /// Phone number or email address the account signs in with.
    pub contact: String,
    pub role: Role,
    /// Mode the user last explicitly selected, persisted across sessions.
    /// `None` means the user never switched and defaults to customer.
    pub active_role: Option<Mode>,
    pub vendor_onboarding_status: OnboardingState,
    /// Wizard stage the user last saved, if onboarding has begun.
    pub vendor_onboarding_step: Option<OnboardingStep>,
}

// ─────────────────────────────────────────────────────────────────────────────
// The snapshot
// ─────────────────────────────────────────────────────────────────────────────

/// Everything the authorization core knows about the current session.
///
/// Snapshots are immutable and internally consistent: capabilities, mode and
/// onboarding were all derived from the same profile at transition time, so
/// readers never observe a half-applied login or logout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationState {
    pub status: AuthStatus,
    pub session: Option<Session>,
    pub profile: Option<Profile>,
    pub capabilities: CapabilitySet,
    pub active_mode: Mode,
    pub onboarding: OnboardingState,
    /// Transition counter, bumped on every accepted transition and never
    /// reset. Lets a holder of a stale snapshot detect supersession.
    pub version: u64,
}

impl AuthorizationState {
    /// The application-start state: nobody signed in, customer mode.
    pub fn anonymous() -> Self {
        Self {
            status: AuthStatus::Anonymous,
            session: None,
            profile: None,
            capabilities: CapabilitySet::empty(),
            active_mode: Mode::Customer,
            onboarding: OnboardingState::NotApplicable,
            version: 0,
        }
    }
}
