use thiserror::Error;

use tradepost_core::DomainError;

use crate::collaborator::CollaboratorError;

/// Why a transition was not applied.
///
/// Either the request broke a rule this service enforces, or an external
/// collaborator failed. In both cases the published state is left exactly as
/// it was.
#[derive(Debug, Error)]
pub enum TransitionError {
    #[error(transparent)]
    Policy(#[from] DomainError),

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl TransitionError {
    pub(crate) fn policy(message: impl Into<String>) -> Self {
        Self::Policy(DomainError::policy_violation(message))
    }

    /// True when the transition was refused by this service's own rules
    /// rather than by a collaborator.
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::Policy(_))
    }
}
