//! Lot status transition tables
//!
//! Two channels move a lot forward:
//! - the administrative channel (`update_status`) covers routine progress
//!   and may only step `PLANNING → IN_PROGRESS → SUBMITTED`;
//! - the approval channel (`approve`, `reject`, `publish`) is the only way
//!   out of `SUBMITTED`, and the only way into `APPROVED` or `PUBLISHED`.

use ilm_model::{LotError, LotStatus, RejectLevel};

/// Validate an administrative status change
///
/// # Errors
/// Returns [`LotError::InvalidTransition`] for anything outside the table,
/// including self-transitions
pub fn validate_admin_transition(from: LotStatus, to: LotStatus) -> Result<(), LotError> {
    if allowed_admin_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(LotError::InvalidTransition { from, to })
    }
}

/// Targets reachable from `from` through the administrative channel
#[must_use]
pub fn allowed_admin_transitions(from: LotStatus) -> Vec<LotStatus> {
    use LotStatus::*;
    match from {
        Planning => vec![InProgress],
        InProgress => vec![Submitted],
        Submitted | Approved | Published => vec![],
    }
}

/// Validate that an approval decision may be taken
///
/// # Errors
/// Returns [`LotError::InvalidTransition`] unless the lot is `SUBMITTED`
pub fn validate_approval(from: LotStatus) -> Result<(), LotError> {
    require(from, LotStatus::Submitted, LotStatus::Approved)
}

/// Validate that a rejection may be taken
///
/// # Errors
/// Returns [`LotError::InvalidTransition`] unless the lot is `SUBMITTED`
pub fn validate_rejection(from: LotStatus, level: RejectLevel) -> Result<(), LotError> {
    require(from, LotStatus::Submitted, level.into())
}

/// Validate a release step
///
/// # Errors
/// Returns [`LotError::InvalidTransition`] unless the lot is `APPROVED`
pub fn validate_publish(from: LotStatus) -> Result<(), LotError> {
    require(from, LotStatus::Approved, LotStatus::Published)
}

fn require(from: LotStatus, expected: LotStatus, to: LotStatus) -> Result<(), LotError> {
    if from == expected {
        Ok(())
    } else {
        Err(LotError::InvalidTransition { from, to })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use LotStatus::*;

    #[test]
    fn forward_steps_only() {
        assert!(validate_admin_transition(Planning, InProgress).is_ok());
        assert!(validate_admin_transition(InProgress, Submitted).is_ok());

        assert!(validate_admin_transition(Planning, Submitted).is_err());
        assert!(validate_admin_transition(InProgress, Planning).is_err());
        assert!(validate_admin_transition(Submitted, Approved).is_err());
        assert!(validate_admin_transition(Approved, Published).is_err());
    }

    #[test]
    fn self_transition_is_invalid() {
        for status in LotStatus::ALL {
            assert!(validate_admin_transition(status, status).is_err());
        }
    }

    #[test]
    fn approval_requires_submitted() {
        assert!(validate_approval(Submitted).is_ok());
        let err = validate_approval(InProgress).unwrap_err();
        assert!(matches!(
            err,
            LotError::InvalidTransition { from: InProgress, to: Approved }
        ));
    }

    #[test]
    fn rejection_reports_target_level() {
        let err = validate_rejection(Approved, RejectLevel::Planning).unwrap_err();
        assert!(matches!(
            err,
            LotError::InvalidTransition { from: Approved, to: Planning }
        ));
    }

    #[test]
    fn publish_requires_approved() {
        assert!(validate_publish(Approved).is_ok());
        assert!(validate_publish(Submitted).is_err());
    }
}
