use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::RegistrationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationAction {
    Submit,
    Approve,
    Reject,
    Resubmit,
    /// Billing: an invoice went overdue.
    MarkOverdue,
    /// Billing: a qualifying payment arrived.
    Unblock,
}

impl RegistrationAction {
    pub const ALL: [RegistrationAction; 6] = [
        RegistrationAction::Submit,
        RegistrationAction::Approve,
        RegistrationAction::Reject,
        RegistrationAction::Resubmit,
        RegistrationAction::MarkOverdue,
        RegistrationAction::Unblock,
    ];
}

impl fmt::Display for RegistrationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RegistrationAction::Submit => "submit",
            RegistrationAction::Approve => "approve",
            RegistrationAction::Reject => "reject",
            RegistrationAction::Resubmit => "resubmit",
            RegistrationAction::MarkOverdue => "mark_overdue",
            RegistrationAction::Unblock => "unblock",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[error("cannot {action} a registration in {current} state")]
pub struct InvalidTransition {
    pub action: RegistrationAction,
    pub current: RegistrationStatus,
}

/// The registration state machine.
///
/// | from      | action       | to        |
/// |-----------|--------------|-----------|
/// | DRAFT     | submit       | SUBMITTED |
/// | SUBMITTED | approve      | APPROVED  |
/// | SUBMITTED | reject       | REVISION  |
/// | REVISION  | resubmit     | SUBMITTED |
/// | any       | mark_overdue | BLOCKED   |
/// | BLOCKED   | unblock      | DRAFT     |
///
/// Every other pair is rejected.
pub fn transition(
    current: RegistrationStatus,
    action: RegistrationAction,
) -> Result<RegistrationStatus, InvalidTransition> {
    use RegistrationAction as A;
    use RegistrationStatus as S;

    match (current, action) {
        (S::Draft, A::Submit) => Ok(S::Submitted),
        (S::Submitted, A::Approve) => Ok(S::Approved),
        (S::Submitted, A::Reject) => Ok(S::Revision),
        (S::Revision, A::Resubmit) => Ok(S::Submitted),
        (_, A::MarkOverdue) => Ok(S::Blocked),
        (S::Blocked, A::Unblock) => Ok(S::Draft),
        _ => Err(InvalidTransition { action, current }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RegistrationAction as A;
    use RegistrationStatus as S;

    #[test]
    fn happy_path() {
        let s = transition(S::Draft, A::Submit).unwrap();
        assert_eq!(s, S::Submitted);
        assert_eq!(transition(s, A::Approve).unwrap(), S::Approved);
    }

    #[test]
    fn revision_loop() {
        let s = transition(S::Submitted, A::Reject).unwrap();
        assert_eq!(s, S::Revision);
        assert_eq!(transition(s, A::Resubmit).unwrap(), S::Submitted);
    }

    #[test]
    fn billing_side_channel() {
        for status in S::ALL {
            assert_eq!(transition(status, A::MarkOverdue).unwrap(), S::Blocked);
        }
        assert_eq!(transition(S::Blocked, A::Unblock).unwrap(), S::Draft);
    }

    #[test]
    fn table_is_closed() {
        let legal = [
            (S::Draft, A::Submit),
            (S::Submitted, A::Approve),
            (S::Submitted, A::Reject),
            (S::Revision, A::Resubmit),
            (S::Blocked, A::Unblock),
        ];
        for status in S::ALL {
            for action in A::ALL {
                if action == A::MarkOverdue || legal.contains(&(status, action)) {
                    continue;
                }
                let err = transition(status, action).unwrap_err();
                assert_eq!(err.current, status);
                assert_eq!(err.action, action);
            }
        }
    }

    #[test]
    fn error_names_action_and_state() {
        let err = transition(S::Approved, A::Reject).unwrap_err();
        assert_eq!(err.to_string(), "cannot reject a registration in APPROVED state");
    }
}
