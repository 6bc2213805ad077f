//! Status lifecycle: which status changes are allowed and which need
//! confirmation.
//!
//! Progress is forward-only by [`Status::ordinal`]. A change to the same
//! status is a no-op, a change to a lower ordinal is rejected outright, and
//! anything else needs the operator to confirm before a request is made.
//! `PickedUp` and `Cancelled` share an ordinal, so moving between them in
//! either direction is allowed.

use crate::record::Status;

/// Outcome of checking a requested status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Requested status equals the current one; nothing to do.
    Unchanged,
    /// Allowed, pending operator confirmation.
    NeedsConfirmation { from: Status, to: Status },
    /// Not allowed. The displayed status stays at `from`.
    Rejected(TransitionError),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("cannot change status from \"{from}\" to \"{to}\": progress cannot go backwards")]
    Regression { from: Status, to: Status },
}

/// Decide what a request to move `current` to `requested` means.
pub fn check_transition(current: Status, requested: Status) -> Transition {
    if requested == current {
        return Transition::Unchanged;
    }
    if requested.ordinal() < current.ordinal() {
        return Transition::Rejected(TransitionError::Regression {
            from: current,
            to: requested,
        });
    }
    Transition::NeedsConfirmation {
        from: current,
        to: requested,
    }
}

/// The question put to the operator before an allowed change is applied.
pub fn confirmation_prompt(from: Status, to: Status) -> String {
    format!("Change status from \"{}\" to \"{}\"?", from, to)
}

/// Asks the operator to confirm a destructive or state-changing action.
///
/// Closures `FnMut(&str) -> bool` implement this, which is what tests use.
pub trait Confirm {
    fn confirm(&mut self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: FnMut(&str) -> bool,
{
    fn confirm(&mut self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// A `Confirm` that answers the same way every time.
#[derive(Debug, Clone, Copy)]
pub struct Always(pub bool);

impl Confirm for Always {
    fn confirm(&mut self, _prompt: &str) -> bool {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_status_is_noop() {
        for s in Status::ALL {
            assert_eq!(check_transition(s, s), Transition::Unchanged);
        }
    }

    #[test]
    fn every_regression_is_rejected() {
        for a in Status::ALL {
            for b in Status::ALL {
                if a != b && b.ordinal() < a.ordinal() {
                    assert_eq!(
                        check_transition(a, b),
                        Transition::Rejected(TransitionError::Regression { from: a, to: b }),
                        "{a} -> {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn every_non_decreasing_change_needs_confirmation() {
        for a in Status::ALL {
            for b in Status::ALL {
                if a != b && b.ordinal() >= a.ordinal() {
                    assert_eq!(
                        check_transition(a, b),
                        Transition::NeedsConfirmation { from: a, to: b },
                        "{a} -> {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn terminal_states_are_lateral() {
        assert!(matches!(
            check_transition(Status::PickedUp, Status::Cancelled),
            Transition::NeedsConfirmation { .. }
        ));
        assert!(matches!(
            check_transition(Status::Cancelled, Status::PickedUp),
            Transition::NeedsConfirmation { .. }
        ));
        assert!(matches!(
            check_transition(Status::Cancelled, Status::Done),
            Transition::Rejected(_)
        ));
    }

    #[test]
    fn regression_message_names_both_states() {
        let err = TransitionError::Regression {
            from: Status::Done,
            to: Status::Intake,
        };
        let msg = err.to_string();
        assert!(msg.contains("\"Done\""));
        assert!(msg.contains("\"Intake\""));
        assert!(msg.contains("backwards"));
    }

    #[test]
    fn closures_confirm() {
        let mut asked = Vec::new();
        let mut yes = |p: &str| {
            asked.push(p.to_string());
            true
        };
        assert!(yes.confirm(&confirmation_prompt(Status::Intake, Status::Done)));
        assert_eq!(asked, vec!["Change status from \"Intake\" to \"Done\"?"]);
        assert!(!Always(false).confirm("anything"));
    }
}
