// Complaint lifecycle state machine.
//
// Statuses move forward along the six-stage track, or jump once into the
// terminal `rejected` side-state. Every accepted move is paired with a
// history row by the store; this module only decides what is legal.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplaintStatus {
    Pending,
    Verified,
    Assigned,
    InProgress,
    Resolved,
    Closed,
    Rejected,
}

impl ComplaintStatus {
    /// The six forward stages, in order. `Rejected` is not a stage.
    pub const STAGES: [ComplaintStatus; 6] = [
        ComplaintStatus::Pending,
        ComplaintStatus::Verified,
        ComplaintStatus::Assigned,
        ComplaintStatus::InProgress,
        ComplaintStatus::Resolved,
        ComplaintStatus::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Verified => "verified",
            Self::Assigned => "assigned",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
            Self::Rejected => "rejected",
        }
    }

    /// Position on the forward track; `None` for `rejected`.
    pub fn stage_index(&self) -> Option<usize> {
        Self::STAGES.iter().position(|s| s == self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Rejected)
    }

    /// Whether a move from `self` to `to` is legal: strictly forward on the
    /// stage track, or into `rejected` from any non-terminal status.
    /// Repeating the current status is not a transition (see
    /// [`plan_transition`]).
    pub fn can_transition(self, to: ComplaintStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        if to == ComplaintStatus::Rejected {
            return true;
        }
        match (self.stage_index(), to.stage_index()) {
            (Some(from_idx), Some(to_idx)) => to_idx > from_idx,
            _ => false,
        }
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ComplaintStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "verified" => Ok(Self::Verified),
            "assigned" => Ok(Self::Assigned),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "closed" => Ok(Self::Closed),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("unknown complaint status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

/// History row discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    Created,
    StatusChange,
    PriorityChange,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::StatusChange => "status_change",
            Self::PriorityChange => "priority_change",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "status_change" => Ok(Self::StatusChange),
            "priority_change" => Ok(Self::PriorityChange),
            _ => Err(format!("unknown change type: {s}")),
        }
    }
}

/// Outcome of planning a status change against the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    /// Requested status equals the current one. Accepted, but nothing is
    /// written and no history row is appended.
    NoOp,
    /// A legal move; the store applies it and records one history row.
    Apply {
        from: ComplaintStatus,
        to: ComplaintStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ComplaintStatus,
    pub to: ComplaintStatus,
}

/// Decide what a `set_status` call should do. Repeats are idempotent no-ops
/// so a retried request cannot double-append history.
pub fn plan_transition(
    current: ComplaintStatus,
    requested: ComplaintStatus,
) -> Result<TransitionPlan, InvalidTransition> {
    if current == requested {
        return Ok(TransitionPlan::NoOp);
    }
    if current.can_transition(requested) {
        Ok(TransitionPlan::Apply {
            from: current,
            to: requested,
        })
    } else {
        Err(InvalidTransition {
            from: current,
            to: requested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::ComplaintStatus::*;
    use std::str::FromStr;

    #[test]
    fn stage_order_is_monotonic() {
        for pair in ComplaintStatus::STAGES.windows(2) {
            assert!(pair[0].stage_index().unwrap() < pair[1].stage_index().unwrap());
        }
        assert_eq!(Rejected.stage_index(), None);
    }

    #[test]
    fn forward_moves_allowed_backward_denied() {
        assert!(Pending.can_transition(Verified));
        assert!(Pending.can_transition(Assigned)); // jumps forward are fine
        assert!(Verified.can_transition(Closed));
        assert!(!Verified.can_transition(Pending));
        assert!(!Resolved.can_transition(InProgress));
    }

    #[test]
    fn rejected_reachable_from_any_non_terminal() {
        for status in [Pending, Verified, Assigned, InProgress, Resolved] {
            assert!(status.can_transition(Rejected), "{status} -> rejected");
        }
    }

    #[test]
    fn terminal_states_absorb() {
        for to in [Pending, Verified, Assigned, InProgress, Resolved, Closed, Rejected] {
            assert!(!Closed.can_transition(to), "closed -> {to}");
            assert!(!Rejected.can_transition(to), "rejected -> {to}");
        }
    }

    #[test]
    fn no_transition_decreases_stage_index() {
        for from in ComplaintStatus::STAGES {
            for to in ComplaintStatus::STAGES {
                if from.can_transition(to) {
                    assert!(to.stage_index().unwrap() > from.stage_index().unwrap());
                }
            }
        }
    }

    #[test]
    fn repeat_is_a_noop_not_an_error() {
        assert_eq!(plan_transition(Assigned, Assigned).unwrap(), TransitionPlan::NoOp);
        // A no-op never appends history, so a retried set_status is safe.
        assert_eq!(plan_transition(Closed, Closed).unwrap(), TransitionPlan::NoOp);
    }

    #[test]
    fn plan_rejects_illegal_moves() {
        let err = plan_transition(Resolved, Pending).unwrap_err();
        assert_eq!(err.from, Resolved);
        assert_eq!(err.to, Pending);
        assert!(plan_transition(Pending, InProgress).is_ok());
    }

    #[test]
    fn status_serde_round_trip() {
        for status in [Pending, Verified, Assigned, InProgress, Resolved, Closed, Rejected] {
            assert_eq!(ComplaintStatus::from_str(status.as_str()).unwrap(), status);
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
        assert!(ComplaintStatus::from_str("reopened").is_err());
    }

    #[test]
    fn priority_and_change_type_round_trip() {
        for p in [Priority::Low, Priority::Medium, Priority::High] {
            assert_eq!(Priority::from_str(p.as_str()).unwrap(), p);
        }
        for c in [ChangeType::Created, ChangeType::StatusChange, ChangeType::PriorityChange] {
            assert_eq!(ChangeType::from_str(c.as_str()).unwrap(), c);
        }
    }
}
