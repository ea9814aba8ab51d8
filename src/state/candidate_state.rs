/// Candidate lifecycle definitions for tracking crawl progress
///
/// This module defines every state an artist can be in while it moves through the
/// frontier and the expansion loop.
use std::fmt;

/// Represents the current state of a crawl candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateState {
    // ===== Active States =====
    /// Waiting in the frontier
    Pending,

    /// Popped from the frontier and being checked by the admission gate
    Admitted,

    /// Set aside by the admission gate and re-scheduled with a lower priority
    Deferred,

    /// Following list is being fetched and confirmed
    Expanding,

    // ===== Terminal States =====
    /// Following list expanded and recorded in the graph
    Explored,

    /// Remote fetches failed permanently for this cycle
    Failed,
}

impl CandidateState {
    /// Returns true if the transition `self -> next` is allowed
    ///
    /// Failed candidates may go back to Pending when the failure policy
    /// re-schedules them. Explored is final.
    pub fn can_transition_to(&self, next: CandidateState) -> bool {
        use CandidateState::*;
        matches!(
            (self, next),
            (Pending, Admitted)
                | (Admitted, Deferred)
                | (Admitted, Expanding)
                | (Admitted, Failed)
                | (Deferred, Pending)
                | (Expanding, Explored)
                | (Expanding, Failed)
                | (Failed, Pending)
        )
    }

    /// Short lowercase label used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Admitted => "admitted",
            Self::Deferred => "deferred",
            Self::Expanding => "expanding",
            Self::Explored => "explored",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CandidateState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_can_be_rescheduled() {
        assert!(CandidateState::Failed.can_transition_to(CandidateState::Pending));
        assert!(!CandidateState::Failed.can_transition_to(CandidateState::Expanding));
        assert!(!CandidateState::Failed.can_transition_to(CandidateState::Explored));
    }

    #[test]
    fn test_main_path_transitions() {
        assert!(CandidateState::Pending.can_transition_to(CandidateState::Admitted));
        assert!(CandidateState::Admitted.can_transition_to(CandidateState::Expanding));
        assert!(CandidateState::Expanding.can_transition_to(CandidateState::Explored));
    }

    #[test]
    fn test_deferral_loop() {
        assert!(CandidateState::Admitted.can_transition_to(CandidateState::Deferred));
        assert!(CandidateState::Deferred.can_transition_to(CandidateState::Pending));
        assert!(!CandidateState::Deferred.can_transition_to(CandidateState::Expanding));
    }

    #[test]
    fn test_explored_is_final() {
        for next in [
            CandidateState::Pending,
            CandidateState::Admitted,
            CandidateState::Deferred,
            CandidateState::Expanding,
            CandidateState::Failed,
        ] {
            assert!(!CandidateState::Explored.can_transition_to(next));
        }
    }

    #[test]
    fn test_pending_cannot_skip_admission() {
        assert!(!CandidateState::Pending.can_transition_to(CandidateState::Expanding));
        assert!(!CandidateState::Pending.can_transition_to(CandidateState::Explored));
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", CandidateState::Pending), "pending");
        assert_eq!(format!("{}", CandidateState::Explored), "explored");
    }
}
