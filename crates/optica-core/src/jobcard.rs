//! # Job Card State Machine
//!
//! Models the lab fulfillment lifecycle of an invoice's optical work order.
//!
//! ## Transition Table
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                                                                     │
//! │   pending ──► in_progress ──► quality_check ──► completed           │
//! │      │             │               │                                │
//! │      └─────────────┴───────────────┴──────────► cancelled           │
//! │                                                                     │
//! │  Strictly forward along the happy path. The UI exposes exactly one  │
//! │  legal "next" action per state (pending offers only "start", and    │
//! │  so on); everything else is rejected server-side too, never hidden  │
//! │  client-side only.                                                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Timestamps
//! - `started_at` is set exactly once, on pending → in_progress
//! - `completed_at` is set exactly once, on the transition into completed
//! - Terminal cards (completed, cancelled) reject every transition

use chrono::{DateTime, Utc};

use crate::error::{CoreError, CoreResult};
use crate::types::{JobCard, JobStatus};

/// The explicit transition table, keyed by current state.
///
/// This is the single source of truth for legal moves; both the UI's
/// "next action" button and the server-side guard read it.
pub const fn allowed_next(from: JobStatus) -> &'static [JobStatus] {
    match from {
        JobStatus::Pending => &[JobStatus::InProgress, JobStatus::Cancelled],
        JobStatus::InProgress => &[JobStatus::QualityCheck, JobStatus::Cancelled],
        JobStatus::QualityCheck => &[JobStatus::Completed, JobStatus::Cancelled],
        JobStatus::Completed | JobStatus::Cancelled => &[],
    }
}

/// The single happy-path action for the current state, if any.
///
/// `None` for terminal states. Cancellation is always available on
/// non-terminal states but is never the "next" action.
pub const fn next_action(from: JobStatus) -> Option<JobStatus> {
    match from {
        JobStatus::Pending => Some(JobStatus::InProgress),
        JobStatus::InProgress => Some(JobStatus::QualityCheck),
        JobStatus::QualityCheck => Some(JobStatus::Completed),
        JobStatus::Completed | JobStatus::Cancelled => None,
    }
}

/// Checks whether `from → to` is a legal transition.
pub fn is_legal(from: JobStatus, to: JobStatus) -> bool {
    allowed_next(from).contains(&to)
}

impl JobCard {
    /// Applies a status transition.
    ///
    /// Any request for a state that is not currently legal fails with
    /// [`CoreError::IllegalTransition`] and leaves the card untouched -
    /// re-entering a state and transitioning a terminal card included.
    pub fn transition_to(&mut self, target: JobStatus, now: DateTime<Utc>) -> CoreResult<()> {
        if !is_legal(self.status, target) {
            return Err(CoreError::IllegalTransition {
                job_id: self.id.clone(),
                from: self.status,
                to: target,
            });
        }

        match target {
            JobStatus::InProgress => {
                // Only reachable from Pending, so this sets started_at
                // exactly once
                self.started_at = Some(now);
            }
            JobStatus::Completed => {
                self.completed_at = Some(now);
            }
            _ => {}
        }

        self.status = target;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(status: JobStatus) -> JobCard {
        JobCard {
            id: "job-1".to_string(),
            invoice_id: "inv-1".to_string(),
            job_number: "JOB-20260829-0001".to_string(),
            status,
            prescription_details: Some("OD -1.25 / OS -1.50".to_string()),
            frame_details: None,
            lens_details: None,
            special_instructions: None,
            started_at: None,
            completed_at: None,
            created_at: Utc::now(),
        }
    }

    const ALL: [JobStatus; 5] = [
        JobStatus::Pending,
        JobStatus::InProgress,
        JobStatus::QualityCheck,
        JobStatus::Completed,
        JobStatus::Cancelled,
    ];

    #[test]
    fn test_happy_path() {
        let mut job = card(JobStatus::Pending);
        let now = Utc::now();

        job.transition_to(JobStatus::InProgress, now).unwrap();
        assert_eq!(job.status, JobStatus::InProgress);
        assert_eq!(job.started_at, Some(now));
        assert_eq!(job.completed_at, None);

        job.transition_to(JobStatus::QualityCheck, now).unwrap();
        job.transition_to(JobStatus::Completed, now).unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.completed_at, Some(now));
    }

    /// Scenario: card in quality_check; "in_progress" rejected,
    /// "completed" accepted with completed_at set.
    #[test]
    fn test_no_backwards_transition() {
        let mut job = card(JobStatus::QualityCheck);

        let err = job
            .transition_to(JobStatus::InProgress, Utc::now())
            .unwrap_err();
        assert!(matches!(err, CoreError::IllegalTransition { .. }));
        assert_eq!(job.status, JobStatus::QualityCheck);

        let now = Utc::now();
        job.transition_to(JobStatus::Completed, now).unwrap();
        assert_eq!(job.completed_at, Some(now));
    }

    #[test]
    fn test_cancel_from_any_non_terminal_state() {
        for status in [
            JobStatus::Pending,
            JobStatus::InProgress,
            JobStatus::QualityCheck,
        ] {
            let mut job = card(status);
            job.transition_to(JobStatus::Cancelled, Utc::now()).unwrap();
            assert_eq!(job.status, JobStatus::Cancelled);
        }
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for terminal in [JobStatus::Completed, JobStatus::Cancelled] {
            for target in ALL {
                let mut job = card(terminal);
                assert!(
                    job.transition_to(target, Utc::now()).is_err(),
                    "{terminal:?} -> {target:?} should be rejected"
                );
            }
        }
    }

    #[test]
    fn test_re_entering_current_state_is_rejected() {
        for status in ALL {
            let mut job = card(status);
            assert!(job.transition_to(status, Utc::now()).is_err());
        }
    }

    /// Exhaustive check of the transition table against the six legal edges.
    #[test]
    fn test_transition_table_is_exact() {
        use JobStatus::*;
        let legal = [
            (Pending, InProgress),
            (Pending, Cancelled),
            (InProgress, QualityCheck),
            (InProgress, Cancelled),
            (QualityCheck, Completed),
            (QualityCheck, Cancelled),
        ];

        for from in ALL {
            for to in ALL {
                let expected = legal.contains(&(from, to));
                assert_eq!(
                    is_legal(from, to),
                    expected,
                    "table mismatch for {from:?} -> {to:?}"
                );
            }
        }
    }

    #[test]
    fn test_next_action_single_button() {
        assert_eq!(next_action(JobStatus::Pending), Some(JobStatus::InProgress));
        assert_eq!(
            next_action(JobStatus::InProgress),
            Some(JobStatus::QualityCheck)
        );
        assert_eq!(
            next_action(JobStatus::QualityCheck),
            Some(JobStatus::Completed)
        );
        assert_eq!(next_action(JobStatus::Completed), None);
        assert_eq!(next_action(JobStatus::Cancelled), None);
    }

    #[test]
    fn test_started_at_set_exactly_once() {
        let mut job = card(JobStatus::Pending);
        let t1 = Utc::now();
        job.transition_to(JobStatus::InProgress, t1).unwrap();

        // No legal path ever re-enters in_progress, so started_at can
        // never be overwritten
        job.transition_to(JobStatus::QualityCheck, Utc::now()).unwrap();
        assert!(job.transition_to(JobStatus::InProgress, Utc::now()).is_err());
        assert_eq!(job.started_at, Some(t1));
    }
}
