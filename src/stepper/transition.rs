//! Transition requests, outcomes, and the two-phase commit handle

use std::cell::Cell;
use std::fmt;
use std::rc::{Rc, Weak};

use super::Shared;
use crate::view::ViewElement;

/// A validated request to move the active marker between two steps.
///
/// Built fresh for every attempt that passes the bounds check.
#[derive(Debug, Clone)]
pub struct TransitionRequest<V> {
    pub from: usize,
    pub to: usize,
    pub from_step: V,
    pub to_step: V,
}

/// What happened to a call to [`super::StepController::transition_to_step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The gate committed before returning
    Committed,
    /// The gate kept the pending transition to commit later
    Deferred,
    /// The gate dropped or cancelled the pending transition
    Cancelled,
    /// `should_transition` vetoed the request
    Rejected,
    /// `to` was exactly one past the last step; the index was reconciled to
    /// the last step without touching markers
    Clamped { index: i64 },
    /// Out-of-range request absorbed without side effects
    Ignored,
    /// Refused because another transition is pending (exclusive policy only)
    Busy,
}

impl TransitionOutcome {
    /// Whether the active index moved as a result of this call
    pub fn is_committed(&self) -> bool {
        matches!(self, TransitionOutcome::Committed)
    }
}

impl fmt::Display for TransitionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionOutcome::Committed => write!(f, "committed"),
            TransitionOutcome::Deferred => write!(f, "deferred"),
            TransitionOutcome::Cancelled => write!(f, "cancelled"),
            TransitionOutcome::Rejected => write!(f, "rejected"),
            TransitionOutcome::Clamped { index } => write!(f, "clamped to {index}"),
            TransitionOutcome::Ignored => write!(f, "ignored"),
            TransitionOutcome::Busy => write!(f, "busy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum PendingStatus {
    Open,
    Committed,
    Cancelled,
}

/// A transition approved by `should_transition` and waiting for its commit.
///
/// Handed to the `before_transition` hook. Calling [`commit`](Self::commit),
/// immediately or at any later time, applies the marker change, updates the
/// current index and fires `after_transition`. Dropping it without committing
/// cancels the transition. A commit that outlives its controller does nothing.
pub struct PendingTransition<V: ViewElement> {
    controller: Weak<Shared<V>>,
    request: TransitionRequest<V>,
    event: V::Event,
    status: Rc<Cell<PendingStatus>>,
}

impl<V: ViewElement> PendingTransition<V> {
    pub(super) fn new(
        controller: Weak<Shared<V>>,
        request: TransitionRequest<V>,
        event: V::Event,
        status: Rc<Cell<PendingStatus>>,
    ) -> Self {
        Self {
            controller,
            request,
            event,
            status,
        }
    }

    pub fn request(&self) -> &TransitionRequest<V> {
        &self.request
    }

    pub fn event(&self) -> &V::Event {
        &self.event
    }

    /// Apply the transition
    pub fn commit(self) {
        self.settle(PendingStatus::Committed);
        if let Some(shared) = self.controller.upgrade() {
            shared.apply_commit(&self.request, &self.event);
        } else {
            tracing::debug!(
                from = self.request.from,
                to = self.request.to,
                "commit ignored: controller dropped"
            );
        }
    }

    /// Abandon the transition; equivalent to dropping it
    pub fn cancel(self) {
        drop(self);
    }

    fn settle(&self, status: PendingStatus) {
        if self.status.get() != PendingStatus::Open {
            return;
        }
        self.status.set(status);
        if let Some(shared) = self.controller.upgrade() {
            shared.release_in_flight();
        }
    }
}

impl<V: ViewElement> Drop for PendingTransition<V> {
    fn drop(&mut self) {
        if self.status.get() == PendingStatus::Open {
            tracing::debug!(
                from = self.request.from,
                to = self.request.to,
                "pending transition cancelled"
            );
            self.settle(PendingStatus::Cancelled);
        }
    }
}

impl<V: ViewElement + fmt::Debug> fmt::Debug for PendingTransition<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTransition")
            .field("request", &self.request)
            .field("status", &self.status.get())
            .finish_non_exhaustive()
    }
}
