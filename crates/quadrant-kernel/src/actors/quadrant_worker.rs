//! QuadrantWorker: owner of one quadrant for the length of a single turn.
//!
//! Each turn a fresh worker is built over persistent handles (the quadrant's
//! cells, the shared ring, the shared counter) plus a fresh mailbox:
//!
//! ```text
//! Spawned
//!   └─ RunningLocalRule       visit every cell once, forward boundary crossings
//!       └─ DecrementedAfterLocal   one decrement for the whole pass
//!           └─ DrainingMailbox     apply each placement, one decrement each
//!               └─ Terminated      coordinator cancelled the turn
//! ```
//!
//! A worker never leaves `DrainingMailbox` on its own. An empty queue only
//! means a slower neighbour has not finished its pass yet.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::actors::mailbox::{Mailbox, MailboxRing};
use crate::error::{FieldError, Result};
use crate::job_counter::JobCounter;
use crate::messages::Delivery;
use crate::quadrant::{Quadrant, QuadrantIndex};
use crate::rule::{LocalRule, Outbox};

/// Lifecycle of a worker within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Spawned,
    RunningLocalRule,
    DecrementedAfterLocal,
    DrainingMailbox,
    Terminated,
}

/// What one worker did during its turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Quadrant the worker owned
    pub quadrant: QuadrantIndex,
    /// Placements sent to the left neighbour
    pub forwarded: usize,
    /// Placements received and written into the quadrant
    pub applied: usize,
}

/// A cancelled worker hands its quadrant back together with its report.
#[derive(Debug)]
pub struct WorkerOutcome {
    pub quadrant: Quadrant,
    pub report: WorkerReport,
}

/// Ephemeral per-turn worker.
pub struct QuadrantWorker {
    turn: usize,
    quadrant: Quadrant,
    mailbox: Mailbox,
    ring: Arc<MailboxRing>,
    counter: Arc<JobCounter>,
    rule: Arc<dyn LocalRule>,
    state: WorkerState,
}

impl std::fmt::Debug for QuadrantWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuadrantWorker")
            .field("turn", &self.turn)
            .field("quadrant", &self.quadrant.index())
            .field("rule", &self.rule.name())
            .field("state", &self.state)
            .finish()
    }
}

impl QuadrantWorker {
    /// Bind a new worker to existing quadrant data and this turn's mailbox.
    pub fn new(
        turn: usize,
        quadrant: Quadrant,
        mailbox: Mailbox,
        ring: Arc<MailboxRing>,
        counter: Arc<JobCounter>,
        rule: Arc<dyn LocalRule>,
    ) -> Self {
        debug_assert_eq!(quadrant.index(), mailbox.quadrant());
        Self {
            turn,
            quadrant,
            mailbox,
            ring,
            counter,
            rule,
            state: WorkerState::Spawned,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    fn transition(&mut self, next: WorkerState) {
        trace!(
            turn = self.turn,
            quadrant = self.quadrant.index(),
            from = ?self.state,
            to = ?next,
            "Worker state change"
        );
        self.state = next;
    }

    /// Run the local pass, then drain the mailbox until cancelled.
    ///
    /// Any error is fatal to the whole run; the coordinator sees it when
    /// the task ends early.
    pub async fn run(mut self) -> Result<WorkerOutcome> {
        let index = self.quadrant.index();
        let mut report = WorkerReport {
            quadrant: index,
            ..Default::default()
        };

        self.transition(WorkerState::RunningLocalRule);
        {
            let mut outbox = Outbox::new(index, &self.ring, &self.counter);
            self.rule.apply(&mut self.quadrant, &mut outbox)?;
            report.forwarded = outbox.forwarded();
        }

        self.counter.decrement();
        self.transition(WorkerState::DecrementedAfterLocal);

        self.transition(WorkerState::DrainingMailbox);
        loop {
            match self.mailbox.receive().await {
                Delivery::Placement(placement) => {
                    self.quadrant
                        .set(placement.row, placement.column, placement.value)?;
                    self.counter.decrement();
                    report.applied += 1;
                }
                Delivery::Cancelled => break,
                Delivery::Closed => return Err(FieldError::MailboxClosed { quadrant: index }),
            }
        }

        self.transition(WorkerState::Terminated);
        debug!(
            turn = self.turn,
            quadrant = index,
            forwarded = report.forwarded,
            applied = report.applied,
            "Worker terminated"
        );

        Ok(WorkerOutcome {
            quadrant: self.quadrant,
            report,
        })
    }
}
