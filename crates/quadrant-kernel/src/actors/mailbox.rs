//! Mailboxes: per-quadrant unbounded queues of pending placements.
//!
//! A turn creates one mailbox per quadrant plus a single cancellation signal
//! shared by all of them. Senders go into the [`MailboxRing`], which the
//! coordinator owns; each worker owns its own receiving [`Mailbox`].

use tokio::sync::{mpsc, watch};
use tracing::trace;

use crate::error::{FieldError, Result};
use crate::messages::{Delivery, PendingPlacement};
use crate::quadrant::QuadrantIndex;

/// Coordinator side of a turn's cancellation signal.
#[derive(Debug)]
pub struct TurnCancel {
    tx: watch::Sender<bool>,
}

impl TurnCancel {
    /// Wake every mailbox still parked in `receive()`.
    pub fn cancel(&self) {
        // send_replace never fails, even when every mailbox is already gone.
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Receiving end of a quadrant's mailbox, owned by its worker for one turn.
#[derive(Debug)]
pub struct Mailbox {
    quadrant: QuadrantIndex,
    rx: mpsc::UnboundedReceiver<PendingPlacement>,
    cancel: watch::Receiver<bool>,
}

impl Mailbox {
    pub fn quadrant(&self) -> QuadrantIndex {
        self.quadrant
    }

    /// Wait for the next placement or for the turn to be cancelled.
    ///
    /// Cancellation wins over queued messages: by the time the coordinator
    /// cancels, the barrier guarantees nothing is left to drain.
    pub async fn receive(&mut self) -> Delivery {
        if *self.cancel.borrow_and_update() {
            return Delivery::Cancelled;
        }

        tokio::select! {
            biased;
            // Err means the coordinator dropped the signal, which also ends the turn.
            _ = self.cancel.wait_for(|cancelled| *cancelled) => Delivery::Cancelled,
            message = self.rx.recv() => match message {
                Some(placement) => Delivery::Placement(placement),
                None => Delivery::Closed,
            },
        }
    }
}

/// Sending end of a quadrant's mailbox. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MailboxSender {
    quadrant: QuadrantIndex,
    tx: mpsc::UnboundedSender<PendingPlacement>,
}

impl MailboxSender {
    pub fn quadrant(&self) -> QuadrantIndex {
        self.quadrant
    }

    /// Enqueue a placement. Never blocks.
    pub fn send(&self, placement: PendingPlacement) -> Result<()> {
        trace!(
            to = self.quadrant,
            row = placement.row,
            column = placement.column,
            value = placement.value,
            "Placement sent"
        );
        self.tx
            .send(placement)
            .map_err(|_| FieldError::MailboxClosed {
                quadrant: self.quadrant,
            })
    }
}

/// The ring of mailbox senders for one turn.
///
/// Workers hold their own index and a shared handle to the ring; the ring
/// resolves neighbours so no worker ever references another worker.
#[derive(Debug)]
pub struct MailboxRing {
    senders: Vec<MailboxSender>,
}

impl MailboxRing {
    /// Create fresh, empty mailboxes for `quadrants` quadrants.
    ///
    /// Returns the ring, the receivers in ring order, and the turn's
    /// cancellation handle.
    pub fn open(quadrants: usize) -> (Self, Vec<Mailbox>, TurnCancel) {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (senders, mailboxes) = (0..quadrants)
            .map(|quadrant| {
                let (tx, rx) = mpsc::unbounded_channel();
                (
                    MailboxSender { quadrant, tx },
                    Mailbox {
                        quadrant,
                        rx,
                        cancel: cancel_rx.clone(),
                    },
                )
            })
            .unzip();
        (Self { senders }, mailboxes, TurnCancel { tx: cancel_tx })
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Index of the quadrant to the left of `index`, wrapping at zero.
    pub fn left_of(&self, index: QuadrantIndex) -> QuadrantIndex {
        (index + self.senders.len() - 1) % self.senders.len()
    }

    /// Sender for quadrant `index`.
    pub fn sender(&self, index: QuadrantIndex) -> Result<&MailboxSender> {
        self.senders.get(index).ok_or(FieldError::UnknownQuadrant {
            index,
            len: self.senders.len(),
        })
    }
}
