//! Local rules: what a worker does to its own quadrant each turn.
//!
//! A rule may only change its own quadrant directly. Anything that crosses a
//! quadrant boundary goes through the [`Outbox`], which does the
//! increment-then-send accounting so the barrier stays correct no matter
//! which rule is plugged in.

use crate::actors::MailboxRing;
use crate::error::Result;
use crate::job_counter::JobCounter;
use crate::messages::PendingPlacement;
use crate::quadrant::{Quadrant, QuadrantIndex};

/// Outgoing side of a worker's local pass.
pub struct Outbox<'a> {
    origin: QuadrantIndex,
    ring: &'a MailboxRing,
    counter: &'a JobCounter,
    forwarded: usize,
}

impl<'a> Outbox<'a> {
    pub fn new(origin: QuadrantIndex, ring: &'a MailboxRing, counter: &'a JobCounter) -> Self {
        Self {
            origin,
            ring,
            counter,
            forwarded: 0,
        }
    }

    /// The quadrant this outbox belongs to.
    pub fn origin(&self) -> QuadrantIndex {
        self.origin
    }

    /// The quadrant to the left of the origin (periodic boundary).
    pub fn left_neighbor(&self) -> QuadrantIndex {
        self.ring.left_of(self.origin)
    }

    /// Hand a placement to quadrant `to`.
    ///
    /// The job count goes up before the message becomes visible, so the
    /// coordinator can never see zero while it is in flight.
    pub fn forward(&mut self, to: QuadrantIndex, placement: PendingPlacement) -> Result<()> {
        let sender = self.ring.sender(to)?;
        self.counter.increment();
        sender.send(placement)?;
        self.forwarded += 1;
        Ok(())
    }

    /// Hand a placement to the left neighbour.
    pub fn forward_left(&mut self, placement: PendingPlacement) -> Result<()> {
        self.forward(self.left_neighbor(), placement)
    }

    /// Placements forwarded so far.
    pub fn forwarded(&self) -> usize {
        self.forwarded
    }
}

/// A per-quadrant movement rule.
pub trait LocalRule: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Visit every cell of `quadrant` once, forwarding boundary crossings.
    fn apply(&self, quadrant: &mut Quadrant, outbox: &mut Outbox<'_>) -> Result<()>;
}

/// Every marker moves one column left per turn.
///
/// Markers leaving column 0 land in the rightmost column of the left
/// neighbour, same row, same value. Moves overwrite their destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriftLeft;

impl LocalRule for DriftLeft {
    fn name(&self) -> &str {
        "drift_left"
    }

    fn apply(&self, quadrant: &mut Quadrant, outbox: &mut Outbox<'_>) -> Result<()> {
        let width = quadrant.width();
        // Columns ascending: a marker moved into column c-1 is never visited again.
        for column in 0..width {
            for row in 0..quadrant.height() {
                let value = quadrant.take(row, column)?;
                if value == 0 {
                    continue;
                }
                if column > 0 {
                    quadrant.set(row, column - 1, value)?;
                } else {
                    outbox.forward_left(PendingPlacement::new(row, width - 1, value))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::Delivery;

    #[tokio::test]
    async fn test_drift_left_moves_and_forwards() {
        let (ring, mut mailboxes, _cancel) = MailboxRing::open(3);
        let counter = JobCounter::new();
        counter.reset(3);

        let mut quadrant = Quadrant::new(1, 3, 2);
        quadrant.set(0, 0, 2).unwrap();
        quadrant.set(0, 1, 5).unwrap();
        quadrant.set(1, 2, 1).unwrap();

        let mut outbox = Outbox::new(1, &ring, &counter);
        DriftLeft.apply(&mut quadrant, &mut outbox).unwrap();

        assert_eq!(outbox.forwarded(), 1);
        assert_eq!(counter.value(), 4);
        assert_eq!(quadrant.read_grid(), vec![vec![5, 0, 0], vec![0, 1, 0]]);
        assert_eq!(
            mailboxes[0].receive().await,
            Delivery::Placement(PendingPlacement::new(0, 2, 2))
        );
    }

    #[test]
    fn test_outbox_wraps_from_first_quadrant() {
        let (ring, _mailboxes, _cancel) = MailboxRing::open(4);
        let counter = JobCounter::new();
        let outbox = Outbox::new(0, &ring, &counter);
        assert_eq!(outbox.left_neighbor(), 3);
    }
}
