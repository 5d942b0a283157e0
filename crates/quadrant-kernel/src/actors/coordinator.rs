//! Coordinator: drives the turn loop over the ring of quadrants.
//!
//! Each turn:
//! 1. Reset the job counter to the number of quadrants
//! 2. Open fresh mailboxes and spawn one worker per quadrant
//! 3. Wait for the counter to reach zero
//! 4. Cancel every worker and take the quadrants back
//!
//! The coordinator never touches cells while a turn is running. Quadrants
//! are moved into the workers and come back when the workers are cancelled.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use tokio::task::{Id, JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::actors::mailbox::MailboxRing;
use crate::actors::quadrant_worker::{QuadrantWorker, WorkerOutcome};
use crate::config::FieldConfig;
use crate::error::{FieldError, Result};
use crate::field::FieldSnapshot;
use crate::job_counter::JobCounter;
use crate::kernel::{RunReport, TurnReport};
use crate::messages::Cell;
use crate::quadrant::{Grid, Quadrant, QuadrantIndex};
use crate::rule::{DriftLeft, LocalRule};

type WorkerSet = JoinSet<Result<WorkerOutcome>>;

/// Owner of the persistent field state and the per-turn worker pool.
pub struct Coordinator {
    quadrants: Vec<Quadrant>,
    width: usize,
    height: usize,
    counter: Arc<JobCounter>,
    rule: Arc<dyn LocalRule>,
    turns_completed: usize,
    /// Turn during which a run aborted; the quadrants are gone after that.
    aborted_at: Option<usize>,
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("quadrants", &self.quadrants.len())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rule", &self.rule.name())
            .field("turns_completed", &self.turns_completed)
            .field("aborted_at", &self.aborted_at)
            .finish()
    }
}

impl Coordinator {
    /// Create an empty field with the drift-left rule.
    pub fn new(config: &FieldConfig) -> Result<Self> {
        Self::with_rule(config, Arc::new(DriftLeft))
    }

    /// Create an empty field with a custom local rule.
    pub fn with_rule(config: &FieldConfig, rule: Arc<dyn LocalRule>) -> Result<Self> {
        config.validate()?;
        let quadrants = (0..config.quadrants)
            .map(|index| Quadrant::new(index, config.width, config.height))
            .collect();
        Ok(Self {
            quadrants,
            width: config.width,
            height: config.height,
            counter: Arc::new(JobCounter::new()),
            rule,
            turns_completed: 0,
            aborted_at: None,
        })
    }

    fn ensure_ready(&self) -> Result<()> {
        match self.aborted_at {
            Some(turn) => Err(FieldError::Aborted { turn }),
            None => Ok(()),
        }
    }

    pub fn quadrant_count(&self) -> usize {
        self.quadrants.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Turns completed since construction.
    pub fn turns_completed(&self) -> usize {
        self.turns_completed
    }

    /// The shared job counter (read-only use outside the kernel).
    pub fn counter(&self) -> &JobCounter {
        &self.counter
    }

    pub fn quadrant(&self, index: QuadrantIndex) -> Result<&Quadrant> {
        self.ensure_ready()?;
        let len = self.quadrants.len();
        self.quadrants
            .get(index)
            .ok_or(FieldError::UnknownQuadrant { index, len })
    }

    fn quadrant_mut(&mut self, index: QuadrantIndex) -> Result<&mut Quadrant> {
        self.ensure_ready()?;
        let len = self.quadrants.len();
        self.quadrants
            .get_mut(index)
            .ok_or(FieldError::UnknownQuadrant { index, len })
    }

    /// Snapshot of one quadrant's cells.
    pub fn read_grid(&self, index: QuadrantIndex) -> Result<Grid> {
        Ok(self.quadrant(index)?.read_grid())
    }

    /// Replace one quadrant's cells between turns.
    pub fn write_grid(&mut self, index: QuadrantIndex, grid: &[Vec<Cell>]) -> Result<()> {
        self.quadrant_mut(index)?.write_grid(grid)
    }

    /// Put a single marker (or clear a cell with 0) between turns.
    pub fn place(
        &mut self,
        index: QuadrantIndex,
        row: usize,
        column: usize,
        value: Cell,
    ) -> Result<()> {
        self.quadrant_mut(index)?.set(row, column, value)
    }

    /// Seed `count` random markers into every quadrant. Returns the total placed.
    pub fn seed_random(&mut self, count: usize, rng: &mut impl Rng) -> Result<usize> {
        self.ensure_ready()?;
        Ok(self
            .quadrants
            .iter_mut()
            .map(|quadrant| quadrant.seed_random(count, &mut *rng))
            .sum())
    }

    /// Deep copy of the whole field.
    pub fn snapshot(&self) -> Result<FieldSnapshot> {
        self.ensure_ready()?;
        Ok(FieldSnapshot::new(
            self.quadrants.iter().map(Quadrant::read_grid).collect(),
        ))
    }

    /// Run exactly `count` turns, one after another.
    ///
    /// Returns after the last turn completes. Any fatal error aborts the run
    /// and leaves the coordinator unusable.
    pub async fn run_turns(&mut self, count: usize) -> Result<RunReport> {
        self.ensure_ready()?;
        if count == 0 {
            return Err(FieldError::InvalidConfig {
                field: "turns",
                value: 0,
            });
        }
        let started = Instant::now();
        let mut report = RunReport::default();

        info!(
            turns = count,
            quadrants = self.quadrants.len(),
            width = self.width,
            height = self.height,
            rule = self.rule.name(),
            "Starting run"
        );

        for _ in 0..count {
            let turn = self.turns_completed;
            match self.run_turn(turn).await {
                Ok(turn_report) => {
                    self.turns_completed += 1;
                    report.record(turn_report);
                }
                Err(e) => {
                    error!(turn, error = %e, "Run aborted");
                    self.aborted_at = Some(turn);
                    return Err(e);
                }
            }
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(
            turns = report.turns,
            forwarded = report.forwarded,
            applied = report.applied,
            elapsed_ms = report.elapsed_ms,
            "Run complete"
        );
        Ok(report)
    }

    async fn run_turn(&mut self, turn: usize) -> Result<TurnReport> {
        let quadrants = std::mem::take(&mut self.quadrants);
        let (ring, mailboxes, cancel) = MailboxRing::open(quadrants.len());
        let ring = Arc::new(ring);

        self.counter.reset(quadrants.len());

        let mut workers: WorkerSet = JoinSet::new();
        let mut owners: HashMap<Id, QuadrantIndex> = HashMap::new();
        for (quadrant, mailbox) in quadrants.into_iter().zip(mailboxes) {
            let index = quadrant.index();
            let worker = QuadrantWorker::new(
                turn,
                quadrant,
                mailbox,
                ring.clone(),
                self.counter.clone(),
                self.rule.clone(),
            );
            let handle = workers.spawn(worker.run());
            owners.insert(handle.id(), index);
        }

        // Workers only finish after cancellation, so an early join is a failure.
        let final_count = tokio::select! {
            count = self.counter.await_zero() => count,
            Some(joined) = workers.join_next_with_id() => {
                cancel.cancel();
                let err = early_exit(turn, joined, &owners);
                workers.shutdown().await;
                return Err(err);
            }
        };

        let low_water = self.counter.low_water_mark();
        let decrements = self.counter.decrements_since_reset();
        cancel.cancel();

        if final_count < 0 {
            workers.shutdown().await;
            return Err(FieldError::NegativeJobCount {
                turn,
                count: final_count,
            });
        }

        let mut report = TurnReport {
            turn,
            counter_low_water: low_water,
            decrements,
            ..Default::default()
        };
        let mut reclaimed = Vec::with_capacity(owners.len());
        while let Some(joined) = workers.join_next_with_id().await {
            let outcome = match joined {
                Ok((_, Ok(outcome))) => outcome,
                Ok((id, Err(e))) => {
                    warn!(turn, quadrant = ?owners.get(&id), error = %e, "Worker failed");
                    workers.shutdown().await;
                    return Err(e);
                }
                Err(join_error) => {
                    workers.shutdown().await;
                    return Err(worker_failed(turn, &join_error, &owners));
                }
            };
            report.forwarded += outcome.report.forwarded;
            report.applied += outcome.report.applied;
            reclaimed.push(outcome.quadrant);
        }
        reclaimed.sort_by_key(Quadrant::index);
        self.quadrants = reclaimed;

        if report.forwarded != report.applied {
            warn!(
                turn,
                forwarded = report.forwarded,
                applied = report.applied,
                "Forwarded and applied placements differ"
            );
        }
        debug!(
            turn,
            forwarded = report.forwarded,
            applied = report.applied,
            low_water,
            "Turn complete"
        );
        Ok(report)
    }
}

fn early_exit(
    turn: usize,
    joined: std::result::Result<(Id, Result<WorkerOutcome>), JoinError>,
    owners: &HashMap<Id, QuadrantIndex>,
) -> FieldError {
    match joined {
        Ok((_, Err(e))) => e,
        Ok((id, Ok(outcome))) => FieldError::WorkerFailed {
            quadrant: owners
                .get(&id)
                .copied()
                .unwrap_or(outcome.report.quadrant),
            turn,
            reason: "stopped draining before the turn was cancelled".to_string(),
        },
        Err(join_error) => worker_failed(turn, &join_error, owners),
    }
}

fn worker_failed(
    turn: usize,
    join_error: &JoinError,
    owners: &HashMap<Id, QuadrantIndex>,
) -> FieldError {
    FieldError::WorkerFailed {
        quadrant: owners
            .get(&join_error.id())
            .copied()
            .unwrap_or(usize::MAX),
        turn,
        reason: join_error.to_string(),
    }
}
