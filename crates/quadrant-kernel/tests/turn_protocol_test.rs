//! Integration tests for the turn protocol.
//!
//! Covers the properties a whole run must hold:
//! - Total weight is conserved turn by turn
//! - One lap of the ring (W * Q turns) restores the starting field
//! - Every forwarded placement is applied in the same turn
//! - The job counter never dips below zero
//! - Empty turns produce no mailbox traffic

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;

use quadrant_kernel::rule::Outbox;
use quadrant_kernel::{
    Coordinator, FieldConfig, FieldError, KernelBuilder, LocalRule, MarkerPosition,
    PendingPlacement, Quadrant, Result,
};

/// Test helper: coordinator with `markers` random markers per quadrant
fn seeded(quadrants: usize, side: usize, markers: usize, seed: u64) -> Coordinator {
    let config = FieldConfig::square(quadrants, side).markers(markers).seed(seed);
    KernelBuilder::new(config).build().unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_weight_is_conserved_every_turn() {
    let mut coordinator = seeded(4, 8, 10, 1);
    let start = coordinator.snapshot().unwrap();
    assert_eq!(start.total_weight(), 40);

    for _ in 0..12 {
        let report = coordinator.run_turns(1).await.unwrap();
        assert!(report.is_balanced());
        let snapshot = coordinator.snapshot().unwrap();
        assert_eq!(snapshot.total_weight(), start.total_weight());
        assert_eq!(snapshot.marker_count(), start.marker_count());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_one_lap_restores_the_field() {
    for quadrants in 1..=5 {
        let mut coordinator = seeded(quadrants, 6, 9, quadrants as u64);
        let before = coordinator.snapshot().unwrap();

        let report = coordinator.run_turns(6 * quadrants).await.unwrap();

        assert_eq!(report.turns, 6 * quadrants);
        assert!(report.is_balanced());
        assert_eq!(before, coordinator.snapshot().unwrap(), "Q={}", quadrants);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_repeated_laps_stay_fixed() {
    let config = FieldConfig::square(3, 10).markers(20).seed(99);
    let mut coordinator = KernelBuilder::new(config.clone()).build().unwrap();
    let before = coordinator.snapshot().unwrap();

    for _ in 0..5 {
        coordinator.run_turns(config.effective_turns()).await.unwrap();
        assert_eq!(before, coordinator.snapshot().unwrap());
    }
    assert_eq!(coordinator.turns_completed(), 150);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_marker_walks_the_ring() {
    let config = FieldConfig {
        height: 4,
        ..FieldConfig::square(4, 5).markers(0)
    };
    let mut coordinator = Coordinator::new(&config).unwrap();
    coordinator.place(0, 2, 0, 1).unwrap();

    for turn in 1..=20 {
        let report = coordinator.run_turns(1).await.unwrap();

        // Global column counts from the left edge of quadrant 0 and wraps at 20.
        let global = (20 - turn % 20) % 20;
        assert_eq!(
            coordinator.snapshot().unwrap().markers(),
            vec![MarkerPosition {
                quadrant: global / 5,
                row: 2,
                column: global % 5,
                value: 1,
            }],
            "turn {}",
            turn
        );

        // The marker leaves column 0 on turns 1, 6, 11 and 16.
        assert_eq!(report.forwarded, usize::from(turn % 5 == 1), "turn {}", turn);
        // One decrement per local pass plus one per applied placement.
        assert_eq!(
            report.history[0].decrements,
            4 + report.applied as u64,
            "turn {}",
            turn
        );
        if turn % 5 == 1 {
            assert_eq!(global % 5, 4);
        }
    }

    let field = coordinator.snapshot().unwrap();
    assert_eq!(field.get(0, 2, 0), Some(1));
    assert_eq!(field.total_weight(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_marker_enters_previous_quadrant_at_rightmost_column() {
    let mut coordinator = Coordinator::new(&FieldConfig::square(4, 5).markers(0)).unwrap();
    coordinator.place(0, 2, 0, 1).unwrap();

    coordinator.run_turns(1).await.unwrap();
    let markers = coordinator.snapshot().unwrap().markers();
    assert_eq!(
        markers,
        vec![MarkerPosition {
            quadrant: 3,
            row: 2,
            column: 4,
            value: 1,
        }]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_counter_never_negative() {
    let mut coordinator = seeded(6, 5, 25, 3);
    let report = coordinator.run_turns(10).await.unwrap();

    assert!(report.counter_low_water >= 0);
    assert!(report.history.iter().all(|t| t.counter_low_water >= 0));
    assert_eq!(coordinator.counter().value(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_empty_turn_only_decrements_once_per_quadrant() {
    let mut coordinator = seeded(5, 4, 0, 0);
    let report = coordinator.run_turns(1).await.unwrap();
    let turn = &report.history[0];

    assert_eq!(turn.forwarded, 0);
    assert_eq!(turn.applied, 0);
    assert_eq!(turn.decrements, 5);
    assert_eq!(coordinator.counter().value(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_more_quadrants_than_threads() {
    let mut coordinator = seeded(16, 3, 4, 5);
    let before = coordinator.snapshot().unwrap();
    coordinator.run_turns(48).await.unwrap();
    assert_eq!(before, coordinator.snapshot().unwrap());
}

#[tokio::test]
async fn test_current_thread_runtime_completes_turns() {
    let mut coordinator = seeded(3, 4, 6, 8);
    let before = coordinator.snapshot().unwrap();
    coordinator.run_turns(12).await.unwrap();
    assert_eq!(before, coordinator.snapshot().unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_write_grid_between_runs() {
    let mut coordinator = Coordinator::new(&FieldConfig::square(2, 3).markers(0)).unwrap();
    coordinator
        .write_grid(1, &[vec![0, 0, 7], vec![0, 0, 0], vec![0, 0, 0]])
        .unwrap();

    coordinator.run_turns(3).await.unwrap();
    assert_eq!(
        coordinator.read_grid(0).unwrap(),
        vec![vec![0, 0, 7], vec![0, 0, 0], vec![0, 0, 0]]
    );
    assert_eq!(coordinator.read_grid(1).unwrap(), vec![vec![0; 3]; 3]);
}

/// Collapses each quadrant's weight into one placement on its left neighbour.
struct MergeIntoNeighbour;

impl LocalRule for MergeIntoNeighbour {
    fn name(&self) -> &str {
        "merge_into_neighbour"
    }

    fn apply(&self, quadrant: &mut Quadrant, outbox: &mut Outbox<'_>) -> Result<()> {
        // Every quadrant dumps its total weight onto cell (0, 0) of its left neighbour.
        let weight = quadrant.total_weight() as u32;
        quadrant.write_grid(&vec![vec![0; quadrant.width()]; quadrant.height()])?;
        if weight > 0 {
            outbox.forward_left(PendingPlacement::new(0, 0, weight))?;
        }
        Ok(())
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_custom_rule_uses_the_same_protocol() {
    let config = FieldConfig::square(3, 4).markers(3).seed(21);
    let mut coordinator = KernelBuilder::new(config)
        .rule(Arc::new(MergeIntoNeighbour))
        .build()
        .unwrap();

    let report = coordinator.run_turns(2).await.unwrap();
    assert_eq!(report.forwarded, 6);
    assert!(report.is_balanced());

    let field = coordinator.snapshot().unwrap();
    assert_eq!(field.total_weight(), 9);
    assert_eq!(field.marker_count(), 3);
}

#[tokio::test]
async fn test_invalid_turn_config_fails_before_start() {
    let err = Coordinator::new(&FieldConfig::square(3, 4).turns(0)).unwrap_err();
    assert!(matches!(err, FieldError::InvalidConfig { field: "turns", .. }));
}

#[test]
fn test_seed_random_on_coordinator() {
    let mut coordinator = Coordinator::new(&FieldConfig::square(2, 4).markers(0)).unwrap();
    let placed = coordinator
        .seed_random(3, &mut StdRng::seed_from_u64(4))
        .unwrap();
    assert_eq!(placed, 6);
    assert_eq!(coordinator.snapshot().unwrap().total_weight(), 6);
}
