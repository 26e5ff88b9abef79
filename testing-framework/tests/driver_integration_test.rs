// Integration tests for the production driver
// Covers slot selection, monotonic time and skipped slots

use nom_testing_framework::prelude::*;
use proptest::prelude::*;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[tokio::test]
async fn test_advance_one_produces_next_slot() {
    init_logger();
    let harness = TestHarnessBuilder::new().build().unwrap();
    assert_eq!(harness.frontier_height(), 1);
    assert_eq!(harness.now().timestamp(), GENESIS_TIMESTAMP as i64);

    let outcome = harness.advance_one().await;
    let momentum = outcome.momentum().cloned().unwrap();

    assert_eq!(momentum.height, 2);
    assert_eq!(momentum.timestamp, GENESIS_TIMESTAMP + MOMENTUM_SLOT_DURATION);
    assert_eq!(harness.frontier_height(), 2);
    assert_eq!(harness.now().timestamp(), momentum.timestamp as i64);

    let expected = harness
        .consensus()
        .momentum_producer(momentum.timestamp)
        .unwrap();
    assert_eq!(Some(momentum.producer), expected);
}

#[tokio::test]
async fn test_momentums_confirm_submitted_blocks() {
    let harness = TestHarnessBuilder::new().build().unwrap();
    let send = harness
        .submit_send(
            AccountBlock {
                address: USER_KEYS[0].address(),
                to_address: USER_KEYS[1].address(),
                amount: 1,
                ..Default::default()
            },
            None,
            SKIP_VM_CHANGES,
        )
        .unwrap();

    let momentum = harness.advance_one().await.momentum().cloned().unwrap();
    assert_eq!(momentum.content, vec![send.header()]);
    assert!(harness.chain().uncommitted_account_blocks().unwrap().is_empty());

    let empty = harness.advance_one().await.momentum().cloned().unwrap();
    assert!(empty.content.is_empty());
}

#[tokio::test]
async fn test_advance_to_is_idempotent() {
    let harness = TestHarnessBuilder::new().build().unwrap();

    assert_eq!(harness.advance_to(4).await, 3);
    assert_eq!(harness.frontier_height(), 4);

    assert_eq!(harness.advance_to(4).await, 0);
    assert_eq!(harness.advance_to(2).await, 0);
    assert_eq!(harness.frontier_height(), 4);
    assert_eq!(
        harness.now().timestamp(),
        (GENESIS_TIMESTAMP + 3 * MOMENTUM_SLOT_DURATION) as i64
    );
}

#[tokio::test]
async fn test_unowned_slot_is_skipped() {
    let harness = TestHarnessBuilder::new()
        .with_owned_pillars(vec![0])
        .build()
        .unwrap();
    let owned = PILLAR_KEYS[0].address();
    assert_eq!(harness.owned_producers(), vec![owned]);

    // Pillars take turns, so an unowned slot shows up within a full round
    let mut skipped = None;
    for _ in 0..PILLAR_KEYS.len() {
        let outcome = harness.advance_one().await;
        if let SlotOutcome::Skipped { .. } = outcome {
            skipped = Some(outcome);
            break;
        }
        assert_eq!(outcome.momentum().unwrap().producer, owned);
    }

    let skipped = skipped.expect("an unowned slot within one round");
    let height = harness.frontier_height();
    match &skipped {
        SlotOutcome::Skipped {
            producer,
            slot_start,
        } => {
            assert_ne!(*producer, owned);
            assert_eq!(
                *slot_start,
                harness.frontier_momentum().timestamp + MOMENTUM_SLOT_DURATION
            );
        }
        SlotOutcome::Produced { .. } => unreachable!(),
    }

    // The frontier did not move, so the same slot comes back
    assert_eq!(harness.advance_one().await, skipped);
    assert_eq!(harness.frontier_height(), height);
}

#[tokio::test]
#[should_panic(expected = "which this harness does not own")]
async fn test_advance_to_fails_on_unowned_slot() {
    let harness = TestHarnessBuilder::new()
        .with_owned_pillars(vec![1])
        .build()
        .unwrap();
    harness.advance_to(20).await;
}

#[tokio::test]
async fn test_production_timeout_allows_fast_steps() {
    let harness = TestHarnessBuilder::new()
        .with_production_timeout(Duration::from_secs(30))
        .build()
        .unwrap();
    assert!(harness.advance_one().await.is_produced());
    assert_eq!(harness.config().production_timeout(), Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn test_harness_from_yaml_config() {
    let config = HarnessConfig::from_yaml_str("log:\n  level: ERROR\nowned_pillars: [0, 1, 2]\n").unwrap();
    let harness = TestHarnessBuilder::new()
        .with_config(config)
        .build()
        .unwrap();
    assert_eq!(harness.owned_producers().len(), 3);
    assert_eq!(harness.advance_to(3).await, 2);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_frontier_and_clock_are_monotonic(steps in 1usize..12) {
        tokio_test::block_on(async {
            let harness = TestHarnessBuilder::new().build().unwrap();
            let mut height = harness.frontier_height();
            let mut now = harness.now();

            for _ in 0..steps {
                let momentum = harness.advance_one().await.momentum().cloned().unwrap();
                assert_eq!(momentum.height, height + 1);
                assert!(harness.now() > now);
                height = momentum.height;
                now = harness.now();
            }
            assert_eq!(harness.frontier_height(), 1 + steps as u64);
        });
    }
}
