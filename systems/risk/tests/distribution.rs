use bart_core::{RiskTier, RngSource, RoundCount, MAX_ROUNDS};
use bart_system_risk::distribute;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

fn seeded(seed: u64) -> RngSource<ChaCha8Rng> {
    RngSource::new(ChaCha8Rng::seed_from_u64(seed))
}

#[test]
fn every_round_count_is_balanced() {
    let mut rng = seeded(0x5eed_0001);

    for total in 1..=MAX_ROUNDS {
        let rounds = RoundCount::new(total).expect("valid round count");
        let schedule = distribute(rounds, &mut rng).expect("balanced schedule");
        let total = total as usize;

        assert_eq!(schedule.len(), total);
        assert_eq!(schedule.count(RiskTier::High), total / 3);
        assert_eq!(schedule.count(RiskTier::Low), total / 3);
        assert_eq!(schedule.count(RiskTier::Medium), total / 3 + total % 3);
    }
}

#[test]
fn three_rounds_always_contain_one_of_each_tier() {
    let mut rng = seeded(0x5eed_0003);
    let rounds = RoundCount::new(3).expect("valid round count");

    for trial in 0..100 {
        let schedule = distribute(rounds, &mut rng).expect("balanced schedule");
        let mut tiers = schedule.as_slice().to_vec();
        tiers.sort();

        assert_eq!(
            tiers,
            vec![RiskTier::High, RiskTier::Medium, RiskTier::Low],
            "trial {trial} produced {:?}",
            schedule.as_slice()
        );
    }
}

#[test]
fn placement_varies_across_sessions() {
    let mut rng = seeded(0x5eed_0009);
    let rounds = RoundCount::new(30).expect("valid round count");
    let mut high_at_first_round = 0;

    for _ in 0..600 {
        let schedule = distribute(rounds, &mut rng).expect("balanced schedule");
        if schedule.tier(0) == Some(RiskTier::High) {
            high_at_first_round += 1;
        }
    }

    // Expected 200 of 600; allow generous sampling noise.
    assert!(
        (140..=260).contains(&high_at_first_round),
        "first round was high {high_at_first_round} times out of 600"
    );
}

#[test]
fn identical_seeds_replay_identical_schedules() {
    let rounds = RoundCount::new(90).expect("valid round count");

    let first = distribute(rounds, &mut seeded(42)).expect("balanced schedule");
    let second = distribute(rounds, &mut seeded(42)).expect("balanced schedule");

    assert_eq!(first, second, "replay diverged between runs");
}
