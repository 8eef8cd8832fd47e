use bart_core::{ProbabilityTable, RandomSource, RiskTier, RngSource};
use bart_system_pop::should_pop;
use rand_chacha::{rand_core::SeedableRng, ChaCha8Rng};

/// Draws nothing; any call means the model consulted randomness for a certain pop.
struct Exhausted;

impl RandomSource for Exhausted {
    fn pick_index(&mut self, _upper: usize) -> usize {
        panic!("pop model must not pick indices");
    }

    fn roll_outcome(&mut self) -> u8 {
        panic!("certain pops must not consume a draw");
    }
}

fn sample_table() -> ProbabilityTable {
    ProbabilityTable::parse("1,2,3,4,5,6,7,8,9\n1,1,2,2,3,3,4,4\n1,1,1,1,2,2\n")
        .expect("valid table")
}

#[test]
fn saturated_pumps_always_pop() {
    let table = sample_table();

    for tier in RiskTier::ALL {
        let sentinel = table.denominators(tier).len() - 1;
        for pump_index in sentinel..sentinel + 25 {
            assert!(
                should_pop(tier, pump_index, &table, &mut Exhausted),
                "{tier} pump {pump_index} should pop"
            );
        }
    }
}

#[test]
fn full_scale_first_pump_always_pops() {
    let table = ProbabilityTable::new(vec![10], vec![1], vec![1]).expect("valid table");
    let mut rng = RngSource::new(ChaCha8Rng::seed_from_u64(5));

    for _ in 0..200 {
        assert!(should_pop(RiskTier::High, 0, &table, &mut rng));
    }
}

#[test]
fn pop_frequency_tracks_configured_tenths() {
    let table = sample_table();
    let mut rng = RngSource::new(ChaCha8Rng::seed_from_u64(0xba11_00));
    let trials = 20_000;

    for (pump_index, tenths) in [(0usize, 1u32), (2, 3), (4, 5), (8, 9)] {
        let pops = (0..trials)
            .filter(|_| should_pop(RiskTier::High, pump_index, &table, &mut rng))
            .count() as f64;
        let observed = pops / f64::from(trials);
        let expected = f64::from(tenths) / 10.0;

        assert!(
            (observed - expected).abs() < 0.02,
            "pump {pump_index}: observed {observed:.3}, expected {expected:.3}"
        );
    }
}
