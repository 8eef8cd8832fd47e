#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure risk distribution system that assigns a tier to every round of a session.

use bart_core::{tier_quota, RandomSource, RiskSchedule, RiskTier, RoundCount, ScheduleError};

/// Draws a balanced random assignment of risk tiers to round indices.
///
/// Tiers are placed in canonical order (high, medium, low). Each placement
/// picks uniformly among the round indices that are still unfilled, so the
/// routine performs exactly one draw per round and always terminates.
pub fn distribute<R>(rounds: RoundCount, rng: &mut R) -> Result<RiskSchedule, ScheduleError>
where
    R: RandomSource + ?Sized,
{
    let total = rounds.get() as usize;
    let mut slots: Vec<Option<RiskTier>> = vec![None; total];
    let mut unfilled: Vec<usize> = (0..total).collect();

    for tier in RiskTier::ALL {
        for _ in 0..tier_quota(tier, total) {
            let pick = rng.pick_index(unfilled.len());
            let index = unfilled.swap_remove(pick);
            slots[index] = Some(tier);
        }
    }

    debug_assert!(unfilled.is_empty(), "every round must receive a tier");
    let tiers = slots.into_iter().flatten().collect();
    RiskSchedule::new(tiers)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FirstSlot;

    impl RandomSource for FirstSlot {
        fn pick_index(&mut self, _upper: usize) -> usize {
            0
        }

        fn roll_outcome(&mut self) -> u8 {
            1
        }
    }

    #[test]
    fn single_round_is_medium() {
        let rounds = RoundCount::new(1).expect("valid round count");
        let schedule = distribute(rounds, &mut FirstSlot).expect("balanced schedule");

        assert_eq!(schedule.as_slice(), &[RiskTier::Medium]);
    }

    #[test]
    fn always_picking_the_first_unfilled_slot_follows_swap_order() {
        let rounds = RoundCount::new(4).expect("valid round count");
        let schedule = distribute(rounds, &mut FirstSlot).expect("balanced schedule");

        // unfilled: [0,1,2,3] -> high@0 -> [3,1,2] -> medium@3 -> [2,1] -> medium@2 -> [1] -> low@1
        assert_eq!(
            schedule.as_slice(),
            &[RiskTier::High, RiskTier::Low, RiskTier::Medium, RiskTier::Medium]
        );
    }
}
