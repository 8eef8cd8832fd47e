#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure pop model deciding whether a pump bursts the balloon.
//!
//! Probability tables express each pump as a value `X` on a ten point scale:
//! the pump pops with probability `X / 10`. One of ten equally likely
//! outcomes is drawn and the balloon pops when the draw lands in the top `X`
//! of them. The terminal sentinel slot of every tier pops unconditionally.

use bart_core::{ProbabilityTable, RandomSource, RiskTier, POP_SCALE};

/// Chance that a given pump pops, expressed in tenths.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PopChance {
    /// The pump pops with probability `tenths / 10`.
    Tenths(u8),
    /// The tier's configured pumps are exhausted; the pump always pops.
    Certain,
}

/// Resolves the chance that the pump at `pump_index` pops for the tier.
///
/// `pump_index` counts the pumps already made successfully this round.
#[must_use]
pub fn pop_chance(tier: RiskTier, pump_index: usize, table: &ProbabilityTable) -> PopChance {
    if pump_index >= table.sentinel_index(tier) {
        return PopChance::Certain;
    }

    match table.denominator(tier, pump_index) {
        POP_SCALE => PopChance::Certain,
        tenths => PopChance::Tenths(tenths),
    }
}

/// Decides whether the pump at `pump_index` pops the balloon.
///
/// Consumes one draw from `rng` unless the outcome is already certain. The
/// caller owns the round state and applies the result.
pub fn should_pop<R>(
    tier: RiskTier,
    pump_index: usize,
    table: &ProbabilityTable,
    rng: &mut R,
) -> bool
where
    R: RandomSource + ?Sized,
{
    match pop_chance(tier, pump_index, table) {
        PopChance::Certain => true,
        PopChance::Tenths(tenths) => {
            let outcome = rng.roll_outcome();
            debug_assert!((1..=POP_SCALE).contains(&outcome), "outcome {outcome} off scale");
            outcome > POP_SCALE - tenths
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(u8);

    impl RandomSource for Fixed {
        fn pick_index(&mut self, _upper: usize) -> usize {
            0
        }

        fn roll_outcome(&mut self) -> u8 {
            self.0
        }
    }

    fn table() -> ProbabilityTable {
        ProbabilityTable::new(vec![10, 3], vec![1, 1, 1], vec![5]).expect("valid table")
    }

    #[test]
    fn full_scale_entry_is_certain() {
        assert_eq!(pop_chance(RiskTier::High, 0, &table()), PopChance::Certain);
        assert_eq!(pop_chance(RiskTier::High, 1, &table()), PopChance::Tenths(3));
    }

    #[test]
    fn sentinel_slot_is_certain_despite_its_denominator() {
        assert_eq!(pop_chance(RiskTier::Medium, 3, &table()), PopChance::Certain);
        assert_eq!(pop_chance(RiskTier::Low, 1, &table()), PopChance::Certain);
        assert_eq!(pop_chance(RiskTier::Low, 40, &table()), PopChance::Certain);
    }

    #[test]
    fn draw_pops_only_within_top_outcomes() {
        let table = table();

        assert!(!should_pop(RiskTier::High, 1, &table, &mut Fixed(7)));
        assert!(should_pop(RiskTier::High, 1, &table, &mut Fixed(8)));
        assert!(should_pop(RiskTier::High, 1, &table, &mut Fixed(10)));
        assert!(!should_pop(RiskTier::Medium, 0, &table, &mut Fixed(9)));
        assert!(should_pop(RiskTier::Medium, 0, &table, &mut Fixed(10)));
    }
}
