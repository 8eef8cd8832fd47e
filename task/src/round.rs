//! Per-round and per-session bookkeeping owned by the task controller.

use bart_core::{RiskTier, RoundCount, RoundOutcome, RoundRecord};

/// Running totals that persist across the rounds of one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionTally {
    total_winnings: u32,
    remaining_rounds: u32,
}

impl SessionTally {
    /// Creates an empty tally for a session of `rounds` rounds.
    #[must_use]
    pub fn new(rounds: RoundCount) -> Self {
        Self {
            total_winnings: 0,
            remaining_rounds: rounds.get(),
        }
    }

    /// Winnings banked across completed rounds.
    #[must_use]
    pub const fn total_winnings(&self) -> u32 {
        self.total_winnings
    }

    /// Rounds still to be played, including one in progress.
    #[must_use]
    pub const fn remaining_rounds(&self) -> u32 {
        self.remaining_rounds
    }

    fn credit(&mut self, amount: u32) {
        self.total_winnings = self.total_winnings.saturating_add(amount);
    }

    pub(crate) fn complete_round(&mut self) {
        debug_assert!(self.remaining_rounds > 0, "completed more rounds than scheduled");
        self.remaining_rounds = self.remaining_rounds.saturating_sub(1);
    }
}

/// Progress of the round currently being played.
///
/// Each successful pump adds exactly one unit to the round's winnings. A pop
/// forfeits them; cashing in banks them into the [`SessionTally`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundState {
    tier: RiskTier,
    pumps: u32,
    accrued: u32,
    popped: bool,
    cashed: bool,
}

impl RoundState {
    /// Creates a fresh round for the provided tier.
    #[must_use]
    pub const fn new(tier: RiskTier) -> Self {
        Self {
            tier,
            pumps: 0,
            accrued: 0,
            popped: false,
            cashed: false,
        }
    }

    /// Risk tier assigned to the round.
    #[must_use]
    pub const fn tier(&self) -> RiskTier {
        self.tier
    }

    /// Successful pumps made so far.
    #[must_use]
    pub const fn pumps(&self) -> u32 {
        self.pumps
    }

    /// Index of the next pump within the tier's probability sequence.
    #[must_use]
    pub const fn pump_index(&self) -> usize {
        self.pumps as usize
    }

    /// Winnings of the round: zero once the balloon popped.
    #[must_use]
    pub const fn winnings(&self) -> u32 {
        if self.popped {
            0
        } else {
            self.accrued
        }
    }

    /// Whether the balloon popped.
    #[must_use]
    pub const fn popped(&self) -> bool {
        self.popped
    }

    /// Whether the participant cashed in.
    #[must_use]
    pub const fn cashed(&self) -> bool {
        self.cashed
    }

    /// How the round ended, if it has.
    #[must_use]
    pub const fn outcome(&self) -> Option<RoundOutcome> {
        if self.popped {
            Some(RoundOutcome::Popped)
        } else if self.cashed {
            Some(RoundOutcome::Cashed)
        } else {
            None
        }
    }

    /// Applies a pump that did not pop the balloon.
    pub fn inflate(&mut self) {
        if self.outcome().is_some() {
            return;
        }
        self.pumps += 1;
        self.accrued += 1;
    }

    /// Applies a pump that popped the balloon.
    pub fn burst(&mut self) {
        if self.outcome().is_some() {
            return;
        }
        self.popped = true;
    }

    /// Banks the round's winnings into the tally. Has no effect once the round ended.
    pub fn cash_in(&mut self, tally: &mut SessionTally) {
        if self.outcome().is_some() {
            return;
        }
        tally.credit(self.accrued);
        self.cashed = true;
    }

    /// Trial log row describing the round against the session totals.
    #[must_use]
    pub fn to_record(&self, tally: &SessionTally) -> RoundRecord {
        RoundRecord {
            num_keypresses: self.pumps,
            round_money_won: self.winnings(),
            total_money_won: tally.total_winnings(),
            popped: self.popped,
            risk: self.tier,
        }
    }
}
