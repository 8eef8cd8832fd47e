#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Balloon Analogue Risk Task.
//!
//! This crate defines the vocabulary that connects the adapters, the
//! authoritative task controller, and the pure systems. Adapters translate
//! device input into [`TaskInput`] values, the controller applies them and
//! broadcasts [`TaskEvent`] values describing what happened, and presenters
//! read a [`TaskView`] snapshot each frame. Persistent side effects (trial
//! logging and hardware triggers) flow through the narrow collaborator traits
//! [`TrialLogger`], [`TriggerSink`] and [`ResourceProvider`].

use std::{fmt, io, str::FromStr};

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest number of rounds a single session may be configured with.
pub const MAX_ROUNDS: u32 = 240;

/// Number of equally likely outcomes drawn for each pump.
pub const POP_SCALE: u8 = 10;

/// Denominator appended to every tier sequence so the balloon eventually pops.
pub const SENTINEL_DENOMINATOR: u8 = 1;

/// Column names of the per-round trial log, in the order analysis scripts expect.
pub const TRIAL_LOG_FIELDS: [&str; 5] = [
    "num_keypresses",
    "round_money_won",
    "total_money_won",
    "popped",
    "risk",
];

/// Line terminator written after every trial log row.
pub const TRIAL_LOG_LINE_TERMINATOR: &str = "\r\n";

/// Risk tier assigned to a round, selecting its pop-probability schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    /// Steepest pop schedule.
    High,
    /// Intermediate pop schedule; absorbs the remainder when balancing rounds.
    Medium,
    /// Gentlest pop schedule.
    Low,
}

impl RiskTier {
    /// Every tier in canonical order: high, medium, low.
    pub const ALL: [RiskTier; 3] = [RiskTier::High, RiskTier::Medium, RiskTier::Low];

    /// Lowercase name used in trial logs and asset file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskTier {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "high" => Ok(Self::High),
            "medium" => Ok(Self::Medium),
            "low" => Ok(Self::Low),
            other => Err(ConfigError::UnknownTier(other.to_owned())),
        }
    }
}

/// Identifier of the participant taking the task: exactly four ASCII digits.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Validates and wraps a participant identifier.
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let value = value.trim();
        if value.len() == 4 && value.bytes().all(|byte| byte.is_ascii_digit()) {
            Ok(Self(value.to_owned()))
        } else {
            Err(ConfigError::InvalidParticipant(value.to_owned()))
        }
    }

    /// Borrowed textual form of the identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Number of rounds played in a session, bounded to `1..=MAX_ROUNDS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoundCount(u32);

impl RoundCount {
    /// Validates the provided round count.
    pub fn new(value: u32) -> Result<Self, ConfigError> {
        if (1..=MAX_ROUNDS).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::RoundCountOutOfRange(value))
        }
    }

    /// Retrieves the numeric representation of the round count.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Background image drawn behind every screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Background {
    /// Police themed backdrop.
    Police,
    /// Woodland backdrop.
    Trees,
    /// Casino themed backdrop.
    Gambling,
}

impl Background {
    /// Name of the background as typed by the experimenter and used for the asset file.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Police => "police",
            Self::Trees => "trees",
            Self::Gambling => "gambling",
        }
    }

    /// Parses an experimenter selection where `none` disables the background.
    pub fn parse_selection(value: &str) -> Result<Option<Self>, ConfigError> {
        match value.trim() {
            "police" => Ok(Some(Self::Police)),
            "trees" => Ok(Some(Self::Trees)),
            "gambling" => Ok(Some(Self::Gambling)),
            "none" => Ok(None),
            other => Err(ConfigError::UnknownBackground(other.to_owned())),
        }
    }
}

/// Immutable settings collected from the experimenter before the task starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Participant whose responses are being recorded.
    pub participant: ParticipantId,
    /// Number of rounds to play.
    pub rounds: RoundCount,
    /// Whether round-end feedback text is displayed.
    pub active_response: bool,
    /// Optional background image selection.
    pub background: Option<Background>,
}

impl SessionConfig {
    /// Creates a new session configuration.
    #[must_use]
    pub fn new(
        participant: ParticipantId,
        rounds: RoundCount,
        active_response: bool,
        background: Option<Background>,
    ) -> Self {
        Self {
            participant,
            rounds,
            active_response,
            background,
        }
    }
}

/// Per-tier "1-in-X on a ten point scale" pop schedules.
///
/// Entry `i` of a tier describes the `i`-th pump of a round. Every sequence
/// carries a trailing [`SENTINEL_DENOMINATOR`] that guarantees the balloon
/// pops once the configured pumps are exhausted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbabilityTable {
    high: Vec<u8>,
    medium: Vec<u8>,
    low: Vec<u8>,
}

impl ProbabilityTable {
    /// Validates the configured sequences and appends the terminal sentinel to each.
    pub fn new(high: Vec<u8>, medium: Vec<u8>, low: Vec<u8>) -> Result<Self, ProbabilityError> {
        Ok(Self {
            high: with_sentinel(RiskTier::High, high)?,
            medium: with_sentinel(RiskTier::Medium, medium)?,
            low: with_sentinel(RiskTier::Low, low)?,
        })
    }

    /// Parses the textual probability source: one comma-separated line per tier,
    /// in the order high, medium, low.
    pub fn parse(source: &str) -> Result<Self, ProbabilityError> {
        let mut lines = source.lines();
        let mut next_sequence = |tier: RiskTier| {
            let line = lines.next().ok_or(ProbabilityError::MissingTier(tier))?;
            parse_sequence(tier, line)
        };

        let high = next_sequence(RiskTier::High)?;
        let medium = next_sequence(RiskTier::Medium)?;
        let low = next_sequence(RiskTier::Low)?;
        Self::new(high, medium, low)
    }

    /// Full sequence for the tier, sentinel included.
    #[must_use]
    pub fn denominators(&self, tier: RiskTier) -> &[u8] {
        match tier {
            RiskTier::High => &self.high,
            RiskTier::Medium => &self.medium,
            RiskTier::Low => &self.low,
        }
    }

    /// Denominator governing the pump at `pump_index`; saturates at the sentinel.
    #[must_use]
    pub fn denominator(&self, tier: RiskTier, pump_index: usize) -> u8 {
        let sequence = self.denominators(tier);
        sequence
            .get(pump_index)
            .copied()
            .unwrap_or(SENTINEL_DENOMINATOR)
    }

    /// Index of the sentinel slot for the tier; pumps at or beyond it always pop.
    #[must_use]
    pub fn sentinel_index(&self, tier: RiskTier) -> usize {
        self.denominators(tier).len() - 1
    }
}

fn with_sentinel(tier: RiskTier, mut sequence: Vec<u8>) -> Result<Vec<u8>, ProbabilityError> {
    if sequence.is_empty() {
        return Err(ProbabilityError::EmptyTier(tier));
    }
    if let Some(&value) = sequence
        .iter()
        .find(|value| !(1..=POP_SCALE).contains(*value))
    {
        return Err(ProbabilityError::OutOfScale { tier, value });
    }
    sequence.push(SENTINEL_DENOMINATOR);
    Ok(sequence)
}

fn parse_sequence(tier: RiskTier, line: &str) -> Result<Vec<u8>, ProbabilityError> {
    if line.trim().is_empty() {
        return Err(ProbabilityError::EmptyTier(tier));
    }
    line.split(',')
        .map(|entry| {
            let entry = entry.trim();
            entry
                .parse::<u8>()
                .map_err(|_| ProbabilityError::InvalidEntry {
                    tier,
                    entry: entry.to_owned(),
                })
        })
        .collect()
}

/// Risk tier assigned to every round of a session, fixed at setup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiskSchedule {
    tiers: Vec<RiskTier>,
}

impl RiskSchedule {
    /// Wraps an assignment after checking it honours the balancing rule.
    pub fn new(tiers: Vec<RiskTier>) -> Result<Self, ScheduleError> {
        if tiers.is_empty() {
            return Err(ScheduleError::Empty);
        }
        for tier in RiskTier::ALL {
            let expected = tier_quota(tier, tiers.len());
            let actual = tiers.iter().filter(|assigned| **assigned == tier).count();
            if actual != expected {
                return Err(ScheduleError::Unbalanced {
                    tier,
                    expected,
                    actual,
                });
            }
        }
        Ok(Self { tiers })
    }

    /// Number of rounds covered by the schedule.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Reports whether the schedule covers no rounds. Always `false` once constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Tier of the round at the provided zero-based index.
    #[must_use]
    pub fn tier(&self, round_index: usize) -> Option<RiskTier> {
        self.tiers.get(round_index).copied()
    }

    /// Number of rounds assigned to the tier.
    #[must_use]
    pub fn count(&self, tier: RiskTier) -> usize {
        self.tiers.iter().filter(|assigned| **assigned == tier).count()
    }

    /// Tiers in round order.
    #[must_use]
    pub fn as_slice(&self) -> &[RiskTier] {
        &self.tiers
    }
}

/// Number of rounds the tier receives when `rounds` are balanced across tiers.
///
/// High and low receive `rounds / 3` each; medium also absorbs the remainder.
#[must_use]
pub const fn tier_quota(tier: RiskTier, rounds: usize) -> usize {
    let share = rounds / 3;
    match tier {
        RiskTier::Medium => share + rounds % 3,
        RiskTier::High | RiskTier::Low => share,
    }
}

/// How a round ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// The balloon burst and the round's winnings were forfeited.
    Popped,
    /// The participant banked the round's winnings.
    Cashed,
}

/// One row of the per-round trial log.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RoundRecord {
    /// Successful pumps made during the round.
    pub num_keypresses: u32,
    /// Winnings banked this round; zero when the balloon popped.
    pub round_money_won: u32,
    /// Cumulative winnings after the round.
    pub total_money_won: u32,
    /// Whether the balloon popped.
    pub popped: bool,
    /// Risk tier of the round.
    pub risk: RiskTier,
}

impl RoundRecord {
    /// Header row matching [`TRIAL_LOG_FIELDS`].
    #[must_use]
    pub fn csv_header() -> String {
        TRIAL_LOG_FIELDS.join(",")
    }

    /// Serialises the record as a trial log row without the line terminator.
    ///
    /// Booleans are spelled `True`/`False` so existing analysis scripts keep parsing the file.
    #[must_use]
    pub fn to_csv_row(&self) -> String {
        let popped = if self.popped { "True" } else { "False" };
        format!(
            "{},{},{},{},{}",
            self.num_keypresses, self.round_money_won, self.total_money_won, popped, self.risk
        )
    }
}

/// Marker sent to the physiological recording hardware at round-terminal events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerCode {
    /// The balloon popped.
    Popped,
    /// The participant cashed in.
    CashedIn,
}

impl TriggerCode {
    /// Numeric code understood by the recording software.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Popped => 9,
            Self::CashedIn => 7,
        }
    }

    /// Wire payload sent over the trigger channel.
    #[must_use]
    pub fn payload(self) -> String {
        format!("<TRIGGER>{}</TRIGGER>", self.value())
    }
}

/// Discrete input intents produced by an input source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskInput {
    /// Experimenter or participant confirmation (enter).
    Confirm,
    /// Request to leave the task from the welcome screen.
    Decline,
    /// Inflate the balloon once more.
    Pump,
    /// Bank the current round's winnings.
    CashIn,
    /// The window was closed; ends the session from any state.
    Close,
    /// The presentation surface changed size.
    Resize {
        /// New surface width in pixels.
        width: u32,
        /// New surface height in pixels.
        height: u32,
    },
}

/// Identity of a task state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateKind {
    /// Welcome screen awaiting confirmation.
    Start,
    /// Resource acquisition and schedule preparation.
    Setup,
    /// A round in progress.
    Play,
    /// Round ended by a pop.
    Popped,
    /// Round ended by cashing in.
    Cashed,
    /// Session complete.
    Exit,
}

/// Balloon figures shown while a round is played or reviewed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalloonView {
    /// Risk tier of the round, selecting the balloon artwork.
    pub tier: RiskTier,
    /// Successful pumps so far.
    pub pumps: u32,
    /// Winnings the participant would bank by cashing in now.
    pub round_winnings: u32,
    /// Cumulative winnings across completed rounds.
    pub total_winnings: u32,
}

/// Presentation snapshot of the active state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskView {
    /// Welcome screen.
    Welcome,
    /// Setup is running; nothing to show.
    Preparing,
    /// A round is being played.
    Inflating(BalloonView),
    /// A round has ended and awaits confirmation.
    RoundOver {
        /// Final balloon figures of the round.
        balloon: BalloonView,
        /// How the round ended.
        outcome: RoundOutcome,
        /// Whether feedback text should be displayed.
        feedback: bool,
    },
    /// All rounds were played.
    Complete,
}

/// Collaborator a failure originated from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SinkKind {
    /// The per-round trial log.
    TrialLog,
    /// The hardware trigger channel.
    Trigger,
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TrialLog => f.write_str("trial log"),
            Self::Trigger => f.write_str("trigger"),
        }
    }
}

/// Reason a session stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Termination {
    /// The task was declined on the welcome screen.
    Declined,
    /// Every round was played and the exit screen was confirmed.
    Completed,
    /// The window was closed.
    Closed,
}

/// Events broadcast by the task controller after processing input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TaskEvent {
    /// A state became active.
    StateEntered {
        /// State that was entered.
        state: StateKind,
        /// State that was active before it, if any.
        previous: Option<StateKind>,
    },
    /// Setup finished: resources are open and the schedule is fixed.
    SessionPrepared {
        /// Risk schedule drawn for the session.
        schedule: RiskSchedule,
    },
    /// A pump succeeded without popping.
    Pumped {
        /// Tier of the round.
        tier: RiskTier,
        /// Pump count after the pump.
        pumps: u32,
    },
    /// A round finished and its record was handed to the trial logger.
    RoundCompleted {
        /// Logged record.
        record: RoundRecord,
    },
    /// A trigger marker was delivered to the trigger sink.
    TriggerSent {
        /// Marker that was sent.
        code: TriggerCode,
    },
    /// A collaborator failed; the session continues.
    SinkFailed {
        /// Collaborator that failed.
        sink: SinkKind,
        /// Human readable failure description.
        message: String,
    },
    /// The trial log and trigger channel were released.
    ResourcesReleased,
    /// The presentation surface changed size.
    ViewportResized {
        /// New surface width in pixels.
        width: u32,
        /// New surface height in pixels.
        height: u32,
    },
    /// The session stopped; no further input is accepted.
    Terminated {
        /// Why the session stopped.
        reason: Termination,
    },
}

/// Source of the random draws consumed by the risk distributor and pop model.
pub trait RandomSource {
    /// Uniformly picks an index in `0..upper`. `upper` is always positive.
    fn pick_index(&mut self, upper: usize) -> usize;

    /// Uniformly draws one of the [`POP_SCALE`] outcomes, `1..=POP_SCALE`.
    fn roll_outcome(&mut self) -> u8;
}

/// Adapts any `rand` generator into a [`RandomSource`].
#[derive(Clone, Debug)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    /// Wraps the provided generator.
    #[must_use]
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn pick_index(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }

    fn roll_outcome(&mut self) -> u8 {
        self.rng.gen_range(1..=POP_SCALE)
    }
}

/// Append-only destination for per-round records.
pub trait TrialLogger {
    /// Appends one record.
    fn append(&mut self, record: &RoundRecord) -> Result<(), SinkError>;

    /// Flushes and releases the destination. Further appends fail with [`SinkError::Closed`].
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Fire-and-forget channel to external recording hardware.
pub trait TriggerSink {
    /// Sends a marker.
    fn send(&mut self, code: TriggerCode) -> Result<(), SinkError>;

    /// Releases the channel. Further sends fail with [`SinkError::Closed`].
    fn close(&mut self) -> Result<(), SinkError>;
}

/// Collaborators acquired at setup and held until the session ends.
pub struct SessionResources {
    /// Destination of the per-round records.
    pub logger: Box<dyn TrialLogger>,
    /// Channel for hardware markers.
    pub trigger: Box<dyn TriggerSink>,
    /// Pop schedules for the session.
    pub probabilities: ProbabilityTable,
}

impl fmt::Debug for SessionResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionResources")
            .field("probabilities", &self.probabilities)
            .finish_non_exhaustive()
    }
}

/// Acquires the session's collaborators when setup runs.
pub trait ResourceProvider {
    /// Opens the trial log, connects the trigger channel and loads the probability table.
    fn open(&mut self, config: &SessionConfig) -> Result<SessionResources, SetupError>;
}

/// Errors raised while validating experimenter supplied settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The round count fell outside `1..=MAX_ROUNDS`.
    #[error("round count must be between 1 and {MAX_ROUNDS} (received {0})")]
    RoundCountOutOfRange(u32),
    /// The participant identifier was not four ASCII digits.
    #[error("participant id must be exactly 4 digits (received {0:?})")]
    InvalidParticipant(String),
    /// The background selection was not recognised.
    #[error("unknown background {0:?}; expected police, trees, gambling or none")]
    UnknownBackground(String),
    /// The risk tier name was not recognised.
    #[error("unknown risk tier {0:?}; expected high, medium or low")]
    UnknownTier(String),
}

/// Errors raised while building a probability table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProbabilityError {
    /// The source ended before the tier's line.
    #[error("probability source has no line for the {0} tier")]
    MissingTier(RiskTier),
    /// The tier's sequence contained no entries.
    #[error("probability sequence for the {0} tier is empty")]
    EmptyTier(RiskTier),
    /// An entry was not an integer.
    #[error("probability entry {entry:?} for the {tier} tier is not an integer")]
    InvalidEntry {
        /// Tier whose line contained the entry.
        tier: RiskTier,
        /// Offending text.
        entry: String,
    },
    /// An entry fell outside `1..=POP_SCALE`.
    #[error("probability entry {value} for the {tier} tier must be between 1 and {POP_SCALE}")]
    OutOfScale {
        /// Tier whose sequence contained the entry.
        tier: RiskTier,
        /// Offending value.
        value: u8,
    },
}

/// Errors raised when a risk schedule breaks the balancing rule.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScheduleError {
    /// The schedule covered no rounds.
    #[error("risk schedule must cover at least one round")]
    Empty,
    /// A tier received the wrong number of rounds.
    #[error("risk schedule assigns {actual} rounds to the {tier} tier, expected {expected}")]
    Unbalanced {
        /// Tier with the wrong count.
        tier: RiskTier,
        /// Count required by the balancing rule.
        expected: usize,
        /// Count found in the schedule.
        actual: usize,
    },
}

/// Errors reported by trial loggers and trigger sinks.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The underlying I/O operation failed.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The collaborator was used after being released.
    #[error("sink already closed")]
    Closed,
}

/// Errors raised while acquiring session resources.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The trial log could not be created.
    #[error("failed to open trial log")]
    TrialLog(#[source] io::Error),
    /// The trigger channel could not be connected.
    #[error("failed to connect trigger channel")]
    Trigger(#[source] io::Error),
    /// The probability source could not be read.
    #[error("failed to read probability source")]
    ProbabilitySource(#[source] io::Error),
    /// The probability source was malformed.
    #[error("invalid probability source")]
    Probabilities(#[from] ProbabilityError),
}
