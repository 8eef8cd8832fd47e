//! Task states and the dispatcher that sequences them.

use bart_core::{
    BalloonView, RandomSource, ResourceProvider, RoundOutcome, SessionConfig, StateKind, TaskEvent,
    TaskInput, TaskView, Termination, TriggerCode,
};
use bart_system_pop::should_pop;
use bart_system_risk::distribute;
use tracing::{debug, info};

use crate::{
    payload::{CompletedRound, SessionData, Sinks},
    round::{RoundState, SessionTally},
    TaskError,
};

/// Collaborators lent to the active state while it handles a call.
pub(crate) struct StateContext<'a> {
    pub(crate) provider: &'a mut dyn ResourceProvider,
    pub(crate) rng: &'a mut dyn RandomSource,
    pub(crate) events: &'a mut Vec<TaskEvent>,
}

/// What the controller should do after a state handled a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    Stay,
    Advance,
    Terminate(Termination),
}

/// Capabilities every task state provides.
///
/// Entering consumes the payload produced by the previous state's exit; exiting
/// consumes the state, so its working data is dropped at the transition.
pub(crate) trait TaskState: Sized {
    type Entry;
    type Exit;

    fn enter(entry: Self::Entry, ctx: &mut StateContext<'_>) -> Result<Self, TaskError>;

    fn handle_input(&mut self, input: TaskInput, ctx: &mut StateContext<'_>) -> Flow;

    fn update(&mut self, ctx: &mut StateContext<'_>) -> Flow;

    fn view(&self) -> TaskView;

    fn exit(self, ctx: &mut StateContext<'_>) -> Self::Exit;
}

/// Welcome screen.
#[derive(Debug)]
pub(crate) struct Start {
    config: SessionConfig,
}

impl TaskState for Start {
    type Entry = SessionConfig;
    type Exit = SessionConfig;

    fn enter(config: SessionConfig, _ctx: &mut StateContext<'_>) -> Result<Self, TaskError> {
        Ok(Self { config })
    }

    fn handle_input(&mut self, input: TaskInput, _ctx: &mut StateContext<'_>) -> Flow {
        match input {
            TaskInput::Confirm => Flow::Advance,
            TaskInput::Decline => Flow::Terminate(Termination::Declined),
            _ => Flow::Stay,
        }
    }

    fn update(&mut self, _ctx: &mut StateContext<'_>) -> Flow {
        Flow::Stay
    }

    fn view(&self) -> TaskView {
        TaskView::Welcome
    }

    fn exit(self, _ctx: &mut StateContext<'_>) -> SessionConfig {
        self.config
    }
}

/// Acquires the session's resources and draws the risk schedule.
#[derive(Debug)]
pub(crate) struct Setup {
    session: SessionData,
}

impl TaskState for Setup {
    type Entry = SessionConfig;
    type Exit = SessionData;

    fn enter(config: SessionConfig, ctx: &mut StateContext<'_>) -> Result<Self, TaskError> {
        let resources = ctx.provider.open(&config)?;
        let (sinks, probabilities) = Sinks::from_resources(resources);
        let schedule = distribute(config.rounds, &mut *ctx.rng)?;
        info!(
            participant = %config.participant,
            rounds = config.rounds.get(),
            "session prepared"
        );
        ctx.events.push(TaskEvent::SessionPrepared {
            schedule: schedule.clone(),
        });

        let tally = SessionTally::new(config.rounds);
        Ok(Self {
            session: SessionData {
                config,
                sinks,
                probabilities,
                schedule,
                tally,
            },
        })
    }

    fn handle_input(&mut self, _input: TaskInput, _ctx: &mut StateContext<'_>) -> Flow {
        Flow::Stay
    }

    fn update(&mut self, _ctx: &mut StateContext<'_>) -> Flow {
        Flow::Advance
    }

    fn view(&self) -> TaskView {
        TaskView::Preparing
    }

    fn exit(self, _ctx: &mut StateContext<'_>) -> SessionData {
        self.session
    }
}

/// A round in progress.
#[derive(Debug)]
pub(crate) struct Play {
    session: SessionData,
    round: RoundState,
}

impl Play {
    fn balloon(&self) -> BalloonView {
        balloon_view(&self.round, &self.session.tally)
    }
}

impl TaskState for Play {
    type Entry = SessionData;
    type Exit = CompletedRound;

    fn enter(session: SessionData, _ctx: &mut StateContext<'_>) -> Result<Self, TaskError> {
        let round_index =
            (session.config.rounds.get() - session.tally.remaining_rounds()) as usize;
        let tier = session
            .schedule
            .tier(round_index)
            .ok_or(TaskError::MissingRound { round: round_index })?;
        debug!(round = round_index, %tier, "round started");

        Ok(Self {
            session,
            round: RoundState::new(tier),
        })
    }

    fn handle_input(&mut self, input: TaskInput, ctx: &mut StateContext<'_>) -> Flow {
        match input {
            TaskInput::Pump => {
                let tier = self.round.tier();
                let popped = should_pop(
                    tier,
                    self.round.pump_index(),
                    &self.session.probabilities,
                    &mut *ctx.rng,
                );
                if popped {
                    self.round.burst();
                    return Flow::Advance;
                }

                self.round.inflate();
                debug!(%tier, pumps = self.round.pumps(), "pumped");
                ctx.events.push(TaskEvent::Pumped {
                    tier,
                    pumps: self.round.pumps(),
                });
                Flow::Stay
            }
            TaskInput::CashIn => {
                self.round.cash_in(&mut self.session.tally);
                Flow::Advance
            }
            _ => Flow::Stay,
        }
    }

    fn update(&mut self, _ctx: &mut StateContext<'_>) -> Flow {
        Flow::Stay
    }

    fn view(&self) -> TaskView {
        TaskView::Inflating(self.balloon())
    }

    fn exit(self, ctx: &mut StateContext<'_>) -> CompletedRound {
        let Self {
            mut session,
            round,
        } = self;

        let record = round.to_record(&session.tally);
        session.sinks.record(&record, ctx.events);
        session.tally.complete_round();
        info!(
            num_keypresses = record.num_keypresses,
            round_money_won = record.round_money_won,
            total_money_won = record.total_money_won,
            popped = record.popped,
            risk = %record.risk,
            "round completed"
        );
        ctx.events.push(TaskEvent::RoundCompleted { record });

        CompletedRound { session, round }
    }
}

/// Shared behaviour of the Popped and Cashed states: the finished round is
/// shown until confirmed.
#[derive(Debug)]
pub(crate) struct RoundEnd {
    session: SessionData,
    round: RoundState,
    outcome: RoundOutcome,
}

impl RoundEnd {
    pub(crate) fn outcome(&self) -> RoundOutcome {
        self.outcome
    }

    fn remaining_rounds(&self) -> u32 {
        self.session.tally.remaining_rounds()
    }
}

impl TaskState for RoundEnd {
    type Entry = CompletedRound;
    type Exit = SessionData;

    fn enter(completed: CompletedRound, ctx: &mut StateContext<'_>) -> Result<Self, TaskError> {
        let CompletedRound {
            mut session,
            round,
        } = completed;
        let outcome = round.outcome().ok_or(TaskError::UnfinishedRound)?;
        let code = match outcome {
            RoundOutcome::Popped => TriggerCode::Popped,
            RoundOutcome::Cashed => TriggerCode::CashedIn,
        };
        session.sinks.signal(code, ctx.events);

        Ok(Self {
            session,
            round,
            outcome,
        })
    }

    fn handle_input(&mut self, input: TaskInput, _ctx: &mut StateContext<'_>) -> Flow {
        match input {
            TaskInput::Confirm => Flow::Advance,
            _ => Flow::Stay,
        }
    }

    fn update(&mut self, _ctx: &mut StateContext<'_>) -> Flow {
        Flow::Stay
    }

    fn view(&self) -> TaskView {
        TaskView::RoundOver {
            balloon: balloon_view(&self.round, &self.session.tally),
            outcome: self.outcome,
            feedback: self.session.config.active_response,
        }
    }

    fn exit(self, _ctx: &mut StateContext<'_>) -> SessionData {
        self.session
    }
}

/// Session complete; resources are released on entry.
#[derive(Debug)]
pub(crate) struct Exit {
    total_winnings: u32,
}

impl TaskState for Exit {
    type Entry = SessionData;
    type Exit = ();

    fn enter(session: SessionData, ctx: &mut StateContext<'_>) -> Result<Self, TaskError> {
        let SessionData {
            mut sinks, tally, ..
        } = session;
        sinks.release(ctx.events);
        info!(total_winnings = tally.total_winnings(), "session complete");

        Ok(Self {
            total_winnings: tally.total_winnings(),
        })
    }

    fn handle_input(&mut self, input: TaskInput, _ctx: &mut StateContext<'_>) -> Flow {
        match input {
            TaskInput::Confirm => Flow::Terminate(Termination::Completed),
            _ => Flow::Stay,
        }
    }

    fn update(&mut self, _ctx: &mut StateContext<'_>) -> Flow {
        Flow::Stay
    }

    fn view(&self) -> TaskView {
        TaskView::Complete
    }

    fn exit(self, _ctx: &mut StateContext<'_>) {}
}

impl Exit {
    pub(crate) fn total_winnings(&self) -> u32 {
        self.total_winnings
    }
}

fn balloon_view(round: &RoundState, tally: &SessionTally) -> BalloonView {
    BalloonView {
        tier: round.tier(),
        pumps: round.pumps(),
        round_winnings: round.winnings(),
        total_winnings: tally.total_winnings(),
    }
}

/// The active task state.
#[derive(Debug)]
pub(crate) enum ActiveState {
    Start(Start),
    Setup(Setup),
    Play(Play),
    Popped(RoundEnd),
    Cashed(RoundEnd),
    Exit(Exit),
}

impl ActiveState {
    pub(crate) fn start(
        config: SessionConfig,
        ctx: &mut StateContext<'_>,
    ) -> Result<Self, TaskError> {
        Start::enter(config, ctx).map(Self::Start)
    }

    pub(crate) fn kind(&self) -> StateKind {
        match self {
            Self::Start(_) => StateKind::Start,
            Self::Setup(_) => StateKind::Setup,
            Self::Play(_) => StateKind::Play,
            Self::Popped(_) => StateKind::Popped,
            Self::Cashed(_) => StateKind::Cashed,
            Self::Exit(_) => StateKind::Exit,
        }
    }

    pub(crate) fn handle_input(&mut self, input: TaskInput, ctx: &mut StateContext<'_>) -> Flow {
        match self {
            Self::Start(state) => state.handle_input(input, ctx),
            Self::Setup(state) => state.handle_input(input, ctx),
            Self::Play(state) => state.handle_input(input, ctx),
            Self::Popped(state) | Self::Cashed(state) => state.handle_input(input, ctx),
            Self::Exit(state) => state.handle_input(input, ctx),
        }
    }

    pub(crate) fn update(&mut self, ctx: &mut StateContext<'_>) -> Flow {
        match self {
            Self::Start(state) => state.update(ctx),
            Self::Setup(state) => state.update(ctx),
            Self::Play(state) => state.update(ctx),
            Self::Popped(state) | Self::Cashed(state) => state.update(ctx),
            Self::Exit(state) => state.update(ctx),
        }
    }

    pub(crate) fn view(&self) -> TaskView {
        match self {
            Self::Start(state) => state.view(),
            Self::Setup(state) => state.view(),
            Self::Play(state) => state.view(),
            Self::Popped(state) | Self::Cashed(state) => state.view(),
            Self::Exit(state) => state.view(),
        }
    }

    /// Exits the state and enters its successor, handing over the exit payload.
    pub(crate) fn advance(self, ctx: &mut StateContext<'_>) -> Result<Self, TaskError> {
        match self {
            Self::Start(state) => {
                let config = state.exit(ctx);
                Setup::enter(config, ctx).map(Self::Setup)
            }
            Self::Setup(state) => {
                let session = state.exit(ctx);
                Play::enter(session, ctx).map(Self::Play)
            }
            Self::Play(state) => {
                let completed = state.exit(ctx);
                let round_end = RoundEnd::enter(completed, ctx)?;
                Ok(match round_end.outcome() {
                    RoundOutcome::Popped => Self::Popped(round_end),
                    RoundOutcome::Cashed => Self::Cashed(round_end),
                })
            }
            Self::Popped(state) | Self::Cashed(state) => {
                let more_rounds = state.remaining_rounds() > 0;
                let session = state.exit(ctx);
                if more_rounds {
                    Play::enter(session, ctx).map(Self::Play)
                } else {
                    Exit::enter(session, ctx).map(Self::Exit)
                }
            }
            Self::Exit(state) => Ok(Self::Exit(state)),
        }
    }

    /// Closes the session's sinks ahead of an abrupt termination.
    pub(crate) fn release(&mut self, events: &mut Vec<TaskEvent>) {
        let session = match self {
            Self::Start(_) | Self::Exit(_) => return,
            Self::Setup(state) => &mut state.session,
            Self::Play(state) => &mut state.session,
            Self::Popped(state) | Self::Cashed(state) => &mut state.session,
        };
        session.sinks.release(events);
    }

    pub(crate) fn round(&self) -> Option<&RoundState> {
        match self {
            Self::Play(state) => Some(&state.round),
            Self::Popped(state) | Self::Cashed(state) => Some(&state.round),
            Self::Start(_) | Self::Setup(_) | Self::Exit(_) => None,
        }
    }

    pub(crate) fn tally(&self) -> Option<SessionTally> {
        match self {
            Self::Setup(state) => Some(state.session.tally),
            Self::Play(state) => Some(state.session.tally),
            Self::Popped(state) | Self::Cashed(state) => Some(state.session.tally),
            Self::Start(_) | Self::Exit(_) => None,
        }
    }

    pub(crate) fn total_winnings(&self) -> u32 {
        match self {
            Self::Exit(state) => state.total_winnings(),
            other => other.tally().map_or(0, |tally| tally.total_winnings()),
        }
    }
}
