#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative task controller for the Balloon Analogue Risk Task.
//!
//! The controller is a finite-state machine sequencing Start, Setup, Play,
//! Popped/Cashed and Exit. Adapters feed it [`TaskInput`] values through
//! [`apply`], advance it once per frame with [`tick`], and read presentation
//! snapshots through the [`query`] module. Every call appends the resulting
//! [`TaskEvent`] values to the caller's buffer.

mod payload;
mod round;
mod states;

use bart_core::{
    RandomSource, ResourceProvider, ScheduleError, SessionConfig, SetupError, StateKind,
    TaskEvent, TaskInput, Termination,
};
use thiserror::Error;
use tracing::{debug, info};

pub use round::{RoundState, SessionTally};

use self::states::{ActiveState, Flow, StateContext};

/// Errors that abort a session. These are configuration or programming faults;
/// sink failures during play are reported as events instead.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Session resources could not be acquired.
    #[error("session setup failed")]
    Setup(#[from] SetupError),
    /// The risk schedule could not be drawn.
    #[error("risk schedule could not be drawn")]
    Schedule(#[from] ScheduleError),
    /// The risk schedule has no tier for the round about to start.
    #[error("risk schedule has no tier for round {round}")]
    MissingRound {
        /// Zero-based index of the round.
        round: usize,
    },
    /// A round-terminal state was entered before the round ended.
    #[error("round-terminal state entered with an unfinished round")]
    UnfinishedRound,
}

/// Finite-state machine driving one participant session.
#[derive(Debug)]
pub struct TaskController<P, R> {
    provider: P,
    rng: R,
    state: Option<ActiveState>,
    previous: Option<StateKind>,
    viewport: Option<(u32, u32)>,
    termination: Option<Termination>,
}

impl<P, R> TaskController<P, R>
where
    P: ResourceProvider,
    R: RandomSource,
{
    /// Creates a controller for the session and enters the Start state.
    pub fn new(
        config: SessionConfig,
        provider: P,
        rng: R,
        out_events: &mut Vec<TaskEvent>,
    ) -> Result<Self, TaskError> {
        let mut controller = Self {
            provider,
            rng,
            state: None,
            previous: None,
            viewport: None,
            termination: None,
        };

        let mut ctx = StateContext {
            provider: &mut controller.provider,
            rng: &mut controller.rng,
            events: out_events,
        };
        let state = ActiveState::start(config, &mut ctx)?;
        out_events.push(TaskEvent::StateEntered {
            state: state.kind(),
            previous: None,
        });
        controller.state = Some(state);
        Ok(controller)
    }

    /// Consumes the controller, returning the resource provider and random source.
    pub fn into_parts(self) -> (P, R) {
        (self.provider, self.rng)
    }

    fn follow(&mut self, flow: Flow, out_events: &mut Vec<TaskEvent>) -> Result<(), TaskError> {
        match flow {
            Flow::Stay => Ok(()),
            Flow::Terminate(reason) => {
                self.terminate(reason, out_events);
                Ok(())
            }
            Flow::Advance => {
                let Some(current) = self.state.take() else {
                    return Ok(());
                };
                let previous = current.kind();
                let mut ctx = StateContext {
                    provider: &mut self.provider,
                    rng: &mut self.rng,
                    events: out_events,
                };
                let next = current.advance(&mut ctx)?;
                let kind = next.kind();
                info!(state = ?kind, previous = ?previous, "entered state");
                out_events.push(TaskEvent::StateEntered {
                    state: kind,
                    previous: Some(previous),
                });
                self.previous = Some(previous);
                self.state = Some(next);
                Ok(())
            }
        }
    }

    fn terminate(&mut self, reason: Termination, out_events: &mut Vec<TaskEvent>) {
        if let Some(mut state) = self.state.take() {
            state.release(out_events);
            self.previous = Some(state.kind());
        }
        info!(?reason, "session terminated");
        self.termination = Some(reason);
        out_events.push(TaskEvent::Terminated { reason });
    }
}

/// Dispatches one input to the controller.
///
/// Window close and resize are handled here for every state; all other input
/// is routed to the active state. Transitions complete before this returns.
/// Input received after termination is ignored.
pub fn apply<P, R>(
    controller: &mut TaskController<P, R>,
    input: TaskInput,
    out_events: &mut Vec<TaskEvent>,
) -> Result<(), TaskError>
where
    P: ResourceProvider,
    R: RandomSource,
{
    match input {
        TaskInput::Close => {
            if controller.state.is_some() {
                controller.terminate(Termination::Closed, out_events);
            }
            return Ok(());
        }
        TaskInput::Resize { width, height } => {
            controller.viewport = Some((width, height));
            out_events.push(TaskEvent::ViewportResized { width, height });
            return Ok(());
        }
        _ => {}
    }

    let Some(state) = controller.state.as_mut() else {
        debug!(?input, "ignoring input after termination");
        return Ok(());
    };
    let mut ctx = StateContext {
        provider: &mut controller.provider,
        rng: &mut controller.rng,
        events: out_events,
    };
    let flow = state.handle_input(input, &mut ctx);
    controller.follow(flow, out_events)
}

/// Runs the per-frame update of the active state, performing any transition it requests.
pub fn tick<P, R>(
    controller: &mut TaskController<P, R>,
    out_events: &mut Vec<TaskEvent>,
) -> Result<(), TaskError>
where
    P: ResourceProvider,
    R: RandomSource,
{
    let Some(state) = controller.state.as_mut() else {
        return Ok(());
    };
    let mut ctx = StateContext {
        provider: &mut controller.provider,
        rng: &mut controller.rng,
        events: out_events,
    };
    let flow = state.update(&mut ctx);
    controller.follow(flow, out_events)
}

/// Query functions that provide read-only access to the controller.
pub mod query {
    use bart_core::{StateKind, TaskView, Termination};

    use super::{RoundState, SessionTally, TaskController};

    /// Presentation snapshot of the active state; `None` once terminated.
    #[must_use]
    pub fn view<P, R>(controller: &TaskController<P, R>) -> Option<TaskView> {
        controller.state.as_ref().map(|state| state.view())
    }

    /// Identity of the active state; `None` once terminated.
    #[must_use]
    pub fn state<P, R>(controller: &TaskController<P, R>) -> Option<StateKind> {
        controller.state.as_ref().map(|state| state.kind())
    }

    /// Identity of the state that was active before the current one.
    #[must_use]
    pub fn previous_state<P, R>(controller: &TaskController<P, R>) -> Option<StateKind> {
        controller.previous
    }

    /// Round currently in progress or under review.
    #[must_use]
    pub fn round<P, R>(controller: &TaskController<P, R>) -> Option<&RoundState> {
        controller.state.as_ref().and_then(|state| state.round())
    }

    /// Session totals while a session is open.
    #[must_use]
    pub fn tally<P, R>(controller: &TaskController<P, R>) -> Option<SessionTally> {
        controller.state.as_ref().and_then(|state| state.tally())
    }

    /// Cumulative winnings so far; zero before setup and after termination.
    #[must_use]
    pub fn total_winnings<P, R>(controller: &TaskController<P, R>) -> u32 {
        controller
            .state
            .as_ref()
            .map_or(0, |state| state.total_winnings())
    }

    /// Most recent surface size reported by the input source.
    #[must_use]
    pub fn viewport<P, R>(controller: &TaskController<P, R>) -> Option<(u32, u32)> {
        controller.viewport
    }

    /// Why the session stopped, once it has.
    #[must_use]
    pub fn termination<P, R>(controller: &TaskController<P, R>) -> Option<Termination> {
        controller.termination
    }

    /// Whether the session has stopped and accepts no further input.
    #[must_use]
    pub fn is_terminated<P, R>(controller: &TaskController<P, R>) -> bool {
        controller.state.is_none()
    }
}
