//! Data handed from one task state to the next.
//!
//! Every transition edge has a named payload so the producing state's exit
//! and the consuming state's entry agree on its shape at compile time.

use bart_core::{
    ProbabilityTable, RiskSchedule, RoundRecord, SessionConfig, SessionResources, SinkError,
    SinkKind, TaskEvent, TrialLogger, TriggerCode, TriggerSink,
};
use tracing::{debug, warn};

use crate::round::{RoundState, SessionTally};

/// Session data threaded from setup through every round. Produced by Setup and
/// by the round-terminal states, consumed by Play and Exit.
#[derive(Debug)]
pub(crate) struct SessionData {
    pub(crate) config: SessionConfig,
    pub(crate) sinks: Sinks,
    pub(crate) probabilities: ProbabilityTable,
    pub(crate) schedule: RiskSchedule,
    pub(crate) tally: SessionTally,
}

/// Produced by Play when a round ends, consumed by Popped or Cashed.
#[derive(Debug)]
pub(crate) struct CompletedRound {
    pub(crate) session: SessionData,
    pub(crate) round: RoundState,
}

/// Trial logger and trigger channel held for the lifetime of a session.
///
/// Failures are reported as warnings and [`TaskEvent::SinkFailed`] events; the
/// session carries on. Both collaborators are closed exactly once, either
/// explicitly through [`Sinks::release`] or when the value is dropped.
pub(crate) struct Sinks {
    logger: Box<dyn TrialLogger>,
    trigger: Box<dyn TriggerSink>,
    released: bool,
}

impl Sinks {
    /// Splits opened session resources into the sinks and the probability table.
    pub(crate) fn from_resources(resources: SessionResources) -> (Self, ProbabilityTable) {
        let SessionResources {
            logger,
            trigger,
            probabilities,
        } = resources;
        let sinks = Self {
            logger,
            trigger,
            released: false,
        };
        (sinks, probabilities)
    }

    pub(crate) fn record(&mut self, record: &RoundRecord, events: &mut Vec<TaskEvent>) {
        if let Err(error) = self.logger.append(record) {
            report(SinkKind::TrialLog, &error, events);
        }
    }

    pub(crate) fn signal(&mut self, code: TriggerCode, events: &mut Vec<TaskEvent>) {
        match self.trigger.send(code) {
            Ok(()) => events.push(TaskEvent::TriggerSent { code }),
            Err(error) => report(SinkKind::Trigger, &error, events),
        }
    }

    /// Closes both collaborators; later calls are no-ops.
    pub(crate) fn release(&mut self, events: &mut Vec<TaskEvent>) {
        if self.released {
            return;
        }
        self.released = true;

        if let Err(error) = self.logger.close() {
            report(SinkKind::TrialLog, &error, events);
        }
        if let Err(error) = self.trigger.close() {
            report(SinkKind::Trigger, &error, events);
        }
        events.push(TaskEvent::ResourcesReleased);
    }
}

impl Drop for Sinks {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        debug!("releasing session sinks on drop");
        let mut discarded = Vec::new();
        self.release(&mut discarded);
    }
}

impl std::fmt::Debug for Sinks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sinks")
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

fn report(sink: SinkKind, error: &SinkError, events: &mut Vec<TaskEvent>) {
    warn!(%sink, %error, "sink failure; continuing session");
    events.push(TaskEvent::SinkFailed {
        sink,
        message: error.to_string(),
    });
}
