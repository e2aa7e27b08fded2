//! Wall-clock driver for exam sessions.
//!
//! The session itself only knows about `tick(delta)`. These loops feed it
//! from a `tokio::time::interval` and, for interactive use, interleave
//! commands arriving on a channel.

use std::time::Duration;

use lms_core::model::{ExamResult, QuestionId};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior, interval};

use super::session::ExamSession;
use super::workflow::{ExamSessionService, TickReport};
use crate::error::ExamSessionError;

/// Tick cadence for the timer loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    pub period: Duration,
}

impl TimerConfig {
    pub const DEFAULT_PERIOD: Duration = Duration::from_secs(1);

    /// Zero periods are bumped to one millisecond.
    #[must_use]
    pub fn new(period: Duration) -> Self {
        Self {
            period: period.max(Duration::from_millis(1)),
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PERIOD)
    }
}

/// A user action sent to a session driven by `drive_session`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExamCommand {
    Select {
        question_id: QuestionId,
        option_index: usize,
    },
    GoTo(usize),
    Next,
    Previous,
    Submit,
}

/// Converts interval periods into whole elapsed seconds, carrying the
/// sub-second remainder to the next tick.
#[derive(Debug, Default)]
struct SecondCounter {
    carry_millis: u128,
}

impl SecondCounter {
    fn advance(&mut self, period: Duration) -> u64 {
        self.carry_millis += period.as_millis();
        let whole = self.carry_millis / 1000;
        self.carry_millis %= 1000;
        u64::try_from(whole).unwrap_or(u64::MAX)
    }
}

async fn ticker(period: Duration) -> Interval {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // the first tick completes immediately
    ticker.tick().await;
    ticker
}

fn ensure_running(session: &ExamSession) -> Result<(), ExamSessionError> {
    if session.is_terminal() {
        return Err(ExamSessionError::AlreadyTerminal(session.status()));
    }
    Ok(())
}

/// Tick the session until its time limit expires and return the recorded
/// result.
///
/// # Errors
///
/// Returns `AlreadyTerminal` for a finished session and `Scoring` if the
/// expiry submission could not be recorded.
pub async fn run_exam_timer(
    service: &ExamSessionService,
    session: &mut ExamSession,
    config: TimerConfig,
) -> Result<ExamResult, ExamSessionError> {
    ensure_running(session)?;
    let mut ticker = ticker(config.period).await;
    let mut seconds = SecondCounter::default();

    loop {
        ticker.tick().await;
        let delta = seconds.advance(config.period);
        if delta == 0 {
            continue;
        }
        if let TickReport::Expired(result) = service.tick(session, delta).await? {
            return Ok(result);
        }
    }
}

/// Run a session until it is submitted, expires or the command channel
/// closes.
///
/// Pending commands are handled before timer ticks. Rejected commands are
/// logged and leave the session unchanged. A closed channel abandons the
/// session and yields `Ok(None)`.
///
/// # Errors
///
/// Returns `AlreadyTerminal` for a finished session and `Scoring` if the
/// final submission could not be recorded.
pub async fn drive_session(
    service: &ExamSessionService,
    session: &mut ExamSession,
    mut commands: mpsc::Receiver<ExamCommand>,
    config: TimerConfig,
) -> Result<Option<ExamResult>, ExamSessionError> {
    ensure_running(session)?;
    let mut ticker = ticker(config.period).await;
    let mut seconds = SecondCounter::default();

    loop {
        tokio::select! {
            biased;

            command = commands.recv() => {
                let Some(command) = command else {
                    tracing::info!(
                        exam_id = %session.exam_id(),
                        answered = session.answered_count(),
                        "command channel closed, abandoning exam session"
                    );
                    return Ok(None);
                };
                if command == ExamCommand::Submit {
                    return service.submit(session).await.map(Some);
                }
                apply(session, command);
            }

            _ = ticker.tick() => {
                let delta = seconds.advance(config.period);
                if delta == 0 {
                    continue;
                }
                if let TickReport::Expired(result) = service.tick(session, delta).await? {
                    return Ok(Some(result));
                }
            }
        }
    }
}

fn apply(session: &mut ExamSession, command: ExamCommand) {
    let outcome = match command {
        ExamCommand::Select {
            question_id,
            option_index,
        } => session.select_answer(question_id, option_index),
        ExamCommand::GoTo(index) => session.go_to_question(index).map(|_| ()),
        ExamCommand::Next => session.next_question().map(|_| ()),
        ExamCommand::Previous => session.previous_question().map(|_| ()),
        ExamCommand::Submit => Ok(()),
    };

    match outcome {
        Ok(()) => tracing::debug!(
            exam_id = %session.exam_id(),
            ?command,
            current = session.current_index(),
            "exam command applied"
        ),
        Err(err) => tracing::warn!(
            exam_id = %session.exam_id(),
            ?command,
            error = %err,
            "exam command rejected"
        ),
    }
}
