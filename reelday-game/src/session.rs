use chrono::NaiveDate;
use log::warn;
use rand::Rng;

use crate::keys::format_date;
use crate::state::{ActionError, Attempt, GameState, MediaKind, RawGameState};
use crate::storage::KeyValueStore;
use crate::store::StateStore;

/// A guess as submitted by the player, already judged against the day's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuessInput {
    pub title: String,
    pub subject_id: u64,
    pub media_kind: MediaKind,
    pub correct: bool,
}

/// Wall-clock source in epoch milliseconds.
pub type Clock = fn() -> i64;

fn system_clock() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One player's play of one day's challenge, bound to the store that persists it.
///
/// The state is created fresh in memory when nothing is stored and is only
/// written once the first action lands. Every action is saved before the call
/// returns, so saves reach the store in the order the actions happened.
pub struct DailySession<'a, S>
where
    S: KeyValueStore,
{
    store: &'a StateStore<S>,
    date: NaiveDate,
    state: GameState,
    clock: Clock,
}

impl<'a, S> DailySession<'a, S>
where
    S: KeyValueStore,
{
    /// Resume the stored progress for `date`, or start the day fresh.
    pub fn open(store: &'a StateStore<S>, date: NaiveDate) -> Self {
        Self::open_with_clock(store, date, system_clock)
    }

    pub fn open_with_clock(store: &'a StateStore<S>, date: NaiveDate, clock: Clock) -> Self {
        let state = store.load(date).unwrap_or_else(|| {
            GameState::with_policy(format_date(date), store.normalizer().policy())
        });
        Self {
            store,
            date,
            state,
            clock,
        }
    }

    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// True until the player has taken any action today.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.state.attempts == 0 && self.state.attempt_log.is_empty()
    }

    /// Log a guess and persist the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the day is already completed or the title is blank.
    pub fn guess(&mut self, guess: GuessInput) -> Result<Attempt, ActionError> {
        let attempt = Attempt::guess(
            self.next_attempt_id(),
            guess.title,
            guess.subject_id,
            guess.media_kind,
            guess.correct,
            (self.clock)(),
        );
        self.apply(attempt)
    }

    /// Skip to the next hint tier, spending an attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the day is already completed.
    pub fn skip(&mut self) -> Result<Attempt, ActionError> {
        let attempt = Attempt::skip(self.next_attempt_id(), (self.clock)());
        self.apply(attempt)
    }

    /// Pick up progress written by another session for the same day.
    ///
    /// The stored record is adopted only when it describes different progress
    /// and has logged more attempts than this session. Returns whether the
    /// in-memory state changed.
    pub fn refresh(&mut self) -> bool {
        let Some(stored) = self.store.load(self.date) else {
            return false;
        };
        let same_progress = self.store.normalizer().states_equivalent(
            Some(RawGameState::from(&stored)),
            Some(RawGameState::from(&self.state)),
        );
        if same_progress || stored.attempt_log.len() <= self.state.attempt_log.len() {
            return false;
        }
        self.state = stored;
        true
    }

    fn apply(&mut self, attempt: Attempt) -> Result<Attempt, ActionError> {
        let policy = *self.store.normalizer().policy();
        let attempt = self.state.record_attempt(&policy, attempt)?;
        match self.store.try_save(self.date, &self.state) {
            Ok(written) => self.state = written,
            Err(err) => warn!(
                "keeping unsaved progress for {}: {err}",
                format_date(self.date)
            ),
        }
        Ok(attempt)
    }

    fn next_attempt_id(&self) -> String {
        let suffix: u32 = rand::rng().random();
        format!(
            "{}-{}-{suffix:08x}",
            format_date(self.date),
            self.state.attempt_log.len() + 1
        )
    }
}
