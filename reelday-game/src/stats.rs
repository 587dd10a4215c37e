//! Player statistics aggregated over stored days.
use chrono::{Days, NaiveDate};
use serde::Serialize;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, MAX_DISTRIBUTION_SLOTS};
use crate::keys::parse_date;
use crate::state::GameState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    /// Completed days, won or lost.
    pub played: u32,
    pub won: u32,
    /// Percentage of completed days that were won.
    pub win_rate: f64,
    /// Consecutive winning days ending today or yesterday.
    pub current_streak: u32,
    pub max_streak: u32,
    /// `guess_distribution[i]` counts wins that took `i + 1` attempts.
    pub guess_distribution: Vec<u32>,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            played: 0,
            won: 0,
            win_rate: 0.0,
            current_streak: 0,
            max_streak: 0,
            guess_distribution: vec![0; DEFAULT_MAX_ATTEMPTS as usize],
        }
    }
}

impl PlayerStats {
    /// Aggregate normalized states as of `today`.
    ///
    /// Games still in progress and records without a parseable date are
    /// ignored. A day with no completed record breaks a streak.
    #[must_use]
    pub fn from_states<'a, I>(states: I, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a GameState>,
    {
        let mut stats = Self::default();
        let mut finished: Vec<(NaiveDate, bool)> = Vec::new();

        for state in states {
            if !state.completed {
                continue;
            }
            let Some(date) = parse_date(&state.date) else {
                continue;
            };
            finished.push((date, state.won));
            stats.played += 1;
            if state.won {
                stats.won += 1;
                stats.record_win(state.attempts, state.max_attempts);
            }
        }

        if stats.played > 0 {
            stats.win_rate = f64::from(stats.won) * 100.0 / f64::from(stats.played);
        }

        finished.sort_unstable_by_key(|(date, _)| *date);
        finished.dedup_by_key(|(date, _)| *date);
        let mut run = 0;
        let mut last_win: Option<NaiveDate> = None;
        for (date, won) in &finished {
            if !won {
                run = 0;
                last_win = None;
                continue;
            }
            let consecutive = last_win
                .and_then(|prev| prev.checked_add_days(Days::new(1)))
                .is_some_and(|next| next == *date);
            run = if consecutive { run + 1 } else { 1 };
            last_win = Some(*date);
            stats.max_streak = stats.max_streak.max(run);
        }

        let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
        stats.current_streak = match last_win {
            Some(date) if date >= yesterday => run,
            _ => 0,
        };
        stats
    }

    fn record_win(&mut self, attempts: u32, max_attempts: u32) {
        let width = usize::try_from(max_attempts.clamp(1, MAX_DISTRIBUTION_SLOTS)).unwrap_or(1);
        if self.guess_distribution.len() < width {
            self.guess_distribution.resize(width, 0);
        }
        let slot = usize::try_from(attempts.max(1) - 1)
            .unwrap_or(usize::MAX)
            .min(self.guess_distribution.len() - 1);
        self.guess_distribution[slot] += 1;
    }
}
