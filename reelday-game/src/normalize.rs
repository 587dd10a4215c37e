//! Self-healing validation of persisted game state.
//!
//! [`StateNormalizer::normalize`] is the single authority on what a valid
//! [`GameState`] looks like. It never fails: every malformed field is coerced
//! to a safe value and the change is reported through [`Normalized::issues`].
//! Repairs run in a fixed order because later steps read fields the earlier
//! ones may have just rewritten.
use serde::Serialize;
use std::fmt::Display;

use crate::constants::{
    ISSUE_ATTEMPTS_PREFIX, ISSUE_BACKFILL_PREFIX, ISSUE_COMPLETED_PREFIX, ISSUE_HINT_PREFIX,
    ISSUE_LEGACY_DISCARDED_PREFIX, ISSUE_MALFORMED_ENTRIES_PREFIX, ISSUE_MAX_ATTEMPTS_PREFIX,
    ISSUE_NO_STATE, ISSUE_WON_PREFIX,
};
use crate::policy::GamePolicy;
use crate::state::{Attempt, GameState, LegacyGuess, RawGameState};

/// Outcome of a normalization pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Normalized {
    /// `None` only when there was no record to normalize.
    pub validated_state: Option<GameState>,
    pub was_fixed: bool,
    pub is_valid: bool,
    /// Human-readable description of every repair, in the order applied.
    pub issues: Vec<String>,
}

impl Normalized {
    fn absent() -> Self {
        Self {
            validated_state: None,
            was_fixed: false,
            is_valid: false,
            issues: vec![ISSUE_NO_STATE.to_string()],
        }
    }

    fn repaired(state: GameState, issues: Vec<String>) -> Self {
        let was_fixed = !issues.is_empty();
        Self {
            validated_state: Some(state),
            was_fixed,
            is_valid: !was_fixed,
            issues,
        }
    }
}

/// Pure repair pass parameterised by the active [`GamePolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateNormalizer {
    policy: GamePolicy,
}

impl StateNormalizer {
    #[must_use]
    pub const fn new(policy: GamePolicy) -> Self {
        Self { policy }
    }

    #[must_use]
    pub const fn policy(&self) -> &GamePolicy {
        &self.policy
    }

    /// Repair a possibly-malformed record.
    ///
    /// Absent input is reported as invalid but not fixed; callers treat it as
    /// "no saved state" rather than something to repair.
    #[must_use]
    pub fn normalize(&self, raw: Option<RawGameState>) -> Normalized {
        match raw {
            Some(raw) => {
                let (state, issues) = self.repair(raw);
                Normalized::repaired(state, issues)
            }
            None => Normalized::absent(),
        }
    }

    /// Run the ordered repair steps on a present record, returning the
    /// repaired state and the issues found.
    #[must_use]
    pub fn repair(&self, raw: RawGameState) -> (GameState, Vec<String>) {
        let mut issues = Vec::new();

        // 1. Upgrade the legacy guess list before anything reads the log.
        for (field, dropped) in [
            ("attemptLog", raw.discarded_attempts),
            ("guesses", raw.discarded_guesses),
        ] {
            if dropped > 0 {
                issues.push(format!("{ISSUE_MALFORMED_ENTRIES_PREFIX}: {dropped} from {field}"));
            }
        }
        let attempt_log = backfill_attempt_log(raw.attempt_log, raw.guesses, &mut issues);

        // 2. The count never understates the logged history.
        let logged = u32::try_from(attempt_log.len()).unwrap_or(u32::MAX);
        let attempts = raw.attempts.unwrap_or(0).max(logged);
        if raw.attempts != Some(attempts) {
            issues.push(format!(
                "{ISSUE_ATTEMPTS_PREFIX}: {} -> {attempts}",
                shown(raw.attempts)
            ));
        }

        // 3. Won means some logged guess hit.
        let won = attempt_log.iter().any(Attempt::is_winning);
        if raw.won != Some(won) {
            issues.push(format!("{ISSUE_WON_PREFIX}: {} -> {won}", shown(raw.won)));
        }

        // 4. A falsy ceiling is only written back in step 6, but completion is
        //    judged against the ceiling the record will end up with.
        let declared_max = raw.max_attempts.filter(|max| *max > 0);
        let max_attempts = declared_max.unwrap_or(self.policy.max_attempts);
        let completed = won || attempts >= max_attempts;
        if raw.completed != Some(completed) {
            issues.push(format!(
                "{ISSUE_COMPLETED_PREFIX}: {} -> {completed}",
                shown(raw.completed)
            ));
        }

        // 5. Finished games keep the tier the player last saw.
        let current_hint_level = match (completed, raw.current_hint_level) {
            (true, Some(level)) => self.policy.clamp_hint_level(level),
            _ => self.policy.hint_level_for(attempts),
        };
        if raw.current_hint_level != Some(current_hint_level) {
            issues.push(format!(
                "{ISSUE_HINT_PREFIX}: {} -> {current_hint_level}",
                shown(raw.current_hint_level)
            ));
        }

        // 6. Fill a falsy ceiling from the policy.
        if declared_max.is_none() {
            issues.push(format!(
                "{ISSUE_MAX_ATTEMPTS_PREFIX}: {} -> {max_attempts}",
                shown(raw.max_attempts)
            ));
        }

        let state = GameState {
            date: raw.date.unwrap_or_default(),
            attempts,
            max_attempts,
            attempt_log,
            completed,
            won,
            current_hint_level,
        };
        (state, issues)
    }

    /// Normalize an arbitrary JSON value; `null` counts as absent.
    #[must_use]
    pub fn normalize_value(&self, value: serde_json::Value) -> Normalized {
        self.normalize(RawGameState::from_value(value))
    }

    /// Normalize an in-memory state, e.g. before persisting it.
    #[must_use]
    pub fn normalize_state(&self, state: &GameState) -> Normalized {
        self.normalize(Some(RawGameState::from(state)))
    }

    /// True when the record needed no repairs at all.
    #[must_use]
    pub fn is_valid(&self, raw: Option<RawGameState>) -> bool {
        self.normalize(raw).is_valid
    }

    /// The repaired record without the diagnostic report.
    #[must_use]
    pub fn normalized_only(&self, raw: Option<RawGameState>) -> Option<GameState> {
        self.normalize(raw).validated_state
    }

    /// Whether two snapshots describe the same game progress.
    ///
    /// Both sides are normalized first; only the progress fields and the
    /// attempt-log length are compared, so timestamp jitter and field order
    /// do not matter. Two absent snapshots are equivalent, one absent is not.
    #[must_use]
    pub fn states_equivalent(&self, a: Option<RawGameState>, b: Option<RawGameState>) -> bool {
        match (self.normalized_only(a), self.normalized_only(b)) {
            (Some(a), Some(b)) => {
                a.attempts == b.attempts
                    && a.completed == b.completed
                    && a.won == b.won
                    && a.current_hint_level == b.current_hint_level
                    && a.attempt_log.len() == b.attempt_log.len()
            }
            (None, None) => true,
            _ => false,
        }
    }
}

fn backfill_attempt_log(
    attempt_log: Option<Vec<Attempt>>,
    guesses: Option<Vec<LegacyGuess>>,
    issues: &mut Vec<String>,
) -> Vec<Attempt> {
    let attempt_log = attempt_log.unwrap_or_default();
    let guesses = guesses.unwrap_or_default();
    if guesses.is_empty() {
        return attempt_log;
    }
    if attempt_log.is_empty() {
        issues.push(format!(
            "{ISSUE_BACKFILL_PREFIX}: {} entries",
            guesses.len()
        ));
        return guesses.into_iter().map(Attempt::from).collect();
    }
    // Partially migrated record: the attempt log is authoritative.
    if guesses.len() != attempt_log.len() {
        issues.push(format!(
            "{ISSUE_LEGACY_DISCARDED_PREFIX}: {} guesses vs {} logged attempts",
            guesses.len(),
            attempt_log.len()
        ));
    }
    attempt_log
}

fn shown<T: Display>(value: Option<T>) -> String {
    value.map_or_else(|| "missing".to_string(), |v| v.to_string())
}

/// [`StateNormalizer::normalize`] under the default policy.
#[must_use]
pub fn normalize(raw: Option<RawGameState>) -> Normalized {
    StateNormalizer::default().normalize(raw)
}

/// [`StateNormalizer::is_valid`] under the default policy.
#[must_use]
pub fn is_valid(raw: Option<RawGameState>) -> bool {
    StateNormalizer::default().is_valid(raw)
}

/// [`StateNormalizer::normalized_only`] under the default policy.
#[must_use]
pub fn normalized_only(raw: Option<RawGameState>) -> Option<GameState> {
    StateNormalizer::default().normalized_only(raw)
}

/// [`StateNormalizer::states_equivalent`] under the default policy.
#[must_use]
pub fn states_equivalent(a: Option<RawGameState>, b: Option<RawGameState>) -> bool {
    StateNormalizer::default().states_equivalent(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AttemptKind, MediaKind};
    use serde_json::{Value, json};

    fn raw(value: Value) -> Option<RawGameState> {
        RawGameState::from_value(value)
    }

    fn legacy_guess(id: &str, correct: bool, timestamp: i64) -> Value {
        json!({
            "id": id,
            "title": format!("Title {id}"),
            "tmdbId": 5,
            "mediaType": "movie",
            "correct": correct,
            "timestamp": timestamp
        })
    }

    #[test]
    fn absent_input_is_invalid_but_not_fixed() {
        let result = normalize(None);
        assert!(!result.is_valid);
        assert!(!result.was_fixed);
        assert!(result.validated_state.is_none());
        assert!(normalize(raw(json!(null))).validated_state.is_none());
    }

    #[test]
    fn single_legacy_guess_scenario() {
        let result = normalize(raw(json!({
            "attempts": 1,
            "maxAttempts": 3,
            "guesses": [legacy_guess("a", false, 1000)],
            "completed": false,
            "won": false,
            "currentHintLevel": 1
        })));
        let state = result.validated_state.clone().unwrap();
        assert_eq!(state.attempt_log.len(), 1);
        let attempt = &state.attempt_log[0];
        assert_eq!(attempt.kind, AttemptKind::Guess);
        assert_eq!(attempt.id, "a");
        assert_eq!(attempt.title, "Title a");
        assert_eq!(attempt.subject_id, 5);
        assert_eq!(attempt.media_kind, MediaKind::Movie);
        assert_eq!(attempt.timestamp, 1000);
        assert!(!attempt.correct);
        assert_eq!(state.attempts, 1);
        assert!(!state.won);
        assert!(!state.completed);
        assert_eq!(state.current_hint_level, 2);
        assert!(result.was_fixed);
        assert!(!result.is_valid);
        assert!(result.issues[0].starts_with(ISSUE_BACKFILL_PREFIX));
    }

    #[test]
    fn backfill_carries_win_into_completion() {
        let result = normalize(raw(json!({
            "attemptLog": [],
            "guesses": [legacy_guess("g1", true, 10), legacy_guess("g2", false, 20)],
            "maxAttempts": 3
        })));
        let state = result.validated_state.unwrap();
        assert_eq!(state.attempt_log.len(), 2);
        assert!(state.attempt_log[0].correct);
        assert!(!state.attempt_log[1].correct);
        assert_eq!(state.attempts, 2);
        assert!(state.won);
        assert!(state.completed);
    }

    #[test]
    fn missing_max_attempts_is_defaulted() {
        let result = normalize(raw(json!({
            "attempts": 0,
            "attemptLog": [],
            "completed": false,
            "won": false,
            "currentHintLevel": 1
        })));
        assert_eq!(result.validated_state.unwrap().max_attempts, 3);
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].starts_with(ISSUE_MAX_ATTEMPTS_PREFIX));
    }

    #[test]
    fn zero_max_attempts_counts_as_missing() {
        let result = normalize(raw(json!({
            "attempts": 3,
            "maxAttempts": 0,
            "attemptLog": [],
            "completed": false,
            "won": false,
            "currentHintLevel": 3
        })));
        let state = result.validated_state.unwrap();
        assert_eq!(state.max_attempts, 3);
        assert!(state.completed, "completion judged against the filled ceiling");
        assert_eq!(state.current_hint_level, 3);
    }

    #[test]
    fn valid_state_needs_no_repairs() {
        let input = json!({
            "date": "2024-05-01",
            "attempts": 1,
            "maxAttempts": 3,
            "attemptLog": [{"id": "s", "kind": "skip", "timestamp": 1}],
            "completed": false,
            "won": false,
            "currentHintLevel": 2
        });
        let result = normalize(raw(input));
        assert!(result.is_valid);
        assert!(!result.was_fixed);
        assert!(result.issues.is_empty());
        assert_eq!(result.validated_state.unwrap().date, "2024-05-01");
    }

    #[test]
    fn attempts_never_understate_the_log() {
        let result = normalize(raw(json!({
            "attempts": 0,
            "maxAttempts": 3,
            "attemptLog": [
                {"id": "1", "kind": "skip"},
                {"id": "2", "kind": "guess", "title": "Up", "correct": false}
            ],
            "completed": false,
            "won": false,
            "currentHintLevel": 1
        })));
        let state = result.validated_state.unwrap();
        assert_eq!(state.attempts, 2);
        assert_eq!(state.current_hint_level, 3);
        assert_eq!(result.issues.len(), 2);
    }

    #[test]
    fn declared_attempts_above_log_are_kept() {
        let state = normalized_only(raw(json!({
            "attempts": 2,
            "maxAttempts": 3,
            "attemptLog": [],
            "completed": false,
            "won": false,
            "currentHintLevel": 3
        })))
        .unwrap();
        assert_eq!(state.attempts, 2);
        assert!(!state.completed);
    }

    #[test]
    fn stale_won_flag_is_cleared() {
        let state = normalized_only(raw(json!({
            "attempts": 1,
            "maxAttempts": 3,
            "attemptLog": [{"id": "1", "kind": "skip", "correct": true}],
            "completed": true,
            "won": true,
            "currentHintLevel": 2
        })))
        .unwrap();
        assert!(!state.won);
        assert!(!state.completed);
        assert_eq!(state.current_hint_level, 2);
    }

    #[test]
    fn completed_game_keeps_last_seen_hint_level() {
        let result = normalize(raw(json!({
            "attempts": 1,
            "maxAttempts": 3,
            "attemptLog": [{"id": "1", "kind": "guess", "title": "Heat", "correct": true}],
            "completed": true,
            "won": true,
            "currentHintLevel": 1
        })));
        assert!(result.is_valid);
        assert_eq!(result.validated_state.unwrap().current_hint_level, 1);
    }

    #[test]
    fn completed_game_without_hint_level_derives_one() {
        let state = normalized_only(raw(json!({
            "attempts": 3,
            "maxAttempts": 3,
            "attemptLog": [],
            "completed": true,
            "won": false
        })))
        .unwrap();
        assert_eq!(state.current_hint_level, 3);
    }

    #[test]
    fn out_of_range_hint_level_is_clamped_even_when_completed() {
        let state = normalized_only(raw(json!({
            "attempts": 3,
            "maxAttempts": 3,
            "attemptLog": [],
            "completed": true,
            "won": false,
            "currentHintLevel": 9
        })))
        .unwrap();
        assert_eq!(state.current_hint_level, 3);
    }

    #[test]
    fn partially_migrated_record_prefers_attempt_log() {
        let result = normalize(raw(json!({
            "attempts": 1,
            "maxAttempts": 3,
            "attemptLog": [{"id": "1", "kind": "skip"}],
            "guesses": [legacy_guess("a", true, 1), legacy_guess("b", false, 2)],
            "completed": false,
            "won": false,
            "currentHintLevel": 2
        })));
        let state = result.validated_state.unwrap();
        assert_eq!(state.attempt_log.len(), 1);
        assert!(!state.won);
        assert_eq!(result.issues.len(), 1);
        assert!(result.issues[0].starts_with(ISSUE_LEGACY_DISCARDED_PREFIX));
    }

    #[test]
    fn null_fields_inside_entries_keep_a_finished_game_won() {
        let result = normalize(raw(json!({
            "date": "2024-05-01",
            "attempts": 1,
            "maxAttempts": 3,
            "attemptLog": [{
                "id": "w", "kind": "guess", "title": "Heat", "subjectId": null,
                "mediaKind": null, "correct": true, "timestamp": 4
            }],
            "completed": true,
            "won": true,
            "currentHintLevel": 1
        })));
        let state = result.validated_state.unwrap();
        assert_eq!(state.attempt_log.len(), 1);
        assert!(state.won);
        assert!(state.completed);
        assert!(result.is_valid, "unexpected issues: {:?}", result.issues);

        let legacy = normalized_only(raw(json!({
            "attempts": 1,
            "maxAttempts": 3,
            "guesses": [{"id": "a", "title": null, "tmdbId": 949,
                         "mediaType": "movie", "correct": true, "timestamp": 9}],
            "completed": true,
            "won": true,
            "currentHintLevel": 1
        })))
        .unwrap();
        assert_eq!(legacy.attempt_log.len(), 1);
        assert!(legacy.won);
        assert!(legacy.completed);
    }

    #[test]
    fn unreadable_log_entries_are_reported() {
        let result = normalize(raw(json!({
            "date": "2024-05-01",
            "attempts": 1,
            "maxAttempts": 3,
            "attemptLog": [{"id": "s", "kind": "skip", "timestamp": 1}, 42, "junk"],
            "completed": false,
            "won": false,
            "currentHintLevel": 2
        })));
        assert!(!result.is_valid);
        assert!(result.was_fixed);
        assert_eq!(
            result.issues,
            vec![format!("{ISSUE_MALFORMED_ENTRIES_PREFIX}: 2 from attemptLog")]
        );
        assert_eq!(result.validated_state.unwrap().attempt_log.len(), 1);

        let legacy = normalize(raw(json!({"guesses": [null, legacy_guess("a", false, 1)]})));
        assert_eq!(
            legacy.issues[0],
            format!("{ISSUE_MALFORMED_ENTRIES_PREFIX}: 1 from guesses")
        );
    }

    #[test]
    fn empty_object_is_fully_defaulted() {
        let result = normalize(raw(json!({})));
        let state = result.validated_state.unwrap();
        assert_eq!(state, GameState::default());
        assert_eq!(result.issues.len(), 5);
    }

    #[test]
    fn output_is_a_fixed_point() {
        let first = normalize(raw(json!({
            "attempts": "7",
            "guesses": [legacy_guess("a", false, 3)],
            "currentHintLevel": 0
        })));
        let second = StateNormalizer::default().normalize_state(&first.validated_state.unwrap());
        assert!(!second.was_fixed, "unexpected issues: {:?}", second.issues);
    }

    #[test]
    fn equivalence_ignores_timestamp_jitter() {
        let a = raw(json!({
            "attempts": 1, "maxAttempts": 3, "completed": false, "won": false,
            "currentHintLevel": 2,
            "attemptLog": [{"id": "x", "kind": "skip", "timestamp": 1000}]
        }));
        let b = raw(json!({
            "currentHintLevel": 2, "won": false, "completed": false, "maxAttempts": 3,
            "attempts": 1,
            "attemptLog": [{"id": "y", "kind": "skip", "timestamp": 1017}]
        }));
        assert!(states_equivalent(a.clone(), b));
        assert!(!states_equivalent(a, raw(json!({"attempts": 2}))));
        assert!(states_equivalent(None, None));
        assert!(!states_equivalent(None, raw(json!({}))));
    }

    #[test]
    fn custom_policy_ceiling_applies_to_missing_field() {
        let normalizer = StateNormalizer::new(GamePolicy {
            max_attempts: 5,
            ..GamePolicy::default()
        });
        let state = normalizer
            .normalized_only(raw(json!({"attempts": 3})))
            .unwrap();
        assert_eq!(state.max_attempts, 5);
        assert!(!state.completed);
        assert!(is_valid(Some(RawGameState::from(GameState::new("2024-01-01")))));
    }
}
