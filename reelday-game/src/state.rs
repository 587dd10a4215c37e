use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, MIN_HINT_LEVEL};
use crate::policy::GamePolicy;

/// What a logged attempt did to the daily puzzle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AttemptKind {
    #[default]
    Guess,
    Skip,
}

impl AttemptKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Guess => "guess",
            Self::Skip => "skip",
        }
    }
}

impl fmt::Display for AttemptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Catalog section the guessed title belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Movie,
    #[serde(alias = "tv")]
    Series,
}

impl MediaKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Series => "series",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged player action against the daily puzzle.
///
/// Older clients wrote `type`, `tmdbId` and `mediaType`; those names are still
/// accepted on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attempt {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub id: String,
    #[serde(default, alias = "type", deserialize_with = "lenient::or_default")]
    pub kind: AttemptKind,
    /// Only meaningful for [`AttemptKind::Guess`].
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub correct: bool,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub title: String,
    #[serde(default, alias = "tmdbId", deserialize_with = "lenient::catalog_id")]
    pub subject_id: u64,
    #[serde(default, alias = "mediaType", deserialize_with = "lenient::or_default")]
    pub media_kind: MediaKind,
    /// Creation instant in epoch milliseconds.
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub timestamp: i64,
}

impl Attempt {
    #[must_use]
    pub fn guess(
        id: impl Into<String>,
        title: impl Into<String>,
        subject_id: u64,
        media_kind: MediaKind,
        correct: bool,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            kind: AttemptKind::Guess,
            correct,
            title: title.into(),
            subject_id,
            media_kind,
            timestamp,
        }
    }

    #[must_use]
    pub fn skip(id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            id: id.into(),
            kind: AttemptKind::Skip,
            correct: false,
            title: String::new(),
            subject_id: 0,
            media_kind: MediaKind::default(),
            timestamp,
        }
    }

    /// True only for a guess that matched the day's answer.
    #[must_use]
    pub fn is_winning(&self) -> bool {
        self.kind == AttemptKind::Guess && self.correct
    }
}

/// Guess entry from the pre-attempt-log schema (no skips were recorded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyGuess {
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub title: String,
    #[serde(
        default,
        rename = "tmdbId",
        alias = "subjectId",
        deserialize_with = "lenient::catalog_id"
    )]
    pub tmdb_id: u64,
    #[serde(
        default,
        rename = "mediaType",
        alias = "mediaKind",
        deserialize_with = "lenient::or_default"
    )]
    pub media_type: MediaKind,
    #[serde(default, deserialize_with = "lenient::or_default")]
    pub correct: bool,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub timestamp: i64,
}

impl From<LegacyGuess> for Attempt {
    fn from(guess: LegacyGuess) -> Self {
        Self::guess(
            guess.id,
            guess.title,
            guess.tmdb_id,
            guess.media_type,
            guess.correct,
            guess.timestamp,
        )
    }
}

/// Errors raised when a player action cannot be applied to a day's state.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("the challenge for {date} is already completed")]
    AlreadyCompleted { date: String },
    #[error("a guess needs a non-empty title")]
    EmptyTitle,
}

/// Full progress record for one calendar day of play.
///
/// Every field is guaranteed present; values that arrive from storage go
/// through [`RawGameState`] and the normalizer before they become one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    /// Challenge calendar key, `YYYY-MM-DD`.
    pub date: String,
    pub attempts: u32,
    pub max_attempts: u32,
    pub attempt_log: Vec<Attempt>,
    pub completed: bool,
    pub won: bool,
    pub current_hint_level: u32,
}

impl GameState {
    /// Fresh record for the first time a player opens a day's challenge.
    #[must_use]
    pub fn new(date: impl Into<String>) -> Self {
        Self::with_policy(date, &GamePolicy::default())
    }

    #[must_use]
    pub fn with_policy(date: impl Into<String>, policy: &GamePolicy) -> Self {
        Self {
            date: date.into(),
            attempts: 0,
            max_attempts: policy.max_attempts,
            attempt_log: Vec::new(),
            completed: false,
            won: false,
            current_hint_level: policy.hint_level_for(0),
        }
    }

    #[must_use]
    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempts)
    }

    #[must_use]
    pub fn last_timestamp(&self) -> Option<i64> {
        self.attempt_log.last().map(|attempt| attempt.timestamp)
    }

    #[must_use]
    pub fn guess_count(&self) -> usize {
        self.attempt_log
            .iter()
            .filter(|attempt| attempt.kind == AttemptKind::Guess)
            .count()
    }

    /// Append a player action and advance the derived flags.
    ///
    /// The attempt's timestamp is raised to the last logged one if it would
    /// otherwise move backwards.
    ///
    /// # Errors
    ///
    /// Returns an error if the game is already completed or a guess has an
    /// empty title.
    pub fn record_attempt(
        &mut self,
        policy: &GamePolicy,
        mut attempt: Attempt,
    ) -> Result<Attempt, ActionError> {
        if self.completed {
            return Err(ActionError::AlreadyCompleted {
                date: self.date.clone(),
            });
        }
        if attempt.kind == AttemptKind::Guess && attempt.title.trim().is_empty() {
            return Err(ActionError::EmptyTitle);
        }
        if let Some(last) = self.last_timestamp() {
            attempt.timestamp = attempt.timestamp.max(last);
        }

        let winning = attempt.is_winning();
        self.attempt_log.push(attempt.clone());
        let logged = u32::try_from(self.attempt_log.len()).unwrap_or(u32::MAX);
        self.attempts = self.attempts.saturating_add(1).max(logged);
        self.won |= winning;
        if self.max_attempts == 0 {
            self.max_attempts = policy.max_attempts;
        }
        self.completed = self.won || self.attempts >= self.max_attempts;
        if !self.completed {
            self.current_hint_level = policy.hint_level_for(self.attempts);
        }

        Ok(attempt)
    }
}

/// A persisted record as it may exist at rest: every field optional, legacy
/// `guesses` allowed, malformed values dropped to `None` instead of failing
/// the whole record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct RawGameState {
    pub date: Option<String>,
    pub attempts: Option<u32>,
    pub max_attempts: Option<u32>,
    pub attempt_log: Option<Vec<Attempt>>,
    pub guesses: Option<Vec<LegacyGuess>>,
    pub completed: Option<bool>,
    pub won: Option<bool>,
    pub current_hint_level: Option<u32>,
    /// `attemptLog` entries that were not attempts at all and were dropped.
    pub discarded_attempts: u32,
    /// Same for the legacy `guesses` list.
    pub discarded_guesses: u32,
}

/// Wire shape of a stored record before log entries are read one by one.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    #[serde(default, deserialize_with = "lenient::field")]
    date: Option<String>,
    #[serde(default, deserialize_with = "lenient::count")]
    attempts: Option<u32>,
    #[serde(default, deserialize_with = "lenient::count")]
    max_attempts: Option<u32>,
    #[serde(default, deserialize_with = "lenient::array")]
    attempt_log: Option<Vec<serde_json::Value>>,
    #[serde(default, deserialize_with = "lenient::array")]
    guesses: Option<Vec<serde_json::Value>>,
    #[serde(default, deserialize_with = "lenient::field")]
    completed: Option<bool>,
    #[serde(default, deserialize_with = "lenient::field")]
    won: Option<bool>,
    #[serde(default, deserialize_with = "lenient::count")]
    current_hint_level: Option<u32>,
}

impl From<StoredRecord> for RawGameState {
    fn from(record: StoredRecord) -> Self {
        let (attempt_log, discarded_attempts) = lenient::salvage(record.attempt_log);
        let (guesses, discarded_guesses) = lenient::salvage(record.guesses);
        Self {
            date: record.date,
            attempts: record.attempts,
            max_attempts: record.max_attempts,
            attempt_log,
            guesses,
            completed: record.completed,
            won: record.won,
            current_hint_level: record.current_hint_level,
            discarded_attempts,
            discarded_guesses,
        }
    }
}

impl RawGameState {
    /// Interpret any JSON value as a stored record.
    ///
    /// `null` means there is no record. Any other non-object value yields an
    /// empty record, leaving every field for the normalizer to fill.
    #[must_use]
    pub fn from_value(value: serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::Null => None,
            value @ serde_json::Value::Object(_) => {
                Some(serde_json::from_value(value).unwrap_or_default())
            }
            _ => Some(Self::default()),
        }
    }

    /// Parse a stored JSON blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not JSON at all.
    pub fn from_json(json: &str) -> Result<Option<Self>, serde_json::Error> {
        serde_json::from_str::<serde_json::Value>(json).map(Self::from_value)
    }
}

impl From<GameState> for RawGameState {
    fn from(state: GameState) -> Self {
        Self {
            date: Some(state.date),
            attempts: Some(state.attempts),
            max_attempts: Some(state.max_attempts),
            attempt_log: Some(state.attempt_log),
            guesses: None,
            completed: Some(state.completed),
            won: Some(state.won),
            current_hint_level: Some(state.current_hint_level),
            discarded_attempts: 0,
            discarded_guesses: 0,
        }
    }
}

impl From<&GameState> for RawGameState {
    fn from(state: &GameState) -> Self {
        Self::from(state.clone())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            date: String::new(),
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            attempt_log: Vec::new(),
            completed: false,
            won: false,
            current_hint_level: MIN_HINT_LEVEL,
        }
    }
}

mod lenient {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn field<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).ok())
    }

    pub fn array<'de, D>(deserializer: D) -> Result<Option<Vec<Value>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Array(items) => Ok(Some(items)),
            _ => Ok(None),
        }
    }

    /// Null or a value of the wrong type reads as `T::default()`.
    pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned + Default,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// Keeps the object entries that read as `T` and counts the rest.
    pub fn salvage<T: DeserializeOwned>(items: Option<Vec<Value>>) -> (Option<Vec<T>>, u32) {
        let Some(items) = items else {
            return (None, 0);
        };
        let mut discarded = 0_u32;
        let kept = items
            .into_iter()
            .filter_map(|item| {
                let parsed = item
                    .is_object()
                    .then(|| serde_json::from_value(item).ok())
                    .flatten();
                if parsed.is_none() {
                    discarded = discarded.saturating_add(1);
                }
                parsed
            })
            .collect();
        (Some(kept), discarded)
    }

    pub fn count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(count_from_value(&value))
    }

    pub fn catalog_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match &value {
            Value::Number(n) => n.as_u64().unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    pub fn timestamp<'de, D>(deserializer: D) -> Result<i64, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(match &value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
                .unwrap_or(0),
            Value::String(s) => s.trim().parse().unwrap_or(0),
            _ => 0,
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn count_from_value(value: &Value) -> Option<u32> {
        match value {
            Value::Number(n) => n
                .as_u64()
                .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite() && *f >= 0.0)
                        .map(|f| f.trunc().min(f64::from(u32::MAX)) as u32)
                }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn legacy_attempt_field_names_still_parse() {
        let attempt: Attempt = serde_json::from_value(json!({
            "id": "a1",
            "type": "guess",
            "title": "Heat",
            "tmdbId": 949,
            "mediaType": "tv",
            "correct": true,
            "timestamp": 1_000
        }))
        .unwrap();
        assert_eq!(attempt.kind, AttemptKind::Guess);
        assert_eq!(attempt.subject_id, 949);
        assert_eq!(attempt.media_kind, MediaKind::Series);
        assert!(attempt.is_winning());
    }

    #[test]
    fn attempt_serializes_current_field_names() {
        let attempt = Attempt::skip("s1", 42);
        let value = serde_json::to_value(&attempt).unwrap();
        assert_eq!(value["kind"], "skip");
        assert_eq!(value["subjectId"], 0);
        assert_eq!(value["mediaKind"], "movie");
        assert!(value.get("type").is_none());
    }

    #[test]
    fn skip_marked_correct_is_not_a_win() {
        let mut skip = Attempt::skip("s1", 1);
        skip.correct = true;
        assert!(!skip.is_winning());
    }

    #[test]
    fn raw_state_drops_malformed_fields_individually() {
        let raw = RawGameState::from_value(json!({
            "date": "2024-05-01",
            "attempts": "two",
            "maxAttempts": 3.0,
            "won": "yes",
            "completed": false,
            "currentHintLevel": -4,
            "attemptLog": [
                {"id": "ok", "kind": "skip", "timestamp": 5},
                17,
                {"id": "bad-kind", "kind": "pass"}
            ]
        }))
        .unwrap();
        assert_eq!(raw.date.as_deref(), Some("2024-05-01"));
        assert_eq!(raw.attempts, None);
        assert_eq!(raw.max_attempts, Some(3));
        assert_eq!(raw.won, None);
        assert_eq!(raw.completed, Some(false));
        assert_eq!(raw.current_hint_level, None);
        assert_eq!(raw.discarded_attempts, 1);
        let log = raw.attempt_log.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].id, "ok");
        assert_eq!(log[1].id, "bad-kind");
        assert_eq!(log[1].kind, AttemptKind::Guess);
    }

    #[test]
    fn null_entry_fields_fall_back_to_defaults() {
        let raw = RawGameState::from_value(json!({
            "attemptLog": [{
                "id": null, "kind": "guess", "title": "Heat", "subjectId": null,
                "mediaKind": null, "correct": true, "timestamp": null
            }],
            "guesses": [{
                "id": 7, "title": null, "tmdbId": 949, "mediaType": null,
                "correct": true, "timestamp": 3
            }]
        }))
        .unwrap();
        assert_eq!(raw.discarded_attempts, 0);
        assert_eq!(raw.discarded_guesses, 0);
        let attempt = &raw.attempt_log.unwrap()[0];
        assert_eq!(attempt.id, "");
        assert_eq!(attempt.media_kind, MediaKind::Movie);
        assert!(attempt.is_winning());
        let guess = &raw.guesses.unwrap()[0];
        assert_eq!(guess.title, "");
        assert_eq!(guess.tmdb_id, 949);
        assert!(guess.correct);
    }

    #[test]
    fn raw_state_null_is_absent_and_scalars_are_empty() {
        assert!(RawGameState::from_value(json!(null)).is_none());
        assert_eq!(
            RawGameState::from_value(json!(42)),
            Some(RawGameState::default())
        );
        assert!(RawGameState::from_json("not json").is_err());
    }

    #[test]
    fn numeric_strings_coerce_to_counts() {
        let raw = RawGameState::from_value(json!({"attempts": " 2 ", "currentHintLevel": 2.9}))
            .unwrap();
        assert_eq!(raw.attempts, Some(2));
        assert_eq!(raw.current_hint_level, Some(2));
    }

    #[test]
    fn record_attempt_advances_hint_and_completion() {
        let policy = GamePolicy::default();
        let mut state = GameState::new("2024-05-01");
        state
            .record_attempt(&policy, Attempt::skip("s1", 100))
            .unwrap();
        assert_eq!(state.attempts, 1);
        assert_eq!(state.current_hint_level, 2);
        assert!(!state.completed);

        state
            .record_attempt(
                &policy,
                Attempt::guess("g1", "Alien", 348, MediaKind::Movie, false, 50),
            )
            .unwrap();
        assert_eq!(state.attempts, 2);
        assert_eq!(state.current_hint_level, 3);
        assert_eq!(state.attempt_log[1].timestamp, 100);

        state
            .record_attempt(
                &policy,
                Attempt::guess("g2", "Aliens", 679, MediaKind::Movie, true, 200),
            )
            .unwrap();
        assert!(state.won);
        assert!(state.completed);
        assert_eq!(state.current_hint_level, 3);
        assert_eq!(state.remaining_attempts(), 0);
    }

    #[test]
    fn completed_game_rejects_further_attempts() {
        let policy = GamePolicy::default();
        let mut state = GameState::new("2024-05-01");
        state
            .record_attempt(
                &policy,
                Attempt::guess("g1", "Heat", 949, MediaKind::Movie, true, 1),
            )
            .unwrap();
        let err = state
            .record_attempt(&policy, Attempt::skip("s1", 2))
            .unwrap_err();
        assert_eq!(
            err,
            ActionError::AlreadyCompleted {
                date: "2024-05-01".to_string()
            }
        );
        assert_eq!(state.attempt_log.len(), 1);
    }

    #[test]
    fn blank_guess_title_is_rejected() {
        let mut state = GameState::new("2024-05-01");
        let err = state
            .record_attempt(
                &GamePolicy::default(),
                Attempt::guess("g1", "   ", 1, MediaKind::Movie, false, 1),
            )
            .unwrap_err();
        assert_eq!(err, ActionError::EmptyTitle);
        assert_eq!(state.attempts, 0);
    }
}
