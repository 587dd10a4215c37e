//! Game rules every normalized state is measured against.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DEFAULT_MAX_ATTEMPTS, MAX_HINT_LEVEL, MIN_HINT_LEVEL};

/// Errors raised when a policy override violates the game's hard limits.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("max_attempts must be at least 1 (got {value})")]
    ZeroMaxAttempts { value: u32 },
    #[error("max_hint_level must be between {min} and {max} (got {value})")]
    HintLevelRange { min: u32, max: u32, value: u32 },
}

/// Attempt ceiling and hint tier cap applied to every daily challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamePolicy {
    #[serde(default = "GamePolicy::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "GamePolicy::default_max_hint_level")]
    pub max_hint_level: u32,
}

impl GamePolicy {
    const fn default_max_attempts() -> u32 {
        DEFAULT_MAX_ATTEMPTS
    }

    const fn default_max_hint_level() -> u32 {
        MAX_HINT_LEVEL
    }

    /// Check the policy against the limits the hint UI can actually render.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_attempts` is zero or the hint cap falls outside
    /// the renderable tiers.
    pub const fn validate(&self) -> Result<(), PolicyError> {
        if self.max_attempts == 0 {
            return Err(PolicyError::ZeroMaxAttempts {
                value: self.max_attempts,
            });
        }
        if self.max_hint_level < MIN_HINT_LEVEL || self.max_hint_level > MAX_HINT_LEVEL {
            return Err(PolicyError::HintLevelRange {
                min: MIN_HINT_LEVEL,
                max: MAX_HINT_LEVEL,
                value: self.max_hint_level,
            });
        }
        Ok(())
    }

    /// Hint tier shown to a player who has used `attempts` attempts on an open game.
    #[must_use]
    pub fn hint_level_for(&self, attempts: u32) -> u32 {
        attempts
            .saturating_add(1)
            .clamp(MIN_HINT_LEVEL, self.max_hint_level.max(MIN_HINT_LEVEL))
    }

    /// Pull an arbitrary stored hint tier back into the renderable range.
    #[must_use]
    pub fn clamp_hint_level(&self, level: u32) -> u32 {
        level.clamp(MIN_HINT_LEVEL, self.max_hint_level.max(MIN_HINT_LEVEL))
    }
}

impl Default for GamePolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            max_hint_level: Self::default_max_hint_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hint_level_tracks_attempts_until_cap() {
        let policy = GamePolicy::default();
        assert_eq!(policy.hint_level_for(0), 1);
        assert_eq!(policy.hint_level_for(1), 2);
        assert_eq!(policy.hint_level_for(2), 3);
        assert_eq!(policy.hint_level_for(7), 3);
        assert_eq!(policy.hint_level_for(u32::MAX), 3);
    }

    #[test]
    fn clamp_hint_level_bounds_stored_values() {
        let policy = GamePolicy::default();
        assert_eq!(policy.clamp_hint_level(0), 1);
        assert_eq!(policy.clamp_hint_level(2), 2);
        assert_eq!(policy.clamp_hint_level(9), 3);
    }

    #[test]
    fn validate_rejects_out_of_range_overrides() {
        let zero = GamePolicy {
            max_attempts: 0,
            ..GamePolicy::default()
        };
        assert_eq!(
            zero.validate(),
            Err(PolicyError::ZeroMaxAttempts { value: 0 })
        );

        let wide = GamePolicy {
            max_hint_level: 5,
            ..GamePolicy::default()
        };
        assert!(matches!(
            wide.validate(),
            Err(PolicyError::HintLevelRange { value: 5, .. })
        ));
        assert!(GamePolicy::default().validate().is_ok());
    }

    #[test]
    fn partial_policy_json_fills_defaults() {
        let policy: GamePolicy = serde_json::from_str(r#"{"max_attempts": 5}"#).unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.max_hint_level, MAX_HINT_LEVEL);
    }
}
