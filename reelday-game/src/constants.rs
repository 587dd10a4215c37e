//! Centralized policy constants for Reelday game logic.
//!
//! These values define the rules every normalized game state is held to.

// Game policy -------------------------------------------------------------
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const MIN_HINT_LEVEL: u32 = 1;
pub const MAX_HINT_LEVEL: u32 = 3;
/// Widest guess distribution reported; wins past it share the last slot.
pub const MAX_DISTRIBUTION_SLOTS: u32 = 32;

// Persistence -------------------------------------------------------------
pub const DEFAULT_KEY_PREFIX: &str = "reelday.state.";
pub const DEFAULT_RETENTION_DAYS: u32 = 30;
pub const DAY_KEY_FORMAT: &str = "%Y-%m-%d";
pub(crate) const FILE_STORE_EXTENSION: &str = "json";

// Normalizer issue messages ----------------------------------------------
pub(crate) const ISSUE_NO_STATE: &str = "no game state provided";
pub(crate) const ISSUE_BACKFILL_PREFIX: &str = "attemptLog backfilled from legacy guesses";
pub(crate) const ISSUE_LEGACY_DISCARDED_PREFIX: &str = "legacy guesses discarded";
pub(crate) const ISSUE_MALFORMED_ENTRIES_PREFIX: &str = "malformed log entries discarded";
pub(crate) const ISSUE_ATTEMPTS_PREFIX: &str = "attempts count repaired";
pub(crate) const ISSUE_WON_PREFIX: &str = "won flag repaired";
pub(crate) const ISSUE_COMPLETED_PREFIX: &str = "completed flag repaired";
pub(crate) const ISSUE_HINT_PREFIX: &str = "currentHintLevel repaired";
pub(crate) const ISSUE_MAX_ATTEMPTS_PREFIX: &str = "maxAttempts defaulted";
