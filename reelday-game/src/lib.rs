//! Reelday Game Engine
//!
//! Platform-agnostic core logic for the Reelday daily movie/TV guessing game.
//! This crate owns the game-state model, the self-healing normalizer that
//! every read and write passes through, and the per-day persistence adapter.
//! It has no UI or platform-specific dependencies; hosts plug in a
//! [`KeyValueStore`] backend.

pub mod constants;
pub mod corpus;
pub mod keys;
pub mod normalize;
pub mod policy;
pub mod session;
pub mod state;
pub mod stats;
pub mod storage;
pub mod store;

// Re-export commonly used types
pub use keys::{day_key, format_date, parse_date, parse_day_key};
pub use normalize::{
    Normalized, StateNormalizer, is_valid, normalize, normalized_only, states_equivalent,
};
pub use policy::{GamePolicy, PolicyError};
pub use session::{Clock, DailySession, GuessInput};
pub use state::{
    ActionError, Attempt, AttemptKind, GameState, LegacyGuess, MediaKind, RawGameState,
};
pub use stats::PlayerStats;
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};
pub use store::{PersistenceFailure, StateStore, StoreConfig, SweepReport};
