use anyhow::{Context, Result, ensure};
use chrono::{Days, NaiveDate};
use rand::Rng;
use rand_chacha::ChaCha20Rng;
use std::collections::BTreeSet;

use reelday_game::corpus::{self, RecordShape};
use reelday_game::{
    Attempt, DailySession, GamePolicy, GameState, GuessInput, KeyValueStore, MediaKind,
    MemoryStore, RawGameState, StateNormalizer, StateStore, StoreConfig, format_date,
};

use super::TestScenario;

const TITLES: [&str; 5] = ["Alien", "Heat", "Jaws", "Fargo", "Succession"];

pub fn catalog_scenarios() -> Vec<TestScenario> {
    vec![
        TestScenario::new(
            "smoke",
            "Daily Session Smoke",
            "Play a day to completion through the store",
            smoke_expectation,
        ),
        TestScenario::new(
            "legacy-upgrade",
            "Legacy Guess Upgrade",
            "Backfill guess-list records and persist the upgrade",
            legacy_upgrade_expectation,
        ),
        TestScenario::new(
            "idempotence",
            "Normalizer Idempotence",
            "Normalized output needs no further repairs",
            idempotence_expectation,
        ),
        TestScenario::new(
            "corruption",
            "Corrupted Storage",
            "Garbage and truncated blobs load as fresh or repaired days",
            corruption_expectation,
        ),
        TestScenario::new(
            "quota-pressure",
            "Storage Quota Pressure",
            "Failed saves never lose in-memory progress",
            quota_pressure_expectation,
        ),
        TestScenario::new(
            "retention",
            "Retention Sweep",
            "Only records older than the retention window are removed",
            retention_expectation,
        ),
    ]
}

fn store_for(backend: MemoryStore, policy: &GamePolicy) -> StateStore<MemoryStore> {
    StateStore::with_config(
        backend,
        StateNormalizer::new(*policy),
        StoreConfig::default(),
    )
}

fn random_day(rng: &mut ChaCha20Rng) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|start| start.checked_add_days(Days::new(rng.random_range(0..366))))
        .context("random day out of range")
}

fn random_guess(rng: &mut ChaCha20Rng) -> GuessInput {
    GuessInput {
        title: TITLES[rng.random_range(0..TITLES.len())].to_string(),
        subject_id: rng.random_range(1..100_000),
        media_kind: if rng.random_bool(0.7) {
            MediaKind::Movie
        } else {
            MediaKind::Series
        },
        correct: rng.random_bool(0.3),
    }
}

/// Invariants every normalized record holds.
fn check_invariants(state: &GameState, policy: &GamePolicy) -> Result<()> {
    ensure!(
        state.attempts as usize >= state.attempt_log.len(),
        "attempts {} below logged {}",
        state.attempts,
        state.attempt_log.len()
    );
    ensure!(
        state.won == state.attempt_log.iter().any(Attempt::is_winning),
        "won flag disagrees with the attempt log"
    );
    ensure!(
        state.completed == (state.won || state.attempts >= state.max_attempts),
        "completed={} with won={} attempts={}/{}",
        state.completed,
        state.won,
        state.attempts,
        state.max_attempts
    );
    ensure!(
        (1..=policy.max_hint_level).contains(&state.current_hint_level),
        "hint level {} out of range",
        state.current_hint_level
    );
    ensure!(state.max_attempts > 0, "maxAttempts left at zero");
    Ok(())
}

fn smoke_expectation(rng: &mut ChaCha20Rng, policy: &GamePolicy) -> Result<()> {
    let store = store_for(MemoryStore::new(), policy);
    let date = random_day(rng)?;
    let mut session = DailySession::open(&store, date);
    ensure!(session.is_fresh(), "new day opened with progress");

    let mut actions = 0;
    while !session.state().completed {
        if rng.random_bool(0.4) {
            session.skip()?;
        } else {
            session.guess(random_guess(rng))?;
        }
        actions += 1;
        ensure!(
            actions <= policy.max_attempts,
            "day still open after {actions} actions"
        );

        let stored = store.load(date).context("action was not persisted")?;
        ensure!(
            &stored == session.state(),
            "stored state diverged from the session"
        );
        check_invariants(&stored, policy)?;
        if !stored.completed {
            ensure!(
                stored.current_hint_level == policy.hint_level_for(stored.attempts),
                "open day shows hint {} after {} attempts",
                stored.current_hint_level,
                stored.attempts
            );
        }
    }

    ensure!(
        session.skip().is_err(),
        "completed day accepted another action"
    );
    Ok(())
}

fn legacy_upgrade_expectation(rng: &mut ChaCha20Rng, policy: &GamePolicy) -> Result<()> {
    let date = random_day(rng)?;
    let value = corpus::record(rng, RecordShape::Legacy, &format_date(date));
    let guesses = value["guesses"].as_array().cloned().unwrap_or_default();

    let backend = MemoryStore::new();
    let store = store_for(backend.clone(), policy);
    backend.set(&store.key_for(date), &value.to_string())?;

    let report = store.load_report(date).context("legacy record did not load")?;
    if !guesses.is_empty() {
        ensure!(report.was_fixed, "legacy guesses were not reported");
    }
    let state = report
        .validated_state
        .context("legacy record normalized to nothing")?;
    ensure!(
        state.attempt_log.len() == guesses.len(),
        "backfilled {} of {} guesses",
        state.attempt_log.len(),
        guesses.len()
    );
    for (attempt, guess) in state.attempt_log.iter().zip(&guesses) {
        ensure!(
            Some(attempt.id.as_str()) == guess["id"].as_str(),
            "attempt {} lost its legacy id",
            attempt.id
        );
        ensure!(
            Some(attempt.correct) == guess["correct"].as_bool(),
            "attempt {} changed correctness",
            attempt.id
        );
    }
    check_invariants(&state, policy)?;

    store.save(date, &state);
    let again = store.load_report(date).context("upgraded record vanished")?;
    ensure!(
        !again.was_fixed,
        "upgraded record was repaired again: {:?}",
        again.issues
    );
    let blob = store.try_load_raw(date)?.unwrap_or_default();
    ensure!(
        !blob.contains("\"guesses\""),
        "legacy field survived the rewrite"
    );
    Ok(())
}

fn idempotence_expectation(rng: &mut ChaCha20Rng, policy: &GamePolicy) -> Result<()> {
    let normalizer = StateNormalizer::new(*policy);
    let date = format_date(random_day(rng)?);
    let (shape, value) = corpus::any_record(rng, &date);

    let state = normalizer
        .normalize_value(value)
        .validated_state
        .with_context(|| format!("{} record normalized to nothing", shape.label()))?;
    check_invariants(&state, policy)
        .with_context(|| format!("{} record", shape.label()))?;

    let second = normalizer.normalize_state(&state);
    ensure!(
        !second.was_fixed,
        "{} record needed a second pass: {:?}",
        shape.label(),
        second.issues
    );
    ensure!(
        second.validated_state.as_ref() == Some(&state),
        "{} record changed on the second pass",
        shape.label()
    );

    let mut jittered = state.clone();
    for attempt in &mut jittered.attempt_log {
        attempt.timestamp += rng.random_range(-1_000..=1_000);
    }
    ensure!(
        normalizer.states_equivalent(
            Some(RawGameState::from(&state)),
            Some(RawGameState::from(&jittered))
        ),
        "timestamp jitter broke equivalence"
    );
    Ok(())
}

fn corruption_expectation(rng: &mut ChaCha20Rng, policy: &GamePolicy) -> Result<()> {
    let date = random_day(rng)?;
    let day = format_date(date);
    let blob = match rng.random_range(0..4) {
        0 => corpus::record(rng, RecordShape::Corrupted, &day).to_string(),
        1 => {
            let full = corpus::record(rng, RecordShape::Current, &day).to_string();
            let cut = rng.random_range(0..full.len());
            full.chars().take(cut).collect()
        }
        2 => ["42", "\"save\"", "[1,2]", "true", "{}"][rng.random_range(0..5)].to_string(),
        _ => "null".to_string(),
    };

    let backend = MemoryStore::new();
    let store = store_for(backend.clone(), policy);
    backend.set(&store.key_for(date), &blob)?;

    if let Some(state) = store.load(date) {
        check_invariants(&state, policy).with_context(|| format!("loaded from {blob}"))?;
        ensure!(state.date == day, "record lost its key date");
    }

    let mut session = DailySession::open(&store, date);
    if !session.state().completed {
        session.skip().context("could not resume a corrupted day")?;
        let stored = store.load(date).context("resumed day was not persisted")?;
        check_invariants(&stored, policy)?;
    }
    Ok(())
}

fn quota_pressure_expectation(rng: &mut ChaCha20Rng, policy: &GamePolicy) -> Result<()> {
    let backend = MemoryStore::with_quota(rng.random_range(64..640));
    let store = store_for(backend, policy);
    let date = random_day(rng)?;
    let mut session = DailySession::open(&store, date);

    let mut taken = 0;
    while !session.state().completed {
        if rng.random_bool(0.5) {
            session.skip()?;
        } else {
            session.guess(random_guess(rng))?;
        }
        taken += 1;
        ensure!(
            session.state().attempts == taken,
            "in-memory progress lost after a save"
        );
        if let Some(stored) = store.load(date) {
            ensure!(
                stored.attempt_log.len() <= session.state().attempt_log.len(),
                "store ran ahead of the session"
            );
            check_invariants(&stored, policy)?;
        }
    }
    Ok(())
}

fn retention_expectation(rng: &mut ChaCha20Rng, policy: &GamePolicy) -> Result<()> {
    let backend = MemoryStore::new();
    let store = store_for(backend.clone(), policy);
    let today = random_day(rng)?;

    let mut saved = BTreeSet::new();
    for _ in 0..rng.random_range(1..12) {
        let day = today
            .checked_sub_days(Days::new(rng.random_range(0..90)))
            .context("day out of range")?;
        store.save(day, &GameState::with_policy("", policy));
        saved.insert(day);
    }
    backend.set("reelday.settings", "{}")?;

    let report = store.sweep(today);
    let remaining = store.stored_dates()?;
    ensure!(report.failures == 0, "sweep reported failures");
    ensure!(
        report.deleted.iter().all(|day| *day < report.cutoff),
        "sweep removed a record inside the window"
    );
    ensure!(
        remaining.iter().all(|day| *day >= report.cutoff),
        "sweep kept a record past the window"
    );
    ensure!(
        report.deleted.len() + remaining.len() == saved.len(),
        "sweep lost track of records"
    );
    ensure!(
        backend.get("reelday.settings")?.is_some(),
        "sweep touched a foreign key"
    );
    Ok(())
}
