//! Generators for stored records in every shape the normalizer has to cope
//! with: current, legacy guess-list only, partially migrated, and corrupted.
//!
//! Used by the QA sweeps in `reelday-tester` and by this crate's property tests.
use rand::Rng;
use serde_json::{Map, Value, json};

/// Which family of record a generator call produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Current,
    Legacy,
    PartiallyMigrated,
    Corrupted,
}

impl RecordShape {
    pub const ALL: [Self; 4] = [
        Self::Current,
        Self::Legacy,
        Self::PartiallyMigrated,
        Self::Corrupted,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Legacy => "legacy",
            Self::PartiallyMigrated => "partially-migrated",
            Self::Corrupted => "corrupted",
        }
    }
}

const TITLES: [&str; 6] = [
    "Alien",
    "Heat",
    "Paddington 2",
    "The Wire",
    "Twin Peaks",
    "Spirited Away",
];

/// Produce a record of a randomly chosen shape.
pub fn any_record<R: Rng + ?Sized>(rng: &mut R, date: &str) -> (RecordShape, Value) {
    let shape = RecordShape::ALL[rng.random_range(0..RecordShape::ALL.len())];
    (shape, record(rng, shape, date))
}

/// Produce a record of the requested shape.
pub fn record<R: Rng + ?Sized>(rng: &mut R, shape: RecordShape, date: &str) -> Value {
    match shape {
        RecordShape::Current => current_record(rng, date),
        RecordShape::Legacy => legacy_record(rng, date),
        RecordShape::PartiallyMigrated => {
            let mut value = current_record(rng, date);
            let guesses = guess_list(rng);
            if let Some(object) = value.as_object_mut() {
                object.insert("guesses".to_string(), guesses);
            }
            value
        }
        RecordShape::Corrupted => corrupted_record(rng, date),
    }
}

/// A well-formed attempt with the given timestamp.
pub fn attempt<R: Rng + ?Sized>(rng: &mut R, index: usize, timestamp: i64) -> Value {
    if rng.random_bool(0.3) {
        json!({"id": format!("s{index}"), "kind": "skip", "timestamp": timestamp})
    } else {
        json!({
            "id": format!("g{index}"),
            "kind": "guess",
            "title": TITLES[rng.random_range(0..TITLES.len())],
            "subjectId": rng.random_range(1..100_000_u64),
            "mediaKind": if rng.random_bool(0.5) { "movie" } else { "series" },
            "correct": rng.random_bool(0.25),
            "timestamp": timestamp
        })
    }
}

fn attempt_log<R: Rng + ?Sized>(rng: &mut R) -> Vec<Value> {
    let len = rng.random_range(0..=4_usize);
    let mut timestamp = rng.random_range(1_600_000_000_000..1_800_000_000_000_i64);
    (0..len)
        .map(|index| {
            timestamp += rng.random_range(0..60_000_i64);
            attempt(rng, index, timestamp)
        })
        .collect()
}

fn guess_list<R: Rng + ?Sized>(rng: &mut R) -> Value {
    let len = rng.random_range(0..=3_usize);
    let guesses: Vec<Value> = (0..len)
        .map(|index| {
            json!({
                "id": format!("legacy{index}"),
                "title": TITLES[rng.random_range(0..TITLES.len())],
                "tmdbId": rng.random_range(1..100_000_u64),
                "mediaType": if rng.random_bool(0.5) { "movie" } else { "tv" },
                "correct": rng.random_bool(0.3),
                "timestamp": 1_000 * i64::try_from(index).unwrap_or(0)
            })
        })
        .collect();
    Value::Array(guesses)
}

fn current_record<R: Rng + ?Sized>(rng: &mut R, date: &str) -> Value {
    let log = attempt_log(rng);
    let logged = log.len();
    json!({
        "date": date,
        "attempts": logged + rng.random_range(0..=1_usize),
        "maxAttempts": 3,
        "attemptLog": log,
        "completed": rng.random_bool(0.5),
        "won": rng.random_bool(0.3),
        "currentHintLevel": rng.random_range(1..=3_u32)
    })
}

fn legacy_record<R: Rng + ?Sized>(rng: &mut R, date: &str) -> Value {
    let guesses = guess_list(rng);
    let declared = guesses.as_array().map_or(0, Vec::len);
    json!({
        "date": date,
        "attempts": declared,
        "maxAttempts": 3,
        "guesses": guesses,
        "completed": false,
        "won": false,
        "currentHintLevel": 1
    })
}

fn corrupted_record<R: Rng + ?Sized>(rng: &mut R, date: &str) -> Value {
    let mut object = Map::new();
    let junk = |rng: &mut R| -> Value {
        match rng.random_range(0..7) {
            0 => Value::Null,
            1 => json!(-3),
            2 => json!("NaN"),
            3 => json!(2.7),
            4 => json!([1, 2]),
            5 => json!({"nested": true}),
            _ => json!(rng.random_range(0..10_u32)),
        }
    };
    for field in [
        "attempts",
        "maxAttempts",
        "completed",
        "won",
        "currentHintLevel",
    ] {
        if rng.random_bool(0.7) {
            let value = junk(rng);
            object.insert(field.to_string(), value);
        }
    }
    if rng.random_bool(0.5) {
        let mut log = attempt_log(rng);
        log.push(junk(rng));
        object.insert("attemptLog".to_string(), Value::Array(log));
    }
    if rng.random_bool(0.5) {
        object.insert("guesses".to_string(), guess_list(rng));
    }
    if rng.random_bool(0.5) {
        object.insert("date".to_string(), json!(date));
    }
    Value::Object(object)
}
