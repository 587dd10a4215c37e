use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::{fs, path::Path};

use reelday_game::{GamePolicy, parse_date};

pub fn split_csv(s: &str) -> Vec<String> {
    s.split(',')
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

/// Parse comma-separated seeds; an empty list falls back to the default seed.
pub fn parse_seeds(s: &str) -> Result<Vec<u64>> {
    let seeds = split_csv(s)
        .iter()
        .map(|token| {
            token
                .parse::<u64>()
                .with_context(|| format!("invalid seed {token:?}"))
        })
        .collect::<Result<Vec<_>>>()?;
    if seeds.is_empty() {
        Ok(vec![crate::DEFAULT_SEED])
    } else {
        Ok(seeds)
    }
}

/// clap value parser for `YYYY-MM-DD` arguments.
pub fn parse_day_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_date(s).ok_or_else(|| format!("expected a YYYY-MM-DD date, got {s:?}"))
}

/// Load and validate a policy override, or the default policy.
pub fn load_policy(path: Option<&Path>) -> Result<GamePolicy> {
    let Some(path) = path else {
        return Ok(GamePolicy::default());
    };
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let policy: GamePolicy = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse policy {}", path.display()))?;
    policy
        .validate()
        .with_context(|| format!("invalid policy {}", path.display()))?;
    Ok(policy)
}
