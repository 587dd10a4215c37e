//! Store maintenance against a directory of per-day JSON files.
use anyhow::{Context, Result};
use chrono::NaiveDate;
use colored::Colorize;
use log::debug;
use std::fs;
use std::io::Write;
use std::path::Path;

use reelday_game::{
    FileStore, GamePolicy, Normalized, PlayerStats, StateNormalizer, StateStore, StoreConfig,
    SweepReport, format_date,
};

pub fn open_store(
    dir: &Path,
    config: StoreConfig,
    policy: GamePolicy,
) -> Result<StateStore<FileStore>> {
    let backend =
        FileStore::open(dir).with_context(|| format!("failed to open store {}", dir.display()))?;
    let store = StateStore::with_config(backend, StateNormalizer::new(policy), config);
    debug!(
        "opened store at {} (prefix {:?}, retention {} days)",
        store.backend().dir().display(),
        store.config().key_prefix,
        store.config().retention_days
    );
    Ok(store)
}

/// Normalize a saved record read from `path`.
pub fn normalize_file(path: &Path, policy: GamePolicy) -> Result<Normalized> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let value: serde_json::Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not JSON", path.display()))?;
    Ok(StateNormalizer::new(policy).normalize_value(value))
}

pub fn write_normalized<W: Write + ?Sized>(
    out: &mut W,
    label: &str,
    report: &Normalized,
) -> Result<()> {
    let verdict = if report.is_valid {
        "✅ valid".green()
    } else if report.was_fixed {
        "🛠  repaired".yellow()
    } else {
        "❌ missing".red()
    };
    writeln!(out, "{} {verdict}", label.bold())?;
    for issue in &report.issues {
        writeln!(out, "   • {issue}")?;
    }
    if let Some(state) = &report.validated_state {
        writeln!(
            out,
            "   attempts {}/{} | hint {} | completed {} | won {} | logged {} ({} guesses)",
            state.attempts,
            state.max_attempts,
            state.current_hint_level,
            state.completed,
            state.won,
            state.attempt_log.len(),
            state.guess_count()
        )?;
        for attempt in &state.attempt_log {
            let outcome = if attempt.is_winning() { "✔" } else { "✘" };
            writeln!(
                out,
                "     {outcome} [{}] {} {}",
                attempt.kind,
                attempt.title,
                attempt.timestamp
            )?;
        }
    }
    Ok(())
}

pub fn write_sweep<W: Write + ?Sized>(out: &mut W, report: &SweepReport) -> Result<()> {
    writeln!(
        out,
        "{}",
        format!("🧹 Retention sweep (cutoff {})", format_date(report.cutoff)).bold()
    )?;
    writeln!(out, "Scanned: {}", report.scanned)?;
    writeln!(out, "Deleted: {}", report.deleted.len().to_string().green())?;
    for date in &report.deleted {
        writeln!(out, "   • {}", format_date(*date))?;
    }
    if report.failures > 0 {
        writeln!(out, "Failures: {}", report.failures.to_string().red())?;
    }
    Ok(())
}

pub fn write_stats<W: Write + ?Sized>(
    out: &mut W,
    stats: &PlayerStats,
    today: NaiveDate,
) -> Result<()> {
    writeln!(
        out,
        "{}",
        format!("📈 Player statistics as of {}", format_date(today)).bold()
    )?;
    writeln!(out, "Played: {}", stats.played)?;
    writeln!(out, "Won: {} ({:.1}%)", stats.won, stats.win_rate)?;
    writeln!(out, "Current streak: {}", stats.current_streak)?;
    writeln!(out, "Max streak: {}", stats.max_streak)?;
    writeln!(out, "Guess distribution:")?;
    for (index, count) in stats.guess_distribution.iter().enumerate() {
        let bar = "█".repeat(usize::try_from(*count).unwrap_or(0).min(40));
        writeln!(out, "   {}: {bar} {count}", index + 1)?;
    }
    Ok(())
}
