//! Command execution.
//!
//! Commands run directly against the configured ledger; no daemon needed.

use crate::cli::Commands;
use crate::output;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use owo_colors::OwoColorize;
use quest_common::{
    BadgeCategory, LedgerBackend, Notifier, ProgressionEngine, QuestConfig, SqliteLedger,
    TracingSink,
};
use std::io::Write;
use std::sync::Arc;

/// Build the engine from config
pub fn build_engine(config: &QuestConfig) -> Result<ProgressionEngine> {
    let rules = config.build_rules().context("Invalid progression rules")?;
    let ledger = config.open_ledger().context("Failed to open event ledger")?;
    Ok(ProgressionEngine::new(
        ledger,
        Arc::new(rules),
        Notifier::new(Arc::new(TracingSink)),
    ))
}

/// Run any command
pub fn run(command: &Commands, config: &QuestConfig, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::CheckConfig => check_config(config, out),
        Commands::Recount { user, fix } => recount(config, user, *fix, out),
        Commands::Catalog { category } => {
            let rules = config.build_rules().context("Invalid progression rules")?;
            catalog(&rules.badges, category.as_deref(), out)
        }
        other => run_with_engine(other, &build_engine(config)?, out),
    }
}

/// Run a command that only needs the engine
pub fn run_with_engine(command: &Commands, engine: &ProgressionEngine, out: &mut dyn Write) -> Result<()> {
    match command {
        Commands::Record {
            user,
            event_type,
            at,
        } => {
            let receipt = engine.record_event_at(user, event_type, at.unwrap_or_else(Utc::now))?;
            writeln!(
                out,
                "Recorded {} for {} ({})",
                receipt.event.event_type.cyan(),
                user,
                receipt.event.id
            )?;
            for milestone in &receipt.milestones {
                writeln!(out, "  {} {}", "[STREAK]".bright_yellow(), milestone.event_type)?;
            }
            for intent in &receipt.intents {
                output::intent(out, intent)?;
            }
        }

        Commands::Progress { user, json } => {
            let progression = engine.user_progression(user)?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&progression)?)?;
            } else {
                output::progression(out, user, &progression)?;
                let breakdown = engine.xp_breakdown(user)?;
                if !breakdown.is_empty() {
                    writeln!(out)?;
                    output::header(out, "XP SOURCES")?;
                    for item in breakdown {
                        writeln!(
                            out,
                            "  {:<36} {:>4} x {:>3} = {}",
                            item.event_type, item.count, item.xp_each, item.xp
                        )?;
                    }
                }
            }
        }

        Commands::Badges { user, json } => {
            let views = engine.badge_views(user)?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&views)?)?;
            } else {
                let earned = views.iter().filter(|v| v.earned).count();
                output::header(out, &format!("BADGES {}/{}", earned, views.len()))?;
                for view in &views {
                    output::badge_line(out, view)?;
                }
            }
        }

        Commands::Closest { user, limit } => {
            let closest = engine.closest_badges(user, *limit)?;
            output::header(out, "CLOSEST BADGES")?;
            if closest.is_empty() {
                writeln!(out, "  {}", "Every badge earned".dimmed())?;
            }
            for view in &closest {
                output::badge_details(out, view)?;
            }
        }

        Commands::Counts { user, json } => {
            let counts = engine.event_counts(user)?;
            if *json {
                writeln!(out, "{}", serde_json::to_string_pretty(&counts)?)?;
            } else {
                output::header(out, "EVENT COUNTS")?;
                if counts.is_empty() {
                    writeln!(out, "  {}", "No events recorded".dimmed())?;
                }
                for (event_type, count) in counts.iter() {
                    writeln!(out, "  {:<36} {}", event_type, count)?;
                }
            }
        }

        Commands::Streak { user } => {
            let stats = engine.streak(user)?;
            output::streak(out, user, &stats)?;
        }

        Commands::Catalog { category } => catalog(&engine.rules().badges, category.as_deref(), out)?,

        Commands::CheckConfig | Commands::Recount { .. } => {
            bail!("This command needs the configuration, not just an engine")
        }
    }
    Ok(())
}

fn catalog(
    badges: &quest_common::BadgeCatalog,
    category: Option<&str>,
    out: &mut dyn Write,
) -> Result<()> {
    let categories: Vec<BadgeCategory> = match category {
        Some(raw) => match BadgeCategory::parse(raw) {
            Some(c) => vec![c],
            None => bail!("Unknown badge category '{}'", raw),
        },
        None => BadgeCategory::ALL.to_vec(),
    };

    for category in categories {
        let in_category = badges.by_category(category);
        if in_category.is_empty() {
            continue;
        }
        output::header(out, &category.as_str().to_uppercase())?;
        for badge in in_category {
            let requirements: Vec<String> = badge
                .requirements
                .iter()
                .map(|r| format!("{} >= {}", r.event_type, r.required_count))
                .collect();
            writeln!(out, "  {:<24} {}", badge.id, badge.name)?;
            writeln!(out, "      {}", requirements.join(", ").dimmed())?;
        }
    }
    Ok(())
}

fn check_config(config: &QuestConfig, out: &mut dyn Write) -> Result<()> {
    let rules = config.build_rules().context("Invalid progression rules")?;

    output::header(out, "CONFIG")?;
    match &config.source {
        Some(path) => writeln!(out, "  File:        {}", path.display())?,
        None => writeln!(out, "  File:        {}", "built-in defaults".dimmed())?,
    }
    let ledger_path = config
        .ledger
        .effective_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "in memory".to_string());
    writeln!(out, "  Ledger:      {:?} ({})", config.ledger.backend, ledger_path)?;
    writeln!(out, "  Event types: {}", rules.taxonomy.len())?;
    writeln!(out, "  Levels:      {}", rules.levels.levels().len())?;
    writeln!(out, "  Badges:      {}", rules.badges.len())?;
    writeln!(out, "  Streaks:     {}", rules.streaks.source)?;

    let unknown = rules.unknown_requirement_types();
    if !unknown.is_empty() {
        writeln!(out)?;
        output::header(out, "UNREGISTERED EVENT TYPES")?;
        for event_type in unknown {
            writeln!(out, "  {}", event_type.yellow())?;
        }
    }

    let placeholders = rules.badges.placeholders();
    if !placeholders.is_empty() {
        writeln!(out)?;
        output::header(out, "PLACEHOLDER REQUIREMENTS")?;
        for (badge, req) in placeholders {
            writeln!(out, "  {:<24} {}", badge.id, req.event_type.yellow())?;
            if let Some(note) = &req.placeholder {
                writeln!(out, "      {}", note.dimmed())?;
            }
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", "[OK] Configuration is valid".bright_green())?;
    Ok(())
}

fn recount(config: &QuestConfig, user: &str, fix: bool, out: &mut dyn Write) -> Result<()> {
    let path = match (config.ledger.backend, config.ledger.effective_path()) {
        (LedgerBackend::Sqlite, Some(path)) => path,
        _ => bail!("recount needs the SQLite ledger; other backends always count from raw events"),
    };
    let ledger = SqliteLedger::open_at(&path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let recounted = ledger.recount(user)?;
    let consistent = ledger.verify(user)?;

    output::header(out, "RECOUNT")?;
    writeln!(out, "  User:    {}", user)?;
    writeln!(out, "  Events:  {}", recounted.total_events())?;
    for (event_type, count) in &recounted.occurrences {
        writeln!(
            out,
            "  {:<36} {:>5} events {:>4} days",
            event_type,
            count,
            recounted.days_of(event_type)
        )?;
    }

    if consistent {
        writeln!(out, "{}", "[OK] Cached counts match the ledger".bright_green())?;
    } else if fix {
        ledger.rebuild(user)?;
        writeln!(out, "{}", "[FIXED] Cached counts rebuilt from the ledger".yellow())?;
    } else {
        writeln!(
            out,
            "{}",
            "[MISMATCH] Cached counts differ from the ledger (run with --fix)".bright_red()
        )?;
    }
    Ok(())
}
