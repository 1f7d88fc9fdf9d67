//! Output formatting - ASCII-only terminal output

use owo_colors::OwoColorize;
use quest_common::{BadgeView, Notification, NotificationIntent, StreakStats, UserProgression};
use std::io::{self, Write};

const BAR_WIDTH: usize = 20;

/// `[#######-------------]`
pub fn progress_bar(fraction: f64) -> String {
    let filled = ((fraction.clamp(0.0, 1.0) * BAR_WIDTH as f64).floor() as usize).min(BAR_WIDTH);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled))
}

pub fn header(out: &mut dyn Write, title: &str) -> io::Result<()> {
    writeln!(out, "{}", format!("[{}]", title).bold())
}

pub fn progression(out: &mut dyn Write, user: &str, p: &UserProgression) -> io::Result<()> {
    header(out, "PROGRESSION")?;
    writeln!(out, "  User:   {}", user)?;
    writeln!(out, "  XP:     {}", p.total_xp.to_string().cyan())?;
    writeln!(out, "  Level:  {}", p.level.order.to_string().bright_green())?;
    match p.next_level {
        Some(next) => writeln!(
            out,
            "  Next:   level {} at {} XP ({} to go)",
            next.order,
            next.xp_required,
            p.xp_to_next()
        )?,
        None => writeln!(out, "  Next:   {}", "max level reached".dimmed())?,
    }
    writeln!(
        out,
        "  {} {}%",
        progress_bar(p.progress_fraction),
        p.progress_percent()
    )
}

pub fn badge_line(out: &mut dyn Write, badge: &BadgeView) -> io::Result<()> {
    let marker = if badge.earned {
        "[x]".bright_green().to_string()
    } else {
        "[ ]".dimmed().to_string()
    };
    writeln!(
        out,
        "  {} {:<24} {} {:>3}%  {}/{}",
        marker,
        badge.id,
        progress_bar(badge.progress_fraction),
        (badge.progress_fraction * 100.0).floor() as u32,
        badge.current,
        badge.required
    )
}

pub fn badge_details(out: &mut dyn Write, badge: &BadgeView) -> io::Result<()> {
    badge_line(out, badge)?;
    writeln!(out, "      {} - {}", badge.name, badge.description.dimmed())?;
    for req in &badge.requirements {
        let note = if req.placeholder { " (placeholder)" } else { "" };
        writeln!(
            out,
            "      * {} {}/{}{}",
            req.event_type,
            req.current.min(req.required),
            req.required,
            note.yellow()
        )?;
    }
    Ok(())
}

pub fn streak(out: &mut dyn Write, user: &str, stats: &StreakStats) -> io::Result<()> {
    header(out, "STREAK")?;
    writeln!(out, "  User:         {}", user)?;
    writeln!(out, "  Current:      {} days", stats.current.to_string().bright_green())?;
    writeln!(out, "  Best:         {} days", stats.best)?;
    writeln!(out, "  Active days:  {}", stats.active_days)
}

pub fn intent(out: &mut dyn Write, intent: &NotificationIntent) -> io::Result<()> {
    match &intent.notification {
        Notification::LevelUp(p) => writeln!(
            out,
            "  {} reached level {} ({} XP)",
            "[LEVEL UP]".bright_green(),
            p.order,
            p.total_xp
        ),
        Notification::BadgeEarned(p) => writeln!(
            out,
            "  {} {} ({})",
            "[BADGE]".bright_yellow(),
            p.name,
            p.badge_id
        ),
    }
}

/// Display an error
pub fn display_error(message: &str) {
    eprintln!("[ERROR] {}", message.red());
}
