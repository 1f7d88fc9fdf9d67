//! CLI - Command-line argument parsing
//!
//! Keeps argument parsing separate from execution logic.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quest progression CLI
#[derive(Parser, Debug)]
#[command(name = "questctl")]
#[command(about = "Inspect and record job-search progression", long_about = None)]
#[command(version)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// Config file (overrides $QUEST_CONFIG and /etc/quest/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Ledger file, overrides [ledger].path
    #[arg(long, global = true)]
    pub ledger: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Commands {
    /// Record an event for a user
    Record {
        user: String,
        event_type: String,
        /// Event time (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Show XP, level and progress to the next level
    Progress {
        user: String,
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Show every badge with its progress
    Badges {
        user: String,
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Unearned badges closest to completion
    Closest {
        user: String,
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },

    /// Effective event counts
    Counts {
        user: String,
        /// Output JSON only
        #[arg(long)]
        json: bool,
    },

    /// Login streak
    Streak { user: String },

    /// List the badge catalog
    Catalog {
        /// Only this category (profile, cv, job_offers, ...)
        #[arg(long)]
        category: Option<String>,
    },

    /// Validate configuration, level table and badge catalog
    CheckConfig,

    /// Recount a user's tally from raw events (SQLite ledger only)
    Recount {
        user: String,
        /// Overwrite the materialized counts with the recount
        #[arg(long)]
        fix: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_record() {
        let cli = Cli::try_parse_from(["questctl", "record", "u1", "job_offer.created"]).unwrap();
        assert_eq!(
            cli.command,
            Commands::Record {
                user: "u1".to_string(),
                event_type: "job_offer.created".to_string(),
                at: None,
            }
        );
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "questctl",
            "closest",
            "u1",
            "--limit",
            "5",
            "--config",
            "/tmp/q.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/q.toml")));
        assert_eq!(
            cli.command,
            Commands::Closest {
                user: "u1".to_string(),
                limit: 5
            }
        );
    }

    #[test]
    fn test_parse_timestamp() {
        let cli = Cli::try_parse_from([
            "questctl",
            "record",
            "u1",
            "daily.login",
            "--at",
            "2026-02-01T09:00:00Z",
        ])
        .unwrap();
        match cli.command {
            Commands::Record { at: Some(at), .. } => assert_eq!(at.to_rfc3339(), "2026-02-01T09:00:00+00:00"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["questctl"]).is_err());
    }
}
