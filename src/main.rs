use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use meta_ranker::calculate::{
    aggregate, compute_standings, compute_standings_by_grouping, select_matches,
    validate_matches, AggregateOptions, ComboSortKey, MatchFilter, SegmentExtractor,
    SkippedRecord, StandingsMode, StandingsReport,
};
use meta_ranker::config::AppConfig;
use meta_ranker::models::{EntityPerformance, MatchRecord};
use meta_ranker::storage::{JsonlWriter, MatchStore, StorageConfig};

#[derive(Parser)]
#[command(name = "meta-ranker")]
#[command(about = "Swiss standings and combo meta analysis over match records")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: String,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank participants of one tournament, or globally
    Standings {
        /// Match export (default: <data_dir>/matches.jsonl)
        #[arg(long)]
        input: Option<String>,

        /// Only this tournament
        #[arg(long)]
        tournament: Option<String>,

        /// Use awarded points instead of one point per win
        #[arg(long)]
        global: bool,

        /// One table per tournament
        #[arg(long)]
        by_tournament: bool,

        /// Practice matches: exclude, include or only
        #[arg(long)]
        practice: Option<String>,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,

        /// Write standings rows to a JSONL file
        #[arg(long)]
        output: Option<String>,
    },

    /// Combo leaderboard
    Combos {
        #[arg(long)]
        input: Option<String>,

        #[arg(long)]
        tournament: Option<String>,

        /// Split combos per participant
        #[arg(long)]
        per_owner: bool,

        /// Merge combos by the Nth part of their name (0-based)
        #[arg(long)]
        group_by_part: Option<usize>,

        /// Separator between combo parts
        #[arg(long, default_value = " ")]
        delimiter: String,

        /// composite, win-rate, weighted, matches, points or wins
        #[arg(long, default_value = "composite")]
        sort: String,

        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        practice: Option<String>,

        #[arg(long)]
        json: bool,

        #[arg(long)]
        output: Option<String>,
    },

    /// Report malformed records and inconsistent practice flags
    Validate {
        #[arg(long)]
        input: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load_or_default(&PathBuf::from(&cli.config))
        .with_context(|| format!("loading {}", cli.config))?;

    // Initialize tracing
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::info!("Starting meta-ranker v{}", env!("CARGO_PKG_VERSION"));

    let storage = StorageConfig::new(
        cli.data_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| config.data_dir.clone()),
    );

    match cli.command {
        Commands::Standings {
            input,
            tournament,
            global,
            by_tournament,
            practice,
            json,
            output,
        } => {
            let matches = load_matches(&storage, input.as_deref())?;
            let filter = build_filter(&config, practice.as_deref(), tournament)?;
            let selection = select_matches(&matches, &filter);
            let mode = if global {
                StandingsMode::Global
            } else {
                StandingsMode::PerTournament
            };

            if by_tournament {
                let selected: Vec<MatchRecord> = selection.matches.into_iter().cloned().collect();
                let grouped = compute_standings_by_grouping(&selected, mode);
                if json {
                    println!("{}", serde_json::to_string_pretty(&grouped)?);
                } else {
                    for (key, report) in &grouped.groupings {
                        println!("\n=== {} ===", key);
                        print_standings(report);
                    }
                    if !grouped.skipped.is_empty() {
                        println!("\n{} records without a tournament", grouped.skipped.len());
                    }
                }
                if let Some(path) = output {
                    let rows: Vec<_> = grouped
                        .groupings
                        .values()
                        .flat_map(|r| r.standings.iter())
                        .collect();
                    JsonlWriter::new(PathBuf::from(path)).write_all(rows)?;
                }
            } else {
                let report = compute_standings(selection.matches, mode);
                if json {
                    println!("{}", serde_json::to_string_pretty(&report)?);
                } else {
                    print_standings(&report);
                }
                if let Some(path) = output {
                    JsonlWriter::new(PathBuf::from(path)).write_all(&report.standings)?;
                }
            }
        }

        Commands::Combos {
            input,
            tournament,
            per_owner,
            group_by_part,
            delimiter,
            sort,
            limit,
            practice,
            json,
            output,
        } => {
            let sort_key: ComboSortKey = sort.parse()?;
            let matches = load_matches(&storage, input.as_deref())?;
            let filter = build_filter(&config, practice.as_deref(), tournament)?;
            let selection = select_matches(&matches, &filter);

            let options = AggregateOptions {
                per_owner,
                smoothing: config.ranking.smoothing()?,
            };
            let report = aggregate(selection.matches, &options);

            let grouped;
            let mut rows: Vec<&EntityPerformance> = match group_by_part {
                Some(index) => {
                    let extractor = SegmentExtractor::new(delimiter, index);
                    grouped = report.grouped(|k| extractor.extract_key(k));
                    grouped.iter().collect()
                }
                None => report.entries().iter().collect(),
            };
            sort_key.sort(&mut rows);
            if let Some(limit) = limit {
                rows.truncate(limit);
            }

            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                print_combos(&rows);
                if !report.skipped.is_empty() {
                    println!("\n{} record sides skipped", report.skipped.len());
                }
            }
            if let Some(path) = output {
                JsonlWriter::new(PathBuf::from(path)).write_all(rows)?;
            }
        }

        Commands::Validate { input } => {
            let path = input
                .map(PathBuf::from)
                .unwrap_or_else(|| storage.matches_path());
            let outcome = MatchStore::open(path).load_all()?;
            let report = validate_matches(&outcome.entities, config.ranking.smoothing()?);

            println!("\n=== Validation ===");
            println!("Records:          {}", report.records);
            println!("Unparseable:      {}", outcome.bad_lines.len());
            println!("Resolved:         {}", report.resolved_matches);
            println!("Unresolved:       {}", report.unresolved_matches);
            print_skipped("Malformed:", &report.malformed);
            print_skipped("No tournament:", &report.ungrouped);
            print_skipped("Combo skips:", &report.combo_skips);
            println!("Mixed practice:   {}", report.mixed_practice.len());
            for w in &report.mixed_practice {
                println!(
                    "  {}: {} practice / {} competitive",
                    w.grouping_key, w.practice_matches, w.competitive_matches
                );
            }
        }
    }

    Ok(())
}

fn load_matches(storage: &StorageConfig, input: Option<&str>) -> Result<Vec<MatchRecord>> {
    let path = input
        .map(PathBuf::from)
        .unwrap_or_else(|| storage.matches_path());
    let store = MatchStore::open(path);
    let outcome = store
        .load_all()
        .with_context(|| format!("reading {:?}", store.path()))?;
    if !outcome.bad_lines.is_empty() {
        tracing::warn!(
            "{} unparseable lines in {:?}",
            outcome.bad_lines.len(),
            store.path()
        );
    }
    Ok(outcome.entities)
}

fn build_filter(
    config: &AppConfig,
    practice: Option<&str>,
    tournament: Option<String>,
) -> Result<MatchFilter> {
    let policy = match practice {
        Some(p) => p.parse()?,
        None => config.selection.practice,
    };
    let mut filter = MatchFilter::new(policy);
    if let Some(t) = tournament {
        filter = filter.for_grouping(t);
    }
    Ok(filter)
}

fn print_standings(report: &StandingsReport) {
    println!(
        "{:>4}  {:<24} {:>3} {:>3} {:>5} {:>3} {:>5} {:>6}",
        "Rank", "Participant", "W", "L", "Score", "TB", "Buch", "Diff"
    );
    for s in &report.standings {
        println!(
            "{:>4}  {:<24} {:>3} {:>3} {:>5} {:>3} {:>5} {:>+6}",
            s.rank, s.participant, s.wins, s.losses, s.score, s.tb, s.buchholz, s.points_diff
        );
    }
    if !report.skipped.is_empty() {
        println!("\n{} malformed records skipped", report.skipped.len());
    }
}

fn print_skipped(label: &str, skipped: &[SkippedRecord]) {
    println!("{:<17} {}", label, skipped.len());
    for s in skipped {
        println!("  #{}: {}", s.index, s.reason);
    }
}

fn print_combos(rows: &[&EntityPerformance]) {
    println!(
        "{:<32} {:>5} {:>5} {:>7} {:>7} {:>7} {:>9}",
        "Combo", "W", "L", "Win%", "Wtd%", "Pts/M", "Score"
    );
    for p in rows {
        println!(
            "{:<32} {:>5} {:>5} {:>6.1}% {:>6.1}% {:>7.2} {:>9.2}",
            p.key.to_string(),
            p.wins,
            p.losses,
            p.win_rate * 100.0,
            p.weighted_win_rate * 100.0,
            p.avg_points_per_match,
            p.composite_score
        );
    }
}
