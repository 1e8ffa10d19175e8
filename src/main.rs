use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context};
use chrono::{Local, NaiveDate, NaiveTime, Weekday};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

mod config;
mod db;
mod display;
mod error;
mod import;
mod logging;
mod models;
mod reminders;
mod report;
mod stats;

use crate::display::{format_average, Mood};
use crate::models::{Category, DailyRecord, RecordInput, RollingAverages};
use crate::reminders::{Permission, ReminderService};

#[derive(Parser)]
#[command(name = "daily-metrics")]
#[command(about = "Daily self-ratings journal with rolling averages", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the default categories and a few sample days
    Seed,
    /// Import daily records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Record ratings and notes for a day
    Record {
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long = "rating", value_name = "CATEGORY=VALUE")]
        ratings: Vec<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List the most recent entries
    Entries {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Manage rating categories
    Categories {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Show rolling averages for every active category
    Summary {
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        as_of: Option<NaiveDate>,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Configure local reminders
    Reminders {
        #[command(subcommand)]
        action: ReminderCommand,
    },
}

#[derive(Subcommand)]
enum CategoryCommand {
    /// List all categories, including inactive ones
    List,
    /// Add or rename a category
    Add {
        identifier: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, default_value_t = 0)]
        order: i32,
    },
    Activate {
        identifier: String,
    },
    Deactivate {
        identifier: String,
    },
}

#[derive(Subcommand)]
enum ReminderCommand {
    Show,
    Set {
        #[arg(long)]
        daily: Option<bool>,
        #[arg(long, value_parser = parse_time)]
        daily_time: Option<NaiveTime>,
        #[arg(long)]
        weekly: Option<bool>,
        #[arg(long, value_parser = parse_weekday)]
        weekly_day: Option<Weekday>,
        #[arg(long, value_parser = parse_time)]
        weekly_time: Option<NaiveTime>,
    },
    /// Record the outcome of a notification permission prompt
    Permission {
        #[arg(value_enum)]
        state: PermissionArg,
    },
    /// List upcoming reminder times
    Next {
        #[arg(long, default_value_t = 5)]
        count: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum PermissionArg {
    Grant,
    Deny,
    Reset,
}

impl From<PermissionArg> for Permission {
    fn from(value: PermissionArg) -> Self {
        match value {
            PermissionArg::Grant => Permission::Granted,
            PermissionArg::Deny => Permission::Denied,
            PermissionArg::Reset => Permission::Undetermined,
        }
    }
}

#[derive(Serialize)]
struct SummaryRow<'a> {
    identifier: &'a str,
    display_name: &'a str,
    averages: RollingAverages,
    mood: Mood,
    color_hex: &'static str,
}

fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| format!("expected HH:MM, got '{raw}'"))
}

fn parse_weekday(raw: &str) -> Result<Weekday, String> {
    raw.parse()
        .map_err(|_| format!("expected a weekday such as 'mon', got '{raw}'"))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Loads what the read-only views need, falling back to empty data when
/// storage is unavailable.
async fn load_snapshot(pool: &PgPool) -> (Vec<Category>, Vec<DailyRecord>) {
    let categories = db::fetch_active_categories(pool)
        .await
        .unwrap_or_else(|err| {
            warn!(error = %err, "failed to fetch categories; showing none");
            Vec::new()
        });
    let records = db::fetch_records(pool).await.unwrap_or_else(|err| {
        warn!(error = %err, "failed to fetch records; averages fall back to zero");
        Vec::new()
    });
    (categories, records)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::AppConfig::from_env()?;
    logging::init_tracing(&config.log_level);

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let file = std::fs::File::open(&csv)
                .with_context(|| format!("failed to open {}", csv.display()))?;
            let inputs = import::parse_records(file)?;
            let known = db::fetch_categories(&pool).await?;
            for input in &inputs {
                models::ensure_known_categories(&input.ratings, &known)
                    .with_context(|| format!("{} on {}", csv.display(), input.date))?;
            }
            for input in &inputs {
                db::upsert_record(&pool, input).await?;
            }
            info!(count = inputs.len(), path = %csv.display(), "import finished");
            println!("Imported {} days from {}.", inputs.len(), csv.display());
        }
        Commands::Record {
            date,
            ratings,
            notes,
        } => {
            if ratings.is_empty() && notes.is_none() {
                bail!("nothing to record: pass --rating CATEGORY=VALUE or --notes");
            }
            let parsed = ratings
                .iter()
                .map(|raw| models::parse_assignment(raw))
                .collect::<Result<BTreeMap<_, _>, _>>()?;
            models::ensure_known_categories(&parsed, &db::fetch_categories(&pool).await?)?;
            let input = RecordInput {
                date: date.unwrap_or_else(today),
                ratings: parsed,
                notes,
            };
            db::upsert_record(&pool, &input).await?;
            println!("Saved {} rating(s) for {}.", input.ratings.len(), input.date);
        }
        Commands::Entries { limit } => {
            let categories = db::fetch_active_categories(&pool).await?;
            let mut records = db::fetch_records(&pool).await?;
            records.sort_by(|a, b| b.date.cmp(&a.date));

            if records.is_empty() {
                println!("No entries yet.");
                return Ok(());
            }

            for record in records.iter().take(limit) {
                let ratings: Vec<String> = categories
                    .iter()
                    .map(|c| format!("{} {}", c.display_name, record.rating(&c.identifier)))
                    .collect();
                println!("- {}: {}", record.date, ratings.join(", "));
                if !record.notes.is_empty() {
                    println!("  {}", record.notes);
                }
            }
        }
        Commands::Categories { action } => match action {
            CategoryCommand::List => {
                for category in db::fetch_categories(&pool).await? {
                    println!(
                        "{:>3}  {} ({}){}",
                        category.display_order,
                        category.display_name,
                        category.identifier,
                        if category.active { "" } else { " [inactive]" }
                    );
                }
            }
            CategoryCommand::Add {
                identifier,
                name,
                order,
            } => {
                let identifier = models::normalize_category(&identifier);
                if identifier.is_empty() {
                    bail!("category identifier must not be empty");
                }
                let name = name.unwrap_or_else(|| identifier.clone());
                db::upsert_category(&pool, &Category::new(&identifier, &name, order)).await?;
                println!("Category '{identifier}' saved.");
            }
            CategoryCommand::Activate { identifier } => {
                let identifier = models::normalize_category(&identifier);
                if !db::set_category_active(&pool, &identifier, true).await? {
                    bail!("no category named '{identifier}'");
                }
                println!("Category '{identifier}' activated.");
            }
            CategoryCommand::Deactivate { identifier } => {
                let identifier = models::normalize_category(&identifier);
                if !db::set_category_active(&pool, &identifier, false).await? {
                    bail!("no category named '{identifier}'");
                }
                println!("Category '{identifier}' deactivated.");
            }
        },
        Commands::Summary { as_of, json } => {
            let as_of = as_of.unwrap_or_else(today);
            let (categories, records) = load_snapshot(&pool).await;
            let summaries = stats::summarize(&categories, &records, as_of);

            if json {
                let rows: Vec<SummaryRow> = categories
                    .iter()
                    .zip(summaries.iter())
                    .map(|(category, summary)| {
                        let mood = Mood::from_average(summary.averages.trailing_10);
                        SummaryRow {
                            identifier: &category.identifier,
                            display_name: &category.display_name,
                            averages: summary.averages,
                            mood,
                            color_hex: mood.color.hex(),
                        }
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }

            if summaries.is_empty() {
                println!("No active categories.");
                return Ok(());
            }

            println!("Rolling averages as of {as_of}:");
            for (category, summary) in categories.iter().zip(summaries.iter()) {
                let averages = summary.averages;
                println!(
                    "{} {:<12} all time {:>5}  10d {:>5}  30d {:>5}",
                    Mood::from_average(averages.trailing_10).glyph,
                    category.display_name,
                    format_average(averages.all_time),
                    format_average(averages.trailing_10),
                    format_average(averages.trailing_30)
                );
            }
        }
        Commands::Report { as_of, out } => {
            let as_of = as_of.unwrap_or_else(today);
            let (categories, records) = load_snapshot(&pool).await;
            let report = report::build_report(&categories, &records, as_of);
            report::write_report(&out, &report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Reminders { action } => {
            let (mut settings, permission) = db::load_reminder_settings(&pool).await?;
            let service = ReminderService::new(permission);

            match action {
                ReminderCommand::Show => {
                    println!("Permission: {}", service.permission());
                    println!(
                        "Daily:  {} at {}",
                        if settings.daily_enabled { "on" } else { "off" },
                        settings.daily_time.format("%H:%M")
                    );
                    println!(
                        "Weekly: {} on {} at {}",
                        if settings.weekly_enabled { "on" } else { "off" },
                        settings.weekly_day,
                        settings.weekly_time.format("%H:%M")
                    );
                }
                ReminderCommand::Set {
                    daily,
                    daily_time,
                    weekly,
                    weekly_day,
                    weekly_time,
                } => {
                    if let Some(value) = daily {
                        settings.daily_enabled = value;
                    }
                    if let Some(value) = daily_time {
                        settings.daily_time = value;
                    }
                    if let Some(value) = weekly {
                        settings.weekly_enabled = value;
                    }
                    if let Some(value) = weekly_day {
                        settings.weekly_day = value;
                    }
                    if let Some(value) = weekly_time {
                        settings.weekly_time = value;
                    }
                    db::save_reminder_settings(&pool, &settings, service.permission()).await?;
                    let scheduled = service.plan(&settings);
                    println!("Reminder settings saved; {} reminder(s) active.", scheduled.len());
                }
                ReminderCommand::Permission { state } => {
                    let service = service.with_permission(state.into());
                    db::save_reminder_settings(&pool, &settings, service.permission()).await?;
                    println!("Notification permission is now {}.", service.permission());
                }
                ReminderCommand::Next { count } => {
                    let now = Local::now().naive_local();
                    let upcoming = service.upcoming(&settings, now, count);
                    if upcoming.is_empty() {
                        println!("No reminders scheduled.");
                    }
                    for occurrence in upcoming {
                        println!(
                            "- {} {}",
                            occurrence.at.format("%a %Y-%m-%d %H:%M"),
                            occurrence.kind.message()
                        );
                    }
                }
            }
        }
    }

    Ok(())
}
