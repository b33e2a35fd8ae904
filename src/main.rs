use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::EnvFilter;

mod db;
mod error;
mod leaderboard;
mod metrics;
mod models;
mod notify;
mod stats;
mod window;

use error::ReportError;
use models::{EmergencyAlert, LeaderboardEntry};

#[derive(Parser)]
#[command(name = "callcenter-reporting")]
#[command(about = "Agent performance reporting for the call-center backend", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import calls (with optional survey ratings) from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Register a new agent
    CreateAgent {
        #[arg(long)]
        name: String,
        #[arg(long)]
        surname: String,
    },
    /// List all agents
    Agents,
    /// Show one agent
    Agent { id: i64 },
    /// Average survey rating for an agent on one day
    DailyRating { id: i64, date: String },
    /// All-time average survey rating for an agent
    OverallRating { id: i64 },
    /// Best-rated agent over the month ending at the given date
    MonthlyBest { date: String },
    /// Agent with the most calls on one day
    BusiestAgent { date: String },
    /// Daily leaderboard by average rating, or one agent's rank
    RatingLeaderboard {
        date: String,
        #[arg(long)]
        agent: Option<i64>,
        #[arg(long)]
        json: bool,
    },
    /// Daily leaderboard by call volume per display name, or one name's rank
    CallLeaderboard {
        date: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Per-agent average ratings over the month ending at the given date
    RatingAverages {
        date: String,
        #[arg(long)]
        json: bool,
    },
    /// Most frequent sentiment label across an agent's calls
    SentimentMode { id: i64 },
    /// All-time average call duration for an agent, as MM:SS
    AvgDuration { id: i64 },
    /// Average call duration per month over the trailing five months
    MonthlyDurations {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    /// Call count for an agent, all-time or on one day
    CallCount {
        id: i64,
        #[arg(long)]
        date: Option<String>,
    },
    /// Active/inactive agent split by most recent call state
    ActiveAgents,
    /// Broadcast an EMERGENCIA alert for an agent
    Emergency {
        id: i64,
        name: String,
        surname: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;

    if let Err(err) = run(cli.command, &pool).await {
        // NotFound and InvalidInput are "no result" responses; everything
        // else is a genuine failure.
        if err.is_no_result() {
            println!("No result: {err}");
        } else {
            return Err(err.into());
        }
    }

    Ok(())
}

async fn run(command: Commands, pool: &PgPool) -> Result<(), ReportError> {
    match command {
        Commands::InitDb => {
            db::init_db(pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(pool, &csv).await?;
            println!("Inserted {inserted} calls from {}.", csv.display());
        }
        Commands::CreateAgent { name, surname } => {
            let agent = db::create_agent(pool, &name, &surname).await?;
            println!("Created agent {} ({}).", agent.display_name(), agent.id);
        }
        Commands::Agents => {
            for agent in db::list_agents(pool).await? {
                println!("{}: {}", agent.id, agent.display_name());
            }
        }
        Commands::Agent { id } => {
            let agent = db::get_agent(pool, id)
                .await?
                .ok_or_else(|| ReportError::not_found(format!("agent {id} does not exist")))?;
            println!("{}: {}", agent.id, agent.display_name());
        }
        Commands::DailyRating { id, date } => {
            let average = metrics::daily_rating_average(pool, id, &date).await?;
            println!("{:.2}", metrics::round2(average));
        }
        Commands::OverallRating { id } => {
            let average = metrics::overall_rating_average(pool, id).await?;
            println!("{:.2}", metrics::round2(average));
        }
        Commands::MonthlyBest { date } => {
            let best = metrics::best_rated_agent_of_month(pool, &date).await?;
            println!("{} (avg rating {:.2})", best.label, best.value);
        }
        Commands::BusiestAgent { date } => {
            let busiest = metrics::busiest_agent_of_day(pool, &date).await?;
            println!("{} ({} calls)", busiest.label, busiest.value as u64);
        }
        Commands::RatingLeaderboard { date, agent, json } => match agent {
            Some(agent_id) => {
                let rank = metrics::daily_rating_rank(pool, &date, agent_id).await?;
                println!("Rank {rank}");
            }
            None => {
                let board = metrics::daily_rating_leaderboard(pool, &date).await?;
                print_board(&board, json, |entry| format!("avg {:.2}", entry.value))?;
            }
        },
        Commands::CallLeaderboard { date, name, json } => match name {
            Some(name) => {
                let rank = metrics::daily_call_rank(pool, &date, &name).await?;
                println!("Rank {rank}");
            }
            None => {
                let board = metrics::daily_call_leaderboard(pool, &date).await?;
                print_board(&board, json, |entry| format!("{} calls", entry.value as u64))?;
            }
        },
        Commands::RatingAverages { date, json } => {
            let averages = metrics::monthly_rating_averages(pool, &date).await?;
            if json {
                println!("{}", to_json(&averages)?);
            } else {
                for avg in averages {
                    println!("{}: {:.2}", avg.agent, avg.value);
                }
            }
        }
        Commands::SentimentMode { id } => match metrics::sentiment_mode(pool, id).await? {
            Some(label) => println!("{label}"),
            None => println!("No sentiment recorded."),
        },
        Commands::AvgDuration { id } => {
            println!("{}", metrics::average_call_duration(pool, id).await?);
        }
        Commands::MonthlyDurations { id, json } => {
            let months = metrics::monthly_average_durations(pool, id).await?;
            if json {
                println!("{}", to_json(&months)?);
            } else {
                for month in months {
                    println!(
                        "{} {}: {}",
                        month.month_name,
                        month.year,
                        stats::format_duration(month.avg_duration_secs)
                    );
                }
            }
        }
        Commands::CallCount { id, date } => {
            let count = match date {
                Some(date) => metrics::daily_call_count(pool, id, &date).await?,
                None => metrics::total_call_count(pool, id).await?,
            };
            println!("{count}");
        }
        Commands::ActiveAgents => {
            let activity = db::agent_activity(pool).await?;
            println!("Active: {}, inactive: {}", activity.active, activity.inactive);
        }
        Commands::Emergency { id, name, surname } => {
            let addr = std::env::var("EMERGENCY_ADDR")
                .map_err(|_| ReportError::Publish("EMERGENCY_ADDR is not set".to_string()))?;
            let alert = EmergencyAlert::new(id, name, surname);
            notify::publish_emergency(&addr, &alert).await?;
            println!("EMERGENCIA sent for agent {}.", alert.id);
        }
    }

    Ok(())
}

fn print_board(
    board: &[LeaderboardEntry],
    json: bool,
    describe: impl Fn(&LeaderboardEntry) -> String,
) -> Result<(), ReportError> {
    if json {
        println!("{}", to_json(board)?);
    } else {
        for entry in board {
            println!("{}. {} ({})", entry.rank, entry.label, describe(entry));
        }
    }
    Ok(())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, ReportError> {
    serde_json::to_string_pretty(value)
        .map_err(|err| ReportError::invalid_input(format!("cannot encode output: {err}")))
}
