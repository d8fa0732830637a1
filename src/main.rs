use std::path::PathBuf;

use anyhow::{ensure, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod db;
mod models;
mod pivot;
mod report;
mod stats;
mod structure;
mod view;

use models::{CourseTree, UserMatrix};
use structure::CourseIndex;
use view::ViewMode;

#[derive(Parser)]
#[command(name = "engagement-matrix")]
#[command(about = "Per-student engagement pivot tables for course content", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load a demo course structure and visit set
    Seed,
    /// Load a course structure snapshot from a JSON file
    LoadStructure {
        #[arg(long)]
        json: PathBuf,
    },
    /// Import visit records from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print engagement statistics for a date window
    Stats {
        #[arg(long)]
        course: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Export the pivot table as CSV
    Export {
        #[arg(long)]
        course: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, value_enum, default_value = "grouped")]
        mode: ViewMode,
        #[arg(long, default_value = "engagement.csv")]
        out: PathBuf,
    },
    /// Generate a markdown report
    Report {
        #[arg(long)]
        course: String,
        #[arg(long)]
        from: NaiveDate,
        #[arg(long)]
        to: NaiveDate,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
}

/// Everything a reporting command needs for one (structure, window) pair.
struct Window {
    tree: CourseTree,
    index: CourseIndex,
    matrix: UserMatrix,
    chapter_rows: UserMatrix,
}

async fn load_window(
    pool: &PgPool,
    course: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> anyhow::Result<Option<Window>> {
    ensure!(
        from <= to,
        "start date {from} must not be after end date {to}"
    );

    let tree = db::fetch_structure(pool, course).await?;
    let index = CourseIndex::build(&tree)?;
    if index.is_empty() {
        println!("No columns to aggregate for {}.", tree.name);
        return Ok(None);
    }

    let records = db::fetch_visit_sums(pool, course, from, to).await?;
    let matrix = pivot::densify(&records, &index);
    if matrix.student_count() == 0 {
        println!("No visits recorded for {} in this window.", tree.name);
        return Ok(None);
    }

    let chapter_rows = pivot::rollup(&matrix, &index);
    Ok(Some(Window {
        tree,
        index,
        matrix,
        chapter_rows,
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a production Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
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
        Commands::LoadStructure { json } => {
            let raw = std::fs::read_to_string(&json)
                .with_context(|| format!("failed to read {}", json.display()))?;
            let tree: CourseTree =
                serde_json::from_str(&raw).context("structure file is not a valid course tree")?;
            let index = CourseIndex::build(&tree)?;
            db::store_structure(&pool, &tree, &raw).await?;
            println!(
                "Structure for {} loaded ({} verticals across {} chapters).",
                tree.id,
                index.column_count(),
                index.chapter_count()
            );
        }
        Commands::Import { csv } => {
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} visits from {}.", csv.display());
        }
        Commands::Stats {
            course,
            from,
            to,
            limit,
        } => {
            let Some(window) = load_window(&pool, &course, from, to).await? else {
                return Ok(());
            };

            let chapters = stats::chapter_usage(&window.chapter_rows, &window.index);
            let chapter_devs =
                stats::column_std_devs(&window.chapter_rows, window.index.chapter_count());
            let ranked =
                stats::rank_by_total(&stats::vertical_usage(&window.matrix, &window.index));

            println!(
                "{}: {} students over {} content units.",
                window.tree.name,
                window.matrix.student_count(),
                window.index.column_count()
            );
            println!("Engagement by chapter:");
            for (usage, std_dev) in chapters.iter().zip(chapter_devs.iter()) {
                let dev = std_dev
                    .map(|d| format!("{d:.2}"))
                    .unwrap_or_else(|| "n/a".to_string());
                println!(
                    "- {}: total {} from {} students (std dev {dev})",
                    usage.name, usage.total, usage.students
                );
            }
            println!("Top verticals:");
            for usage in ranked.iter().take(limit) {
                println!(
                    "- {} ({}): total {} from {} students",
                    usage.position, usage.tooltip, usage.total, usage.students
                );
            }
        }
        Commands::Export {
            course,
            from,
            to,
            mode,
            out,
        } => {
            let Some(window) = load_window(&pool, &course, from, to).await? else {
                return Ok(());
            };

            let table = view::project(mode, &window.index, &window.matrix, &window.chapter_rows);
            let file = std::fs::File::create(&out)
                .with_context(|| format!("failed to create {}", out.display()))?;
            view::write_csv(&table, file)?;
            println!(
                "Export written to {} ({} students).",
                out.display(),
                table.rows.len()
            );
        }
        Commands::Report {
            course,
            from,
            to,
            out,
        } => {
            let Some(window) = load_window(&pool, &course, from, to).await? else {
                return Ok(());
            };

            let report = report::build_report(
                &window.tree,
                from,
                to,
                &window.index,
                &window.matrix,
                &window.chapter_rows,
            );
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
