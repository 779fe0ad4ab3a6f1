use std::path::PathBuf;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

mod catalog;
mod db;
mod engine;
mod models;
mod period;
mod report;
mod roles;

use models::DraftBook;
use period::{Period, Quarter};
use roles::{Action, Role};

#[derive(Parser)]
#[command(name = "kpi-tracker")]
#[command(about = "Pillar and KPI performance tracker with monthly approvals", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load the baseline pillars, KPIs and monthly submissions
    Seed,
    /// Import monthly submissions from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Submit monthly values for approval, one or more KPIs at once
    Submit {
        /// KPI=VALUE, repeatable
        #[arg(long = "value", required = true, value_parser = catalog::parse_keyed_value)]
        values: Vec<(String, f64)>,
        /// KPI=TEXT, repeatable
        #[arg(long = "comment", value_parser = catalog::parse_keyed_text)]
        comments: Vec<(String, String)>,
        /// KPI=FILE, repeatable
        #[arg(long = "evidence", value_parser = catalog::parse_keyed_text)]
        evidence: Vec<(String, String)>,
        /// Reporting period as YYYY-MM, defaults to the current month
        #[arg(long)]
        period: Option<String>,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        user: String,
    },
    /// List every submission still awaiting approval
    Pending {
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        role: Role,
    },
    /// Approve a pending monthly submission
    Approve {
        #[arg(long)]
        kpi: String,
        #[arg(long)]
        period: String,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        user: String,
    },
    /// Define a new custom KPI
    CreateKpi {
        #[arg(long)]
        id: String,
        #[arg(long)]
        pillar: Option<String>,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        unit: String,
        #[arg(long)]
        department: String,
        #[arg(long, default_value = "#")]
        metric_type: models::MetricType,
        #[arg(long, default_value = "monthly")]
        frequency: models::ReportingFrequency,
        /// Yearly target as YEAR=TARGET, repeatable
        #[arg(long = "target", value_parser = catalog::parse_yearly_target)]
        targets: Vec<(i32, f64)>,
        #[arg(long)]
        data_source: Option<String>,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        user: String,
    },
    /// Delete a custom KPI that has no submissions
    DeleteKpi {
        #[arg(long)]
        id: String,
        #[arg(long)]
        role: Role,
    },
    /// Define a new custom pillar
    CreatePillar {
        #[arg(long)]
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        /// Repeatable
        #[arg(long = "objective")]
        objectives: Vec<String>,
        #[arg(long)]
        role: Role,
        #[arg(long)]
        user: String,
    },
    /// Delete a pillar that no longer has KPIs
    DeletePillar {
        #[arg(long)]
        id: String,
        #[arg(long)]
        role: Role,
    },
    /// Move a pillar up or down in the display order
    MovePillar {
        #[arg(long)]
        id: String,
        #[arg(long)]
        direction: catalog::MoveDirection,
        #[arg(long)]
        role: Role,
    },
    /// Show derived status for KPIs
    Status {
        #[arg(long)]
        pillar: Option<String>,
        /// Required for roles limited to their own department
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        role: Role,
        /// Reporting period as YYYY-MM, defaults to the current month
        #[arg(long)]
        as_of: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Show quarterly and annual rollups for one KPI
    Progress {
        #[arg(long)]
        kpi: String,
        /// Quarter number 1-4, defaults to all quarters
        #[arg(long)]
        quarter: Option<u32>,
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
    },
    /// Generate a markdown performance report
    Report {
        #[arg(long)]
        year: Option<i32>,
        /// Reporting period as YYYY-MM, defaults to the current month
        #[arg(long)]
        as_of: Option<String>,
        #[arg(long)]
        role: Role,
        #[arg(long, default_value = "kpi-report.md")]
        out: PathBuf,
    },
    /// Print the permission set for a role
    Permissions {
        #[arg(long)]
        role: Role,
    },
}

fn reference_period(as_of: Option<&str>) -> anyhow::Result<Period> {
    match as_of {
        Some(raw) => Ok(Period::parse(raw)?),
        None => Ok(Period::from_date(Utc::now().date_naive())),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Permissions { role } = &cli.command {
        let granted = roles::permissions(*role);
        println!("{}", serde_json::to_string_pretty(&granted)?);
        return Ok(());
    }

    let database_url = std::env::var("DATABASE_URL")
        .context("DATABASE_URL must be set to a Postgres instance")?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("failed to connect to Postgres")?;
    info!("connected to database");

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
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} submissions from {}.", csv.display());
        }
        Commands::Submit {
            values,
            comments,
            evidence,
            period,
            role,
            user,
        } => {
            roles::require(role, Action::Submit)?;
            let period = reference_period(period.as_deref())?;

            let mut drafts = DraftBook::new();
            for (kpi, value) in values {
                drafts.set_value(&kpi, value);
            }
            for (kpi, comment) in comments {
                drafts.set_comment(&kpi, comment);
            }
            for (kpi, file) in evidence {
                drafts.add_evidence(&kpi, file);
            }
            if drafts.is_empty() {
                anyhow::bail!("nothing to submit");
            }

            let submissions = drafts
                .into_drafts()
                .into_iter()
                .map(|(kpi, draft)| db::Submission::from_draft(&kpi, period, &user, draft))
                .collect::<anyhow::Result<Vec<_>>>()?;

            for submission in submissions.iter() {
                db::submit(&pool, submission).await?;
                println!(
                    "Submitted {} for {} ({period}); awaiting approval.",
                    submission.value, submission.indicator_id
                );
            }
        }
        Commands::Pending { department, role } => {
            roles::require(role, Action::Approve)?;
            let department = roles::department_scope(role, department.as_deref())?;
            let indicators = db::fetch_indicators(&pool, None, department).await?;
            let queue = report::approval_queue(&indicators);

            if queue.is_empty() {
                println!("Nothing awaiting approval.");
                return Ok(());
            }

            println!("{} submissions awaiting approval:", queue.len());
            for item in queue.iter() {
                println!(
                    "- {} ({}) {}: {} from {} on {}",
                    item.indicator_name,
                    item.indicator_id,
                    item.period,
                    item.value,
                    item.submitted_by,
                    item.submitted_at.format("%Y-%m-%d")
                );
            }
        }
        Commands::Approve {
            kpi,
            period,
            role,
            user,
        } => {
            roles::require(role, Action::Approve)?;
            let period = Period::parse(&period)?;
            db::approve(&pool, &kpi, &period, &user).await?;
            println!("Approved {kpi} for {period}.");
        }
        Commands::CreateKpi {
            id,
            pillar,
            name,
            description,
            unit,
            department,
            metric_type,
            frequency,
            targets,
            data_source,
            role,
            user,
        } => {
            roles::require(role, Action::ManageKpis)?;
            let indicator = catalog::NewIndicator {
                id,
                pillar_id: pillar,
                name,
                description,
                unit,
                department,
                metric_type,
                reporting_frequency: frequency,
                yearly_targets: targets.into_iter().collect(),
                data_source,
            };
            db::create_indicator(&pool, &indicator, &user).await?;
            println!("Created {} ({}).", indicator.name, indicator.id);
        }
        Commands::DeleteKpi { id, role } => {
            roles::require(role, Action::ManageKpis)?;
            db::delete_indicator(&pool, &id).await?;
            println!("Deleted {id}.");
        }
        Commands::CreatePillar {
            id,
            name,
            description,
            objectives,
            role,
            user,
        } => {
            roles::require(role, Action::ManagePillars)?;
            let pillar = catalog::NewPillar {
                id,
                name,
                description,
                objectives,
            };
            db::create_pillar(&pool, &pillar, &user).await?;
            println!("Created pillar {} ({}).", pillar.name.trim(), pillar.id);
        }
        Commands::DeletePillar { id, role } => {
            roles::require(role, Action::ManagePillars)?;
            db::delete_pillar(&pool, &id).await?;
            println!("Deleted pillar {id}.");
        }
        Commands::MovePillar {
            id,
            direction,
            role,
        } => {
            roles::require(role, Action::ManagePillars)?;
            db::move_pillar(&pool, &id, direction).await?;
            for pillar in db::fetch_pillars(&pool).await? {
                println!("{}. {} ({})", pillar.display_order, pillar.name, pillar.id);
            }
        }
        Commands::Status {
            pillar,
            department,
            role,
            as_of,
            json,
        } => {
            let department = roles::department_scope(role, department.as_deref())?;
            let reference = reference_period(as_of.as_deref())?;
            let indicators = db::fetch_indicators(&pool, pillar.as_deref(), department).await?;

            if json {
                let rows: Vec<serde_json::Value> = indicators
                    .iter()
                    .map(|indicator| {
                        serde_json::json!({
                            "id": indicator.id,
                            "name": indicator.name,
                            "current": indicator.current_value,
                            "target": indicator.target_value,
                            "percentage": engine::indicator_percentage(indicator),
                            "status": engine::indicator_status(indicator),
                            "pending_approval": engine::is_pending_approval(&indicator.series, &reference),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }

            if indicators.is_empty() {
                println!("No KPIs match this filter.");
                return Ok(());
            }

            println!("KPI status as of {reference}:");
            for indicator in indicators.iter() {
                let pending = if engine::is_pending_approval(&indicator.series, &reference) {
                    " [pending approval]"
                } else {
                    ""
                };
                println!(
                    "- {} ({}) {} / {} {} = {}% {}{}",
                    indicator.name,
                    indicator.id,
                    indicator.current_value,
                    indicator.target_value,
                    indicator.unit,
                    engine::indicator_percentage(indicator),
                    engine::indicator_status(indicator).label(),
                    pending
                );
            }
        }
        Commands::Progress { kpi, quarter, year } => {
            let year = match year {
                Some(year) => year,
                None => reference_period(None)?.year(),
            };
            let quarters = match quarter {
                Some(number) => vec![Quarter::from_number(number)?],
                None => Quarter::ALL.to_vec(),
            };
            let indicator = db::fetch_indicator(&pool, &kpi).await?;

            println!("{} ({}) in {}:", indicator.name, indicator.id, year);
            for quarter in quarters {
                let progress = engine::quarterly_progress(&indicator, quarter, year);
                println!(
                    "- {quarter}: {progress} {}",
                    engine::classify(progress.percentage as f64).label()
                );
            }
            let annual = engine::annual_progress(&indicator, year);
            println!(
                "- Annual: {annual} {}",
                engine::classify(annual.percentage as f64).label()
            );
        }
        Commands::Report {
            year,
            as_of,
            role,
            out,
        } => {
            roles::require(role, Action::Export)?;
            let reference = reference_period(as_of.as_deref())?;
            let year = year.unwrap_or(reference.year());
            let pillars = db::fetch_pillars(&pool).await?;
            let indicators = db::fetch_indicators(&pool, None, None).await?;
            let report = report::build_report(year, &reference, &pillars, &indicators);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Permissions { .. } => {}
    }

    Ok(())
}
