use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use tracing::{error, warn};

use trafficbridge::config::AppConfig;
use trafficbridge::console::{self, ConsoleReviewer};
use trafficbridge::domain::{BillingType, OrderType, RevenueType, RunMetadata};
use trafficbridge::pipeline::review::{AutoFinalize, CorrectionSource};
use trafficbridge::pipeline::TransformPipeline;
use trafficbridge::{ingest, logging, output};

#[derive(Parser)]
#[command(name = "trafficbridge")]
#[command(about = "Converts scheduler traffic exports to the standardized billing format")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert one export through classification, review, and output
    Process {
        /// Source CSV export
        #[arg(long)]
        input: PathBuf,
        /// TOML configuration; built-in defaults when omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Billing CSV destination
        #[arg(long)]
        output: PathBuf,
        /// Where to write the run summary as JSON
        #[arg(long)]
        summary: Option<PathBuf>,
        /// Accept every classifier proposal without interactive review
        #[arg(long)]
        auto: bool,
        #[arg(long)]
        sales_person: String,
        #[arg(long, value_enum)]
        billing_type: BillingType,
        #[arg(long, value_enum)]
        revenue_type: RevenueType,
        #[arg(long, value_enum)]
        order_type: OrderType,
        /// Override the configured agency fee rate (e.g. 0.15)
        #[arg(long)]
        agency_fee: Option<Decimal>,
        #[arg(long, default_value = "")]
        estimate: String,
        #[arg(long, default_value = "")]
        contract: String,
        #[arg(long)]
        affidavit: bool,
    },
    /// Classify an export and list the description groups, no output written
    Inspect {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> trafficbridge::Result<AppConfig> {
    match path {
        Some(path) => AppConfig::load(path),
        None => Ok(AppConfig::default()),
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Process {
            input,
            config,
            output: output_path,
            summary,
            auto,
            sales_person,
            billing_type,
            revenue_type,
            order_type,
            agency_fee,
            estimate,
            contract,
            affidavit,
        } => {
            println!("🔄 Processing {}...", input.display());
            let config = load_config(config.as_ref())?;
            let document = ingest::read_source(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let pipeline = TransformPipeline::new(&config)?;

            if !config.sales_people.is_empty() && !config.sales_people.contains(&sales_person) {
                warn!(sales_person = %sales_person, "sales person not in the configured list");
                println!("⚠️  '{}' is not in the configured sales list", sales_person);
            }

            let metadata = RunMetadata {
                billing_type,
                revenue_type,
                order_type,
                agency_fee_rate: agency_fee,
                sales_person,
                estimate,
                contract,
                affidavit,
            };

            let mut console_reviewer;
            let mut auto_reviewer;
            let corrections: &mut dyn CorrectionSource = if auto {
                auto_reviewer = AutoFinalize;
                &mut auto_reviewer
            } else {
                console_reviewer = ConsoleReviewer::stdio(&config);
                &mut console_reviewer
            };

            let Some(result) = pipeline.run(&document, &metadata, corrections)? else {
                println!("❌ Review abandoned, no output written");
                return Ok(());
            };

            output::write_rows(&output_path, &result.rows)?;
            if let Some(summary_path) = &summary {
                output::write_summary(summary_path, &result.summary)?;
            }

            println!("\n📊 Run results:");
            println!("   Rows written: {}", result.summary.total_rows);
            println!("   Total gross: {:.2}", result.summary.total_gross);
            for (code, count) in &result.summary.language_counts {
                println!("   {}: {} rows", code, count);
            }
            if !result.summary.flagged.is_empty() {
                println!("\n⚠️  {} rows flagged for review:", result.summary.flagged.len());
                for flagged in &result.summary.flagged {
                    for defect in &flagged.defects {
                        println!("   row {}: {}", flagged.row + 1, defect);
                    }
                }
            }
            println!("✅ Wrote {}", output_path.display());
        }
        Commands::Inspect { input, config } => {
            let config = load_config(config.as_ref())?;
            let document = ingest::read_source(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let pipeline = TransformPipeline::new(&config)?;
            let session = pipeline.classify_batch(&document.rows);
            console::print_groups(&session, &session.groups());
        }
    }
    Ok(())
}

fn main() {
    logging::init_logging();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("run failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}
