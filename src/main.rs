//! LabelGuard - Legal Metrology label compliance scanner
//!
//! Sends a product-label photo to an external OCR service, parses the
//! recognized text into structured label fields, and checks the fields
//! against the Legal Metrology labeling rules. The local rule set is a
//! client-side approximation; the backend rule engine has the last word
//! when configured.

mod analysis;
mod app;
mod config;
mod remote;
mod vision;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::io::Read;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use crate::app::{CompareOutcome, ScanPipeline, ScanReport};
use crate::config::AppConfig;
use crate::remote::ProductInfo;

/// LabelGuard - label compliance scanner
#[derive(Parser, Debug)]
#[command(name = "labelguard")]
#[command(about = "Checks e-commerce product labels against Legal Metrology rules")]
struct Args {
    /// Path to a configuration file (defaults to the platform config dir)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit machine-readable JSON instead of human-readable output
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run OCR on a label image and validate the extracted fields
    Scan {
        /// Path to the label image
        image: PathBuf,

        /// Barcode to look up for catalog enrichment
        #[arg(short, long)]
        barcode: Option<String>,

        /// Cross-check with the remote rule engine
        #[arg(long)]
        authoritative: bool,
    },
    /// Validate already-recognized label text (file path, or '-' for stdin)
    Parse {
        input: String,
    },
    /// Compare a reference product image against a captured label image
    Compare {
        /// Reference image: local path or http(s) URL
        reference: String,

        /// Captured image path
        candidate: PathBuf,
    },
    /// Look a product up by barcode in the catalog
    Lookup {
        barcode: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();
    let config = load_or_create_config(args.config.as_deref());
    let pipeline = ScanPipeline::from_config(&config)?;

    match args.command {
        Command::Scan {
            image,
            barcode,
            authoritative,
        } => {
            let remote_validation = authoritative || config.scan.remote_validation;
            let report = pipeline
                .scan(&image, barcode.as_deref(), remote_validation)
                .await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Parse { input } => {
            let raw_text = read_text_input(&input)?;
            let report = app::report_for_text(&raw_text);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Command::Compare {
            reference,
            candidate,
        } => {
            let outcome = pipeline.compare(&reference, &candidate).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_comparison(&outcome);
            }
        }
        Command::Lookup { barcode } => {
            let product = pipeline.lookup(&barcode).await?;
            if args.json {
                println!("{}", serde_json::to_string_pretty(&product)?);
            } else {
                print_product(&product);
            }
        }
    }

    Ok(())
}

/// Load configuration from file or fall back to defaults.
fn load_or_create_config(path: Option<&std::path::Path>) -> AppConfig {
    if let Some(path) = path {
        match config::load_config(path) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                return config;
            }
            Err(err) => {
                tracing::warn!("Could not load {}: {err:#}", path.display());
            }
        }
    } else if let Ok(dir) = config::config_dir() {
        let default_path = dir.join("config.toml");
        if default_path.exists() {
            if let Ok(config) = config::load_config(&default_path) {
                info!("Loaded configuration from {}", default_path.display());
                return config;
            }
        }
    }

    info!("Using default configuration");
    AppConfig::default()
}

/// Read raw label text from a file or stdin.
fn read_text_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut text = String::new();
        std::io::stdin().read_to_string(&mut text)?;
        Ok(text)
    } else {
        Ok(std::fs::read_to_string(input)?)
    }
}

fn print_report(report: &ScanReport) {
    println!("Scan {}", report.scan_id);
    println!();

    println!("Extracted fields:");
    print_field("generic name", &report.fields.generic_name);
    print_field("mrp", &report.fields.mrp);
    print_field("net quantity", &report.fields.net_quantity);
    print_field("unit", &report.fields.unit);
    print_field("manufacturer", &report.fields.manufacturer_name);
    print_field("address", &report.fields.manufacturer_address);
    print_field("month/year", &report.fields.month_year);
    print_field("consumer care", &report.fields.consumer_care);
    println!();

    println!("Rules:");
    for result in &report.rule_results {
        println!(
            "  [{}] {} (confidence {:.2})",
            if result.passed { "pass" } else { "FAIL" },
            result.rule_key,
            result.confidence
        );
    }
    println!();

    if report.summary.compliant {
        println!("Label is compliant");
    } else {
        println!(
            "Label is NOT compliant: {} violation(s)",
            report.summary.violation_count
        );
    }

    if let Some(enrichment) = &report.enrichment {
        println!();
        println!("Catalog cross-check ({}):", enrichment.product.barcode);
        for m in &enrichment.field_matches {
            println!(
                "  [{}] {}: label {:?} vs catalog {:?} (score {:.2})",
                if m.matches { "ok" } else { "MISMATCH" },
                m.field_name,
                m.extracted.as_deref().unwrap_or("-"),
                m.expected,
                m.similarity_score
            );
        }
    }

    if let Some(remote) = &report.remote_summary {
        println!();
        if remote.compliant {
            println!("Rule engine agrees: compliant");
        } else {
            println!("Rule engine violations: {}", remote.violations.join(", "));
        }
    }
}

fn print_field(name: &str, value: &Option<String>) {
    match value {
        Some(value) => println!("  {name}: {value}"),
        None => println!("  {name}: (not found)"),
    }
}

fn print_comparison(outcome: &CompareOutcome) {
    let strategy = match outcome.strategy {
        vision::StrategyKind::AverageHash => "average hash",
        vision::StrategyKind::LabelColor => "label/color",
    };
    println!("Strategy: {strategy}");
    println!("Similarity: {:.2}", outcome.report.similarity);
    println!("Verdict: {:?}", outcome.report.verdict);
    for flag in &outcome.report.flags {
        if flag.present {
            println!("  flag: {:?}", flag.key);
        }
    }
}

fn print_product(product: &ProductInfo) {
    println!("Barcode: {}", product.barcode);
    print_field("name", &product.name);
    print_field("brand", &product.brand);
    print_field("mrp", &product.mrp);
    print_field("net quantity", &product.net_quantity);
    print_field("unit", &product.unit);
}
