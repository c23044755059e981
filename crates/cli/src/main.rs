//! Demo driver: generates synthetic sales history and runs one full decision
//! per subcommand. Not an ingestion layer; the library crates are the product.

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{Duration, NaiveDate};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use stocksense_core::{ItemEconomics, SalesRecord};
use stocksense_forecast::SizeSalesRecord;
use stocksense_pipeline::{
    AllocationRequest, DecisionPipeline, PipelineConfig, ReorderRequest, StyleReorderRequest,
};
use stocksense_simulation::SimulatorConfig;

#[derive(Parser)]
#[command(name = "stocksense")]
#[command(about = "Inventory reorder decision engine (synthetic-data demo)", long_about = None)]
struct Cli {
    /// Monte Carlo trials per evaluation
    #[arg(long, global = true, default_value_t = 5_000)]
    simulations: usize,
    /// RNG seed for reproducible runs (drives both data generation and simulation)
    #[arg(long, global = true, default_value_t = 42)]
    seed: u64,
    /// Forecast horizon in days
    #[arg(long, global = true, default_value_t = 30)]
    horizon: usize,
    /// Days of synthetic sales history to generate
    #[arg(long, global = true, default_value_t = 365)]
    days: usize,
    /// Emit machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Recommend a reorder quantity for one synthetic item
    Recommend {
        /// Average daily demand of the generated item
        #[arg(long, default_value_t = 100.0)]
        demand: f64,
        /// Units currently on hand
        #[arg(long, default_value_t = 500.0)]
        inventory: f64,
        #[arg(long, default_value_t = 100.0)]
        unit_cost: f64,
        #[arg(long, default_value_t = 150.0)]
        selling_price: f64,
        /// Supplier lead time in days
        #[arg(long, default_value_t = 14)]
        lead_time: usize,
        #[arg(long, default_value_t = 0.0)]
        min_order: f64,
        #[arg(long, default_value_t = 1.0)]
        order_multiple: f64,
        #[arg(long, default_value_t = 3_000.0)]
        max_order: f64,
        /// Cash ceiling for this order
        #[arg(long)]
        cash: Option<f64>,
        /// Gut-feel quantity to compare against
        #[arg(long)]
        naive: Option<f64>,
    },
    /// Split a cash budget across three synthetic items
    Allocate {
        /// Total cash budget to split
        #[arg(long, default_value_t = 300_000.0)]
        cash: f64,
    },
    /// Recommend a factory-valid size curve for a synthetic footwear style
    Footwear {
        /// Average daily demand across the whole size run
        #[arg(long, default_value_t = 10.0)]
        demand: f64,
        #[arg(long, default_value_t = 900.0)]
        unit_cost: f64,
        #[arg(long, default_value_t = 1_800.0)]
        selling_price: f64,
        #[arg(long, default_value_t = 7)]
        lead_time: usize,
        /// Factory minimum order across all sizes
        #[arg(long, default_value_t = 60)]
        min_total: u32,
        /// Pack size every per-size quantity must align to
        #[arg(long, default_value_t = 12)]
        order_multiple: u32,
        #[arg(long)]
        max_total: Option<u32>,
        #[arg(long)]
        cash: Option<f64>,
    },
}

fn start_date(days: usize) -> NaiveDate {
    chrono::Utc::now().date_naive() - Duration::days(days as i64)
}

/// Daily demand: weekly seasonality around the level plus Gaussian noise,
/// floored at 0.
fn synthetic_history(rng: &mut ChaCha8Rng, days: usize, level: f64) -> Vec<SalesRecord> {
    let start = start_date(days);
    let noise = Normal::new(0.0, (level * 0.1).max(0.01)).ok();
    (0..days)
        .map(|i| {
            let date = start + Duration::days(i as i64);
            let weekly = 1.0 + 0.2 * (2.0 * std::f64::consts::PI * i as f64 / 7.0).sin();
            let jitter = noise.as_ref().map_or(0.0, |n| n.sample(rng));
            let demand = (level * weekly + jitter).max(0.0);
            SalesRecord::new(date, demand)
        })
        .collect()
}

fn synthetic_size_history(
    rng: &mut ChaCha8Rng,
    days: usize,
    style_level: f64,
    shares: &BTreeMap<String, f64>,
) -> Vec<SizeSalesRecord> {
    let start = start_date(days);
    let mut records = Vec::new();
    for i in 0..days {
        let date = start + Duration::days(i as i64);
        let weekly = 1.0 + 0.2 * (2.0 * std::f64::consts::PI * i as f64 / 7.0).sin();
        for (size, share) in shares {
            let level = style_level * share;
            let noise = Normal::new(0.0, (level * 0.15).max(0.01)).ok();
            let jitter = noise.as_ref().map_or(0.0, |n| n.sample(rng));
            let demand = (level * weekly + jitter).max(0.0);
            records.push(SizeSalesRecord::new(date, size.clone(), demand));
        }
    }
    records
}

fn size_run() -> BTreeMap<String, f64> {
    BTreeMap::from([
        ("6".to_string(), 0.05),
        ("7".to_string(), 0.15),
        ("8".to_string(), 0.30),
        ("9".to_string(), 0.25),
        ("10".to_string(), 0.15),
        ("11".to_string(), 0.10),
    ])
}

fn economics(unit_cost: f64, selling_price: f64, lead_time: usize) -> ItemEconomics {
    ItemEconomics {
        unit_cost,
        selling_price,
        holding_cost_rate: 0.02,
        markdown_rate: 0.0,
        churn_penalty: 0.0,
        lead_time_days: lead_time,
        min_order_quantity: 0.0,
        order_multiple: 1.0,
        max_order_quantity: 3_000.0,
    }
}

fn build_pipeline(cli: &Cli) -> DecisionPipeline {
    DecisionPipeline::new(PipelineConfig {
        forecast_horizon_days: cli.horizon,
        simulator: SimulatorConfig::default()
            .with_n_simulations(cli.simulations)
            .with_seed(cli.seed),
        ..PipelineConfig::default()
    })
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut rng = ChaCha8Rng::seed_from_u64(cli.seed);
    let mut pipeline = build_pipeline(&cli);

    match &cli.command {
        Commands::Recommend {
            demand,
            inventory,
            unit_cost,
            selling_price,
            lead_time,
            min_order,
            order_multiple,
            max_order,
            cash,
            naive,
        } => {
            let history = synthetic_history(&mut rng, cli.days, *demand);
            tracing::info!(days = history.len(), level = demand, "generated synthetic history");
            pipeline.train_item("demo-item", &history)?;

            let recommendation = pipeline.recommend(&ReorderRequest {
                item_id: "demo-item".to_string(),
                current_inventory: *inventory,
                economics: ItemEconomics {
                    min_order_quantity: *min_order,
                    order_multiple: *order_multiple,
                    max_order_quantity: *max_order,
                    ..economics(*unit_cost, *selling_price, *lead_time)
                },
                available_cash: *cash,
                naive_quantity: *naive,
            })?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&recommendation)?);
            } else {
                println!("{}", recommendation.explanation);
            }
        }
        Commands::Allocate { cash } => {
            // Three archetypes: a fast mover out of stock, a steady seller
            // with thin cover, and a shelf-warmer sitting on a pile.
            let items: [(&str, f64, f64); 3] = [
                ("fast-mover", 100.0, 0.0),
                ("steady", 40.0, 200.0),
                ("shelf-warmer", 5.0, 2_000.0),
            ];

            let mut requests = Vec::with_capacity(items.len());
            for (item_id, level, inventory) in items {
                let history = synthetic_history(&mut rng, cli.days, level);
                pipeline.train_item(item_id, &history)?;
                requests.push(AllocationRequest {
                    item_id: item_id.to_string(),
                    current_inventory: inventory,
                    economics: economics(100.0, 150.0, 14),
                    baseline_quantity: 0.0,
                });
            }

            let report = pipeline.allocate(&requests, *cash);
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", report.explanation);
                for failure in &report.outcome.failures {
                    eprintln!("skipped {}: {}", failure.item_id, failure.reason);
                }
            }
        }
        Commands::Footwear {
            demand,
            unit_cost,
            selling_price,
            lead_time,
            min_total,
            order_multiple,
            max_total,
            cash,
        } => {
            let shares = size_run();
            let history = synthetic_size_history(&mut rng, cli.days, *demand, &shares);
            // Core sizes start thin, fringe sizes empty.
            let current_inventory: BTreeMap<String, f64> = shares
                .keys()
                .map(|size| {
                    let on_hand = match size.as_str() {
                        "8" | "9" => 10.0,
                        "7" | "10" => 4.0,
                        _ => 0.0,
                    };
                    (size.clone(), on_hand)
                })
                .collect();

            let recommendation = pipeline.recommend_style(&StyleReorderRequest {
                style_id: "demo-style".to_string(),
                history,
                current_inventory,
                unit_cost: *unit_cost,
                selling_price: *selling_price,
                lead_time_days: *lead_time,
                min_order_total: *min_total,
                order_multiple: *order_multiple,
                max_order_total: *max_total,
                available_cash: *cash,
            })?;

            match recommendation {
                Some(style) if cli.json => {
                    println!("{}", serde_json::to_string_pretty(&style)?);
                }
                Some(style) => {
                    println!("{}", style.explanation);
                    for line in &style.sizes {
                        println!(
                            "  size {}: {} units ({:.1}% stockout risk, {})",
                            line.size,
                            line.quantity,
                            line.stockout_probability * 100.0,
                            line.risk_category
                        );
                    }
                }
                None => {
                    println!("No size curve fits the order constraints and cash on hand.");
                }
            }
        }
    }

    Ok(())
}
