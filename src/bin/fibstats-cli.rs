use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

use fibstats::rpc::types::HealthResponse;
use fibstats::{ComputeClient, RpcError, StatsClient};

#[derive(Parser)]
#[command(name = "fibstats-cli")]
#[command(about = "Management CLI for the fibstats services", long_about = None)]
struct Cli {
    #[arg(long, default_value = "http://localhost:5001")]
    compute_url: String,

    #[arg(long, default_value = "http://localhost:5002")]
    stats_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute Fib(n) on the compute service
    Fib { n: i32 },
    /// Show the aggregated latency statistics
    Stats,
    /// Record an observation by hand
    Record {
        n: i32,
        /// Duration in milliseconds
        duration_ms: u64,
    },
    /// Check both services
    Health,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fib { n } => {
            let client = ComputeClient::new(&cli.compute_url)?;
            let value = client.compute_fib(n).await;
            print_result(value.map(|value| json!({ "n": n, "value": value })))?;
        }
        Commands::Stats => {
            let client = StatsClient::new(&cli.stats_url)?;
            print_result(client.get_stats_snapshot().await)?;
        }
        Commands::Record { n, duration_ms } => {
            let client = StatsClient::new(&cli.stats_url)?;
            let accepted = client
                .record_observation(n, Duration::from_millis(duration_ms))
                .await;
            print_result(accepted.map(|accepted| json!({ "accepted": accepted })))?;
        }
        Commands::Health => {
            let compute = ComputeClient::new(&cli.compute_url)?.health().await;
            let stats = StatsClient::new(&cli.stats_url)?.health().await;
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    "compute": health_entry(&cli.compute_url, compute),
                    "stats": health_entry(&cli.stats_url, stats),
                }))?
            );
        }
    }

    Ok(())
}

fn health_entry(url: &str, result: Result<HealthResponse, RpcError>) -> serde_json::Value {
    match result {
        Ok(health) => json!({ "url": url, "status": health.status, "service": health.service }),
        Err(e) => json!({ "url": url, "status": "unreachable", "error": e.to_string() }),
    }
}

fn print_result<T: Serialize>(result: Result<T, RpcError>) -> Result<(), Box<dyn std::error::Error>> {
    match result {
        Ok(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
