use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "pinger-cli")]
#[command(about = "Query the status API of a running rpc-pinger", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check that the pinger is up
    Health,
    /// Show every cluster's endpoints and latest loss window
    Status,
    /// Show one cluster
    Cluster { name: String },
    /// Print only the selected endpoint of each cluster
    Current,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/health", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Status => {
            let res = client.get(format!("{}/status", base)).send().await?;
            print_response(res).await?;
        }
        Commands::Cluster { name } => {
            let res = client.get(format!("{}/status/{}", base, name)).send().await?;
            print_response(res).await?;
        }
        Commands::Current => {
            let res = client.get(format!("{}/status", base)).send().await?;
            if let Some(json) = read_json(res).await? {
                for cluster in json.as_array().into_iter().flatten() {
                    let loss = cluster["last_window"]["loss_ratio"]
                        .as_f64()
                        .map(|r| format!("{:.2}%", r * 100.0))
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "{:<16} {:<48} loss {}",
                        cluster["cluster"].as_str().unwrap_or("?"),
                        cluster["current_endpoint"].as_str().unwrap_or("?"),
                        loss
                    );
                }
            }
        }
    }

    Ok(())
}

async fn read_json(res: reqwest::Response) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: status API returned {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(None);
    }
    Ok(Some(res.json().await?))
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(json) = read_json(res).await? {
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}
