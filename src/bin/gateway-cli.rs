use std::path::PathBuf;

use axum::http::Uri;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use library_gateway::config::{load_config, GatewayConfig};
use library_gateway::http::upstream::target_uri;
use library_gateway::routing::RouteTable;
use library_gateway::security::PublicPaths;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Operator CLI for the library-booking gateway", long_about = None)]
struct Cli {
    /// Gateway configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe every service's health path through the gateway
    Health {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
    },
    /// Show how the gateway would treat a request path
    Resolve {
        /// Request path, optionally with a query string
        path: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    let report = match cli.command {
        Commands::Health { url } => health(&config, &url).await?,
        Commands::Resolve { path } => resolve(&config, &path)?,
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn health(config: &GatewayConfig, base_url: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let base_url = base_url.trim_end_matches('/');

    let mut services = Vec::new();
    for route in config.routes.iter() {
        let path = format!("{}health", route.path_prefix);
        let entry = match client.get(format!("{base_url}{path}")).send().await {
            Ok(res) => json!({
                "route": route.name,
                "path": path,
                "status": res.status().as_u16(),
                "healthy": res.status().is_success(),
            }),
            Err(e) => json!({
                "route": route.name,
                "path": path,
                "error": e.to_string(),
                "healthy": false,
            }),
        };
        services.push(entry);
    }

    let healthy = services.iter().all(|s| s["healthy"] == json!(true));
    Ok(json!({ "gateway": base_url, "healthy": healthy, "services": services }))
}

fn resolve(config: &GatewayConfig, path: &str) -> Result<Value, Box<dyn std::error::Error>> {
    let uri: Uri = path.parse()?;
    let table = RouteTable::from_config(&config.routes)?;
    let public = PublicPaths::new(config.auth.public_paths.clone()).is_public(uri.path());

    let report = match table.resolve(uri.path()) {
        Some(route) => json!({
            "path": path,
            "public": public,
            "route": route.name(),
            "prefix": route.prefix(),
            "upstream": target_uri(route, &uri)?.to_string(),
        }),
        None => json!({
            "path": path,
            "public": public,
            "route": Value::Null,
            "status": 404,
        }),
    };
    Ok(report)
}
