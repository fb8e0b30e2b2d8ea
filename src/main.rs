//! Pokemon gateway entry point.

use std::net::SocketAddr;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pokemon_gateway::api::{create_router, AppState};
use pokemon_gateway::config::Config;
use pokemon_gateway::lookup::PokemonClient;
use pokemon_gateway::metrics;
use pokemon_gateway::utils::shutdown_signal;

/// HTTP gateway for PokeAPI lookups.
#[derive(Parser, Debug)]
#[command(name = "pokemon-gateway")]
#[command(about = "Proxies and normalizes PokeAPI lookups with bounded retries")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port (overrides PORT).
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default).
    Serve {
        /// HTTP server port (overrides PORT).
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Look up a single Pokemon and print the normalized record.
    Lookup {
        /// Pokemon name.
        name: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

    init_logging(&config, args.verbose);

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(&config),
        Some(Command::Lookup { name }) => cmd_lookup(&config, &name).await,
        Some(Command::Serve { port }) => cmd_serve(config, port.or(args.port)).await,
        None => cmd_serve(config, args.port).await,
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("pokemon_gateway=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.rust_log))
    };

    let registry = tracing_subscriber::registry().with(filter);
    if config.log_json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Check configuration validity.
fn cmd_check_config(config: &Config) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("POKEMON GATEWAY - CONFIGURATION CHECK");
    println!("======================================================================");

    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    let policy = config.retry_policy();
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Upstream: {}", config.upstream_base().map_err(anyhow::Error::msg)?);
    println!("  Timeout: {}ms per attempt", config.upstream_timeout_ms);
    println!("  Attempts: {}", policy.max_attempts());
    println!("  Backoff: {}ms x attempt", config.backoff_base_ms);
    println!("  Reject numeric names: {}", config.reject_numeric_names);
    println!("  Listen: {}:{}", config.host, config.port);
    println!("  Metrics: {}", if config.metrics_enabled { "Enabled" } else { "Disabled" });
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Run one lookup and print the result as JSON.
async fn cmd_lookup(config: &Config, name: &str) -> anyhow::Result<()> {
    config.validate().map_err(anyhow::Error::msg)?;
    let client = PokemonClient::new(config)?;

    match client.lookup(Some(name)).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(e) => {
            println!(
                "{}",
                serde_json::json!({ "error": e.public_message(), "status": e.status_code().as_u16() })
            );
            Err(anyhow::anyhow!(e))
        }
    }
}

/// Run the HTTP server until a shutdown signal arrives.
async fn cmd_serve(config: Config, port_override: Option<u16>) -> anyhow::Result<()> {
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    let client = PokemonClient::new(&config)?;
    info!(upstream = %client.base_url(), "Upstream configured");

    let mut app_state = AppState::new(client);
    if config.metrics_enabled {
        match metrics::install_prometheus() {
            Ok(handle) => app_state = app_state.with_metrics(handle),
            Err(e) => warn!("Failed to install metrics recorder: {}", e),
        }
    }

    let host: std::net::IpAddr = config
        .host
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid HOST {}: {}", config.host, e))?;
    let addr = SocketAddr::new(host, port_override.unwrap_or(config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}
