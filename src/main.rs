//! Edge fetch bridge CLI entry point.
//!
//! - `fetch` issues one synchronous bridged request and prints the body
//! - `serve` runs the development server

use std::io::{self, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use fetch_bridge_common::{ConfigFile, LoggingConfig};
use fetch_bridge_core::{BridgeError, FetchInit, ResponseBody, SyncFetchBridge};
use fetch_bridge_server::{DevServer, ServerConfig};

/// Synchronous fetch bridge for a local edge-compute emulator
#[derive(Parser)]
#[command(name = "edge-fetch-bridge")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long, short, global = true, env = "EDGE_FETCH_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a URL through the bridge and print the response body
    Fetch(FetchArgs),
    /// Run the development server
    Serve(ServeArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// Request URL
    url: String,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request header as 'name: value' (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Request body
    #[arg(short = 'd', long)]
    data: Option<String>,

    /// Print the status line and headers before the body
    #[arg(short, long)]
    include: bool,
}

#[derive(Args)]
struct ServeArgs {
    /// Bind address, overriding the configuration file
    #[arg(long, env = "BIND_ADDR")]
    bind: Option<SocketAddr>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ConfigFile::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => ConfigFile::default(),
    };

    init_tracing(&config.logging);

    match cli.command {
        Commands::Fetch(args) => run_fetch(config, args),
        Commands::Serve(args) => run_serve(&config, &args),
    }
}

/// Initialize tracing on stderr, keeping stdout for response bodies.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    let json = logging
        .json
        .then(|| fmt::layer().json().with_writer(io::stderr));
    let text = (!logging.json).then(|| fmt::layer().with_writer(io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(text)
        .init();
}

fn run_fetch(config: ConfigFile, args: FetchArgs) -> anyhow::Result<()> {
    let method = http::Method::from_bytes(args.method.as_bytes())
        .with_context(|| format!("Invalid method '{}'", args.method))?;

    let mut init = FetchInit::new().method(method);
    for header in &args.headers {
        let Some((name, value)) = header.split_once(':') else {
            bail!("Invalid header '{header}'. Expected format: 'name: value'");
        };
        init = init.header(name.trim(), value.trim());
    }
    if let Some(data) = args.data {
        init = init.body(data);
    }

    let bridge = SyncFetchBridge::new(config.bridge);
    let result = bridge.fetch(&args.url, init);

    let response = match result {
        Ok(response) => response,
        Err(err) => {
            bridge.dispose();
            if let BridgeError::Application(revived) = &err {
                warn!(name = %revived.name(), "Endpoint raised an application error");
            }
            return Err(err).with_context(|| format!("Fetch of {} failed", args.url));
        }
    };

    let mut stdout = io::stdout().lock();
    if args.include {
        writeln!(stdout, "HTTP {}", response.status)?;
        for (name, value) in &response.headers {
            writeln!(stdout, "{name}: {}", String::from_utf8_lossy(value.as_bytes()))?;
        }
        writeln!(stdout)?;
    }

    match response.body {
        ResponseBody::Null => {}
        ResponseBody::Bytes(bytes) => stdout.write_all(&bytes)?,
        ResponseBody::Stream(mut handle) => {
            let copied = io::copy(&mut handle, &mut stdout)?;
            info!(bytes = copied, "Streamed body finished");
        }
    }
    stdout.flush()?;

    bridge.dispose();
    Ok(())
}

fn run_serve(config: &ConfigFile, args: &ServeArgs) -> anyhow::Result<()> {
    let bind_addr = match args.bind {
        Some(addr) => addr,
        None => config.server.bind_addr.parse().with_context(|| {
            format!(
                "Invalid bind address '{}'. Expected format: 'host:port' (e.g., '127.0.0.1:8787')",
                config.server.bind_addr
            )
        })?,
    };

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build the server runtime")?;

    info!(bind_addr = %bind_addr, "Configuration loaded");
    info!("Available endpoints:");
    info!("  GET  /health          - Health check");
    info!("  ANY  /echo            - Describe the request as JSON");
    info!("  GET  /stream          - Streamed body");
    info!("  ANY  /fail[/:name]    - Application error");
    info!("  ANY  /status/:code    - Empty response with a status");

    let server = DevServer::new(ServerConfig::default().with_bind_addr(bind_addr));
    runtime
        .block_on(server.run())
        .context("Development server failed")?;

    Ok(())
}
