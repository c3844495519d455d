use std::{net::SocketAddr, path::Path};

use axum::{Router, http::StatusCode, middleware};
use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use switchyard::{
    ForwardingEngine, ProxyOptions, TracingReporter,
    adapters::forward_middleware,
    config::{ConfigValidator, SwitchyardConfig, compile_rules, loader::load_config},
    tracing_setup,
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "switchyard.yaml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "switchyard.yaml")]
        config: String,
    },
    /// Start the forwarding server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "switchyard.yaml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config).await,
        Some(Commands::Serve { config }) => serve(&config).await,
        None => serve(&args.config).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config: SwitchyardConfig = load_config(config_path)
        .await
        .with_context(|| format!("Failed to load config from {config_path}"))?;

    tracing_setup::init_tracing(&config.logging)
        .map_err(|e| eyre!("Failed to initialize tracing: {}", e))?;

    ConfigValidator::validate(&config).context("Invalid configuration")?;

    let rules = compile_rules(&config.rules).context("Failed to compile forwarding rules")?;
    tracing::info!(rules = rules.len(), "Compiled forwarding rules");

    let default_scheme = config
        .default_scheme
        .parse()
        .with_context(|| format!("Invalid default scheme '{}'", config.default_scheme))?;

    let options = ProxyOptions::new(rules, TracingReporter::new(config.logging.include_bodies))
        .with_transport(config.transport.clone())
        .with_default_scheme(default_scheme);
    let engine = ForwardingEngine::new(options).context("Failed to create forwarding engine")?;

    let app = Router::new()
        .fallback(|| async { (StatusCode::NOT_FOUND, "Not Found") })
        .layer(middleware::from_fn_with_state(engine, forward_middleware));

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    tracing::info!("Switchyard listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to register SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown..."),
        _ = terminate => tracing::info!("Received SIGTERM, initiating graceful shutdown..."),
    }
}

/// Validate configuration file and exit
async fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path).await {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = ConfigValidator::validate(&config) {
        eprintln!("❌ Configuration validation failed:");
        eprintln!("{e}");
        println!();
        println!("💡 Common fixes:");
        println!("   • Ensure all targets start with http:// or https://");
        println!("   • Ensure path prefixes start with '/'");
        println!("   • Verify listen address format (e.g., '127.0.0.1:8080')");
        std::process::exit(1);
    }

    if let Err(e) = compile_rules(&config.rules) {
        eprintln!("❌ Rule compilation failed:");
        eprintln!("   {e}");
        std::process::exit(1);
    }

    println!("✅ Configuration validation: OK");
    println!();
    println!("📋 Configuration Summary:");
    println!("   • Listen Address: {}", config.listen_addr);
    println!("   • Rules: {}", config.rules.len());
    for (index, rule) in config.rules.iter().enumerate() {
        println!(
            "     {}. {} {} -> {}{}",
            index + 1,
            rule.host.as_deref().unwrap_or("*"),
            rule.path_prefix,
            rule.target,
            if rule.requires_authentication {
                " (authenticated)"
            } else {
                ""
            }
        );
    }
    println!(
        "   • Follow Redirects: {}",
        config.transport.follow_redirects
    );
    println!();
    println!("🎉 Configuration is valid and ready to use!");
    Ok(())
}
