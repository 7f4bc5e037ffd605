use anyhow::{Context as _, Result};
use std::sync::Arc;

use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use conn_history::{
    config::{AddArgs, Cli, Command, Config},
    domain::HistoryParam,
    service::HistoryService,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cmd = cli.command.clone().unwrap_or(Command::Run);

    // Configuration runs exactly once, before anything is served.
    let service = Arc::new(configure(&cli.config)?);

    match cmd {
        Command::Run => run_server(cli.config, service).await,
        Command::Add(args) => add_once(&service, args),
        Command::List => list_all(&service),
    }
}

fn configure(config: &Config) -> Result<HistoryService> {
    let store_config = config.store_config()?;
    let service = HistoryService::new();
    service
        .configure_with(store_config)
        .context("configure history store")?;
    Ok(service)
}

fn add_once(service: &HistoryService, args: AddArgs) -> Result<()> {
    let reply = service.add_param(&HistoryParam {
        user_id: args.user_id,
        connection_id: args.connection_id,
        start_date: args.start_date,
        end_date: args.end_date,
    })?;
    println!("{}", reply.as_str());
    Ok(())
}

fn list_all(service: &HistoryService) -> Result<()> {
    let histories = service.get_list("")?;
    println!("{}", serde_json::to_string_pretty(&histories)?);
    Ok(())
}

async fn run_server(config: Config, service: Arc<HistoryService>) -> Result<()> {
    let app = conn_history::http::build_router(service).layer(TraceLayer::new_for_http());

    info!(bind = %config.bind, "starting conn-history");
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
