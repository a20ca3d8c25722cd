//! WEEX momentum dashboard bot
//!
//! Polls crypto tickers, trades a simulated wallet, serves the frontend
//! over HTTP + WebSocket.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use weex_bot::{
    ailog::AiLogger,
    client::WeexClient,
    config::Config,
    engine::TradingEngine,
    feed::FallbackFeed,
    monitor::{start_dashboard, AppState, DashboardState},
    paper::PaperTrader,
    storage::Database,
};

#[derive(Parser)]
#[command(name = "weex-bot")]
#[command(about = "Momentum trading bot with a live WebSocket dashboard")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the engine and dashboard server
    Run {
        /// Mirror orders to the WEEX contract API (default is paper only)
        #[arg(long)]
        live: bool,
    },
    /// Show the WEEX account balance
    Status,
    /// Fetch one quote through the fallback feed
    Price {
        /// Pair, e.g. BTCUSDT
        symbol: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Run { live } => run_bot(config, live).await,
        Commands::Status => show_status(config).await,
        Commands::Price { symbol } => show_price(config, &symbol).await,
    }
}

async fn run_bot(config: Config, live: bool) -> anyhow::Result<()> {
    tracing::info!("starting weex-bot");

    let weex = if live {
        tracing::warn!("LIVE mode: fills will be mirrored to the WEEX contract API");
        Some(Arc::new(WeexClient::from_config(&config.weex)?))
    } else {
        tracing::info!("paper mode: no orders leave the process");
        None
    };

    let dashboard = Arc::new(DashboardState::new(config.paper.initial_balance));
    let logger = Arc::new(AiLogger::new(dashboard.sender(), weex.clone()));

    let trader = Arc::new(PaperTrader::new(config.paper.clone()));
    if trader.try_restore().await? {
        tracing::info!("resumed paper session from state file");
    }

    let db = Database::connect(&config.database.path).await?;
    let feed = FallbackFeed::from_config(&config.feed)?;

    // Dashboard server runs for the life of the process
    let app_state = AppState {
        dashboard: dashboard.clone(),
        logger: logger.clone(),
    };
    let host = config.server.host.clone();
    let port = config.server.port;
    tokio::spawn(async move {
        if let Err(e) = start_dashboard(app_state, &host, port).await {
            tracing::error!("dashboard server exited: {e}");
        }
    });

    let engine = TradingEngine::new(
        config.clone(),
        feed,
        trader.clone(),
        weex,
        logger.clone(),
        dashboard,
        db,
    );

    tokio::select! {
        result = engine.run() => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            logger.system("engine stopped").await;
            if let Some(path) = &config.paper.state_file {
                trader.save_state(path).await?;
            }
        }
    }

    Ok(())
}

async fn show_status(config: Config) -> anyhow::Result<()> {
    let client = WeexClient::from_config(&config.weex)?;
    let assets = client.get_assets().await?;

    println!("\nWEEX Account\n");
    println!("Equity:         {:>14}", assets.total);
    println!("Available:      {:>14}", assets.available);
    println!("In positions:   {:>14}", assets.in_position);
    println!("Unrealized P&L: {:>14}", assets.unrealized_pnl);

    Ok(())
}

async fn show_price(config: Config, symbol: &str) -> anyhow::Result<()> {
    let feed = FallbackFeed::from_config(&config.feed)?;
    let quote = feed.latest(symbol).await?;

    println!("{} = {} (via {})", quote.symbol, quote.price, quote.source);
    Ok(())
}
