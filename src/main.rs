use std::sync::Arc;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use funnel_bot::bot::{FunnelBot, SessionStore, StatusState, status_routes};
use funnel_bot::channels::{ChannelManager, CliChannel, TelegramChannel};
use funnel_bot::config::{BotConfig, FunnelConfig};
use funnel_bot::funnel::{Dispatcher, FanoutLeadSink, JsonlLeadSink, TracingLeadSink};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export BOT_TOKEN=123456:ABC...   (or FUNNEL_CLI=1 for a local REPL)");
        std::process::exit(1);
    });

    // Initialize tracing; the guard flushes the file writer on exit
    let (file_layer, _log_guard) = match config.log_dir {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, "funnel-bot.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(env_filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_filter(env_filter()),
        )
        .with(file_layer)
        .init();

    eprintln!("🤖 Funnel Bot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Status: http://0.0.0.0:{}/health", config.port);

    let funnel_config = Arc::new(FunnelConfig::default());

    // ── Lead sinks ──────────────────────────────────────────────────────
    let mut sink = FanoutLeadSink::new().with(Arc::new(TracingLeadSink));
    if let Some(ref path) = config.leads_path {
        eprintln!("   Leads file: {}", path.display());
        sink = sink.with(Arc::new(JsonlLeadSink::new(path)));
    }
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&funnel_config),
        Arc::new(sink),
    ));

    let sessions = SessionStore::new();

    // ── Status server ───────────────────────────────────────────────────
    let app = status_routes(StatusState {
        config: Arc::clone(&funnel_config),
        sessions: Arc::clone(&sessions),
    });
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Status server stopped: {}", e);
        }
    });
    tracing::info!(port = config.port, "Status server started");

    // ── Channels ────────────────────────────────────────────────────────
    let mut channels = ChannelManager::new();

    if let Some(token) = config.telegram_token {
        eprintln!(
            "   Telegram: enabled (allowed: {})",
            if config.allowed_users.iter().any(|u| u == "*") {
                "everyone".to_string()
            } else {
                config.allowed_users.join(", ")
            }
        );
        channels.add(Box::new(TelegramChannel::new(token, config.allowed_users)));
    }

    if config.enable_cli {
        channels.add(Box::new(CliChannel::new()));
    }

    for (name, e) in channels.health_check_all().await {
        eprintln!("   Warning: channel {name} failed its health check: {e}");
    }
    eprintln!("   Channels: {}\n", channels.names().join(", "));

    FunnelBot::new(dispatcher, sessions, channels).run().await?;

    Ok(())
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}
