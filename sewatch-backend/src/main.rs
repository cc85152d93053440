mod discord;
mod discord_commands;

use anyhow::Context as _;
use poise::{Framework, FrameworkOptions, serenity_prelude as serenity};
use sewatch_backend::config::Config;
use sewatch_backend::create_app;
use sewatch_backend::directory::PlayerDirectoryClient;
use sewatch_backend::dispatch::NotificationDispatcher;
use sewatch_backend::scheduler::{PollScheduler, PresenceView};
use sewatch_backend::settings::Settings;
use sewatch_db::SqliteStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

type Context<'a> = poise::Context<'a, crate::Data, crate::discord_commands::Error>;

pub(crate) struct Data {
    pub(crate) settings: Settings<SqliteStore>,
    pub(crate) presence: watch::Receiver<PresenceView>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for structured logging
    #[cfg(debug_assertions)]
    let log_level = "debug";
    #[cfg(not(debug_assertions))]
    let log_level = "info";

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .compact()
        .init();
    tracing::info!("Starting sewatch...");

    let config = Config::from_env();
    tracing::info!(
        "Configuration: players_url={}, poll_interval={}ms, fetch_timeout={}s, send_timeout={}s, db_path={}, port={}",
        config.players_url,
        config.poll_interval.as_millis(),
        config.fetch_timeout.as_secs(),
        config.send_timeout.as_secs(),
        config.database_path,
        config.port
    );

    let token = config
        .discord_token
        .clone()
        .context("DISCORD_TOKEN environment variable is required")?;
    let store = SqliteStore::open(&config.database_path)
        .await
        .context("failed to open database")?;

    let http = Arc::new(serenity::Http::new(&token));
    let dispatcher = NotificationDispatcher::new(
        store.clone(),
        discord::DiscordSink::new(http),
        config.escalation_contact.clone(),
        config.send_timeout,
    );
    let directory = PlayerDirectoryClient::new(config.players_url.clone(), config.fetch_timeout)
        .context("failed to build player list client")?;
    let scheduler = PollScheduler::new(
        directory,
        dispatcher,
        config.poll_interval,
        config.shutdown_grace,
    );
    let presence = scheduler.subscribe();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller = tokio::spawn(scheduler.run(shutdown_rx));

    let app = create_app(presence.clone(), config.request_timeout);
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!("Status API listening on {}", addr);

    let intents = serenity::GatewayIntents::non_privileged();
    let max_players = config.max_players;
    let framework_presence = presence.clone();

    let framework = Framework::builder()
        .options(FrameworkOptions {
            commands: vec![
                discord_commands::playerlist(),
                discord_commands::ping(),
                discord_commands::setlogchannel(),
                discord_commands::subscribe(),
                discord_commands::unsubscribe(),
                discord_commands::suggest(),
                discord_commands::suggestions(),
            ],
            pre_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        "Executing command '{}' by user '{}'",
                        ctx.command().name,
                        ctx.author().name
                    );
                })
            },
            post_command: |ctx| {
                Box::pin(async move {
                    tracing::info!(
                        "Finished command '{}' by user '{}'",
                        ctx.command().name,
                        ctx.author().name
                    );
                })
            },
            ..Default::default()
        })
        .setup(move |ctx, ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands).await?;
                tracing::info!("Logged in as {}", ready.user.name);
                tokio::spawn(discord::update_activity(
                    ctx.clone(),
                    framework_presence.clone(),
                    max_players,
                ));
                Ok(Data {
                    settings: Settings::new(store),
                    presence: framework_presence,
                })
            })
        })
        .build();

    let mut client = serenity::ClientBuilder::new(&token, intents)
        .framework(framework)
        .await
        .context("Error creating Discord client")?;
    let shard_manager = client.shard_manager.clone();

    tokio::select! {
        result = axum::serve(listener, app) => {
            if let Err(e) = result {
                tracing::error!("Axum server error: {}", e);
            }
        }
        result = client.start() => {
            if let Err(e) = result {
                tracing::error!("Discord client error: {:?}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
        }
    }

    let _ = shutdown_tx.send(true);
    shard_manager.shutdown_all().await;
    if tokio::time::timeout(config.shutdown_grace + Duration::from_secs(1), poller)
        .await
        .is_err()
    {
        tracing::warn!("Poll loop did not stop in time");
    }
    tracing::info!("sewatch stopped");
    Ok(())
}
