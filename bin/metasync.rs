use std::{str::FromStr, sync::Arc};

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{error, info, LevelFilter};
use simple_logger::SimpleLogger;
use tokio_util::sync::CancellationToken;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use metasync::{
    resolver::nostr_json, CacheStore, ConnectionSupervisor, RedisClient, RegistryClient, Resolver,
    Settings,
};

const USAGE: &str = "usage: metasync [resolve <name>]";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Sync,
    Resolve(String),
}

fn parse_args(args: &[String]) -> anyhow::Result<Command> {
    match args {
        [] => Ok(Command::Sync),
        [command, name] if command == "resolve" => Ok(Command::Resolve(name.clone())),
        _ => anyhow::bail!(USAGE),
    }
}

#[tokio::main()]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    // Load configuration
    let settings = Settings::new()
        .context("Failed to load configuration. Check config.yaml and METASYNC_* variables")?;

    let level = LevelFilter::from_str(&settings.log_level).unwrap_or(LevelFilter::Info);
    SimpleLogger::new()
        .with_level(level)
        .init()
        .context("Failed to initialize logger")?;

    let redis = RedisClient::new(settings.redis.clone())
        .await
        .context("Failed to initialize Redis connection")?;
    redis.health_check().await?;

    let cache: Arc<dyn CacheStore> = Arc::new(redis);

    match command {
        Command::Sync => run_sync(settings, cache).await,
        Command::Resolve(name) => resolve(&settings, cache, &name).await,
    }
}

async fn resolve(settings: &Settings, cache: Arc<dyn CacheStore>, name: &str) -> anyhow::Result<()> {
    let registry_settings = settings
        .registry
        .as_ref()
        .context("registry section is required to resolve names")?;
    let resolver = Resolver::new(RegistryClient::new(registry_settings)?, cache);

    match resolver.pubkey(name).await {
        Ok(Some(pubkey)) => {
            println!("{}", serde_json::to_string_pretty(&nostr_json(name, &pubkey))?)
        },
        Ok(None) => anyhow::bail!("{} has no metadata (404)", name),
        Err(e) => anyhow::bail!("{} ({})", e, e.status_code()),
    }
    Ok(())
}

async fn run_sync(settings: Settings, cache: Arc<dyn CacheStore>) -> anyhow::Result<()> {
    let supervisor = Arc::new(
        ConnectionSupervisor::from_settings(&settings, cache)
            .context("Failed to build connection supervisor")?,
    );

    info!("Watching NewMetadata events on {}", settings.contract.address);

    let cancellation_token = CancellationToken::new();

    let supervisor_token = cancellation_token.child_token();
    let mut supervisor_handle = {
        let supervisor = supervisor.clone();
        tokio::spawn(async move { supervisor.run(supervisor_token).await })
    };

    #[cfg(unix)]
    let mut sigterm_stream = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?
    };

    info!("Sync running. Press Ctrl+C to stop.");

    #[cfg(unix)]
    let finished = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            None
        },
        _ = sigterm_stream.recv() => {
            info!("Received SIGTERM, exiting gracefully...");
            None
        },
        res = &mut supervisor_handle => Some(res),
    };

    #[cfg(not(unix))]
    let finished = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal (Ctrl+C), exiting gracefully...");
            None
        },
        res = &mut supervisor_handle => Some(res),
    };

    let result = match finished {
        Some(res) => res,
        None => {
            cancellation_token.cancel();
            supervisor_handle.await
        },
    };

    match result.context("Supervisor task panicked")? {
        Ok(()) => {
            info!("Supervisor stopped");
            Ok(())
        },
        Err(e) => {
            error!("Supervisor failed: {}", e);
            Err(e.into())
        },
    }
}
