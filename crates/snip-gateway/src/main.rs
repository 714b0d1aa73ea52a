use anyhow::Context;
use clap::Parser;
use snip_core::{MappingStore, ShortenerConfig, SystemClock};
use snip_gateway::cli::{StorageBackendArg, CLI};
use snip_gateway::{App, AppState};
use snip_generator::RandomGenerator;
use snip_shortener::{ExpirySweeper, ShortenerService};
use snip_storage::{FileStore, InMemoryStore, MySqlStore};
use snip_telemetry::init_tracing;
use snip_validator::{HttpProbe, UrlValidator};
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CLI::parse();

    init_tracing(cli.log_format.into())?;

    info!(
        listen_addr = %cli.listen_addr,
        storage_backend = %cli.storage,
        base_url = %cli.base_url,
        dedup_ttl_seconds = cli.dedup_ttl_seconds,
        "starting snip gateway"
    );

    let config = cli.shortener_config();

    match cli.storage {
        StorageBackendArg::InMemory => run(&cli, config, InMemoryStore::new()).await,
        StorageBackendArg::File => {
            let store = FileStore::open(&cli.data_dir)
                .await
                .with_context(|| format!("opening data dir {}", cli.data_dir.display()))?;
            run(&cli, config, store).await
        }
        StorageBackendArg::Mysql => {
            let mysql_dsn = cli
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when storage backend is mysql")?;
            let store = MySqlStore::connect(mysql_dsn)
                .await
                .context("connecting to mysql")?;
            store.ensure_schema().await.context("applying mysql schema")?;
            run(&cli, config, store).await
        }
    }
}

async fn run<S: MappingStore>(cli: &CLI, config: ShortenerConfig, store: S) -> anyhow::Result<()> {
    let validator = UrlValidator::new(HttpProbe::new().context("building reachability probe")?);
    let service = ShortenerService::new(
        Arc::new(store),
        RandomGenerator::new(),
        validator,
        SystemClock,
        config,
    );

    // Held for the lifetime of the server; dropping it stops the sweeper.
    let _sweeper = match (cli.sweep_interval(), service.config().dedup_window()) {
        (Some(interval), Some(ttl)) => Some(ExpirySweeper::start(
            service.housekeeper(),
            service.clock(),
            ttl,
            interval,
        )),
        _ => None,
    };

    let app = App::service(AppState::new(Arc::new(service)), cli.request_timeout());

    let listener = tokio::net::TcpListener::bind(cli.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(e) => {
            warn!(error = %e, "failed to listen for ctrl-c, running until killed");
            std::future::pending::<()>().await;
        }
    }
}
