mod config;
mod persistence;
mod registry;
mod results;
mod service;
mod settings;

use anyhow::Context;
use persistence::sqlite::{Database, SchemaFamily, StoreOptions};
use persistence::MainContext;
use registry::SessionRegistry;
use service::{Dispatcher, Response};
use settings::SettingsStore;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_stream::wrappers::LinesStream;
use tokio_stream::StreamExt;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = config::get_data_dir();

    // stdout carries the protocol, so logs go to a daily file.
    let log_dir = config::get_log_dir(&data_dir);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("creating log directory {}", log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&log_dir, "meetday-server");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_span_events(FmtSpan::CLOSE),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Starting meetday server");
    tracing::info!("Using data directory: {}", data_dir.display());

    let migrations = config::get_migrations();
    let main_db = Database::open(
        StoreOptions::new(config::get_main_store_path(&data_dir), SchemaFamily::Main)
            .with_migrations(migrations.clone()),
    )
    .await
    .context("opening the main store")?;
    let main = Arc::new(MainContext::new(main_db));

    let registry = Arc::new(SessionRegistry::new(
        &data_dir,
        migrations,
        Arc::clone(&main),
    ));
    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&main),
        Arc::clone(&registry),
        SettingsStore::new(&data_dir),
        config::get_open_timeout(),
    ));

    // Responses may complete out of order; one task owns stdout.
    let (tx, mut rx) = mpsc::channel::<Response>(64);
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(response) = rx.recv().await {
            let mut line = match serde_json::to_string(&response) {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode response");
                    continue;
                }
            };
            line.push('\n');
            stdout.write_all(line.as_bytes()).await?;
            stdout.flush().await?;
        }
        Ok::<_, std::io::Error>(())
    });

    let mut lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
    let mut in_flight = JoinSet::new();
    while let Some(line) = lines.next().await {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let dispatcher = Arc::clone(&dispatcher);
        let tx = tx.clone();
        in_flight.spawn(async move {
            let response = dispatcher.dispatch_line(&line).await;
            if tx.send(response).await.is_err() {
                tracing::warn!("Response writer stopped; dropping response");
            }
        });
        while in_flight.try_join_next().is_some() {}
    }

    tracing::debug!("Draining in-flight requests");
    while in_flight.join_next().await.is_some() {}
    drop(tx);
    writer
        .await
        .context("response writer panicked")?
        .context("writing to stdout")?;

    tracing::info!(
        session_stores = registry.opened_count(),
        "Input closed; releasing session stores"
    );
    registry.release_all().await;
    main.db.close().await.context("closing the main store")?;
    tracing::info!("Shutdown complete");
    Ok(())
}
