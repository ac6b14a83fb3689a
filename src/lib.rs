pub mod channels;
pub mod client;
pub mod codec;
pub mod config;
pub mod control;
pub mod error;
pub mod models;
pub mod registry;

use crate::config::AppConfig;
use crate::registry::events::forward_json_lines;
use crate::registry::{Event, Reconciler};
use anyhow::Context;
use log::{error, info, warn};
use std::future::Future;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;

const EVENT_QUEUE: usize = 64;

/// Applies push events from `events` until the stream ends or Ctrl-C is
/// pressed, and returns the reconciled state.
pub async fn run(config: AppConfig, events: mpsc::Receiver<Event>) -> anyhow::Result<Reconciler> {
    run_until(config, events, tokio::signal::ctrl_c()).await
}

/// Like [`run`], stopping early once `shutdown` resolves.
pub async fn run_until<F>(
    config: AppConfig,
    events: mpsc::Receiver<Event>,
    shutdown: F,
) -> anyhow::Result<Reconciler>
where
    F: Future<Output = std::io::Result<()>>,
{
    info!("Starting application");

    match main_loop(&config, events, shutdown).await {
        Ok(reconciler) => {
            for line in reconciler.registry().summary() {
                info!("{}", line);
            }
            info!("Application completed successfully");
            Ok(reconciler)
        }
        Err(e) => {
            error!("Application error: {e:#}");
            let mut source = e.source();
            while let Some(e) = source {
                error!("Caused by: {e}");
                source = e.source();
            }
            Err(e).context("Application failed to run")
        }
    }
}

/// Runs the reconciler on its own runtime, fed with JSON-line events read
/// from `reader`.
///
/// The runtime is shut down without waiting on the reader task: a reader
/// backed by a blocking read (stdin) cannot be cancelled.
pub fn serve<R, F>(config: AppConfig, reader: R, shutdown: F) -> anyhow::Result<Reconciler>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    F: Future<Output = std::io::Result<()>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")?;

    let result = runtime.block_on(async {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE);
        tokio::spawn(async move {
            if let Err(e) = forward_json_lines(reader, tx).await {
                warn!("Stopped reading events: {}", e);
            }
        });
        run_until(config, rx, shutdown).await
    });

    runtime.shutdown_background();
    result
}

async fn main_loop<F>(
    config: &AppConfig,
    mut events: mpsc::Receiver<Event>,
    shutdown: F,
) -> anyhow::Result<Reconciler>
where
    F: Future<Output = std::io::Result<()>>,
{
    let mut reconciler = Reconciler::from_config(config);

    tokio::select! {
        _ = reconciler.run(&mut events) => {}
        signal = shutdown => {
            signal.context("Failed to listen for Ctrl-C")?;
            info!("Interrupted, stopping");
        }
    }

    Ok(reconciler)
}
