use {
    crate::{
        arguments::Arguments,
        domain::{DraftState, Engine},
        infra::{BootstrapApi, Catalog, Roster, Snapshots},
    },
    model::{DraftStatus, Event},
    rand::{SeedableRng, rngs::StdRng},
    std::sync::Arc,
    tokio::sync::broadcast,
};

pub async fn run(args: Arguments) {
    tokio::fs::create_dir_all(&args.data_dir)
        .await
        .expect("failed to create the data directory");

    let snapshots = Snapshots::new(&args.data_dir);
    let roster = Roster::load_or_seed(
        &args.data_dir,
        args.roster_seed.as_deref(),
        args.starting_budget,
        args.roster_quota,
    )
    .await
    .expect("failed to load the roster");
    tracing::info!(managers = roster.len(), "roster ready");

    let source = Arc::new(BootstrapApi::new(args.import_url.clone()));
    let catalog = Catalog::load_or_import(&args.data_dir, source)
        .await
        .expect("failed to load the player catalog");
    tracing::info!(players = catalog.len(), "catalog ready");

    let state = match snapshots
        .load()
        .await
        .expect("failed to load the draft snapshot")
    {
        Some(snapshot) => {
            let current_player = snapshot
                .current_player
                .as_ref()
                .and_then(|id| catalog.find(id));
            let state = DraftState::recover(snapshot, current_player);
            if state.status == DraftStatus::Active {
                tracing::info!(
                    timer = state.timer,
                    "recovered an in-flight draft, waiting for an admin resume"
                );
            }
            state
        }
        None => DraftState::new(args.timing()),
    };

    let (events, _) = broadcast::channel(64);
    spawn_event_logger(events.subscribe());

    let rng = match args.shuffle_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let engine = Engine::new(
        state,
        roster,
        catalog,
        snapshots,
        events,
        args.settings(),
        rng,
    );
    // The handle is the single mutation entry point. Transport adapters
    // (websocket, HTTP) clone it per connection; the binary itself only
    // keeps the engine alive until shutdown.
    let (handle, join) = engine.spawn();

    shutdown_signal().await;
    tracing::info!("shutting down");
    drop(handle);
    if let Err(err) = join.await {
        tracing::error!(?err, "engine task failed");
    }
}

/// Stand-in observer for the pub/sub transport: every broadcast is logged so
/// the process has observable output even without a connected adapter.
fn spawn_event_logger(mut events: broadcast::Receiver<Event>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(Event::State {
                    snapshot,
                    current_player,
                }) => {
                    tracing::debug!(
                        status = ?snapshot.status,
                        timer = snapshot.timer,
                        on_block = current_player.as_ref().map(|player| player.web_name.as_str()),
                        "state broadcast"
                    );
                }
                Ok(Event::Relief {
                    seconds, up_next, ..
                }) => {
                    tracing::debug!(seconds, ?up_next, "relief broadcast");
                }
                Ok(Event::Error { message }) => {
                    tracing::warn!(%message, "error broadcast");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event logger lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::{self, unix};
        let mut sigterm = unix::signal(unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = signal::ctrl_c() => tracing::info!("received SIGINT"),
            _ = sigterm.recv() => tracing::info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        tracing::info!("received SIGINT");
    }
}
