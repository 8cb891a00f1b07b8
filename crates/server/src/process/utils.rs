use tokio::sync::watch;

/// Log panics through tracing before the process dies.
pub fn register_panic_logger() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(panic = %info, "panic");
        default_hook(info);
    }));
}

pub fn report_build_info() {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "jingui-server starting"
    );
}

/// Spawn a task that resolves once SIGINT or SIGTERM arrives, broadcasting
/// shutdown through the returned watch channel.
pub fn graceful_shutdown_blocker() -> (
    tokio::task::JoinHandle<()>,
    watch::Sender<()>,
    watch::Receiver<()>,
) {
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let tx = shutdown_tx.clone();

    let waiter = tokio::spawn(async move {
        let ctrl_c = async {
            let _ = tokio::signal::ctrl_c().await;
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    tracing::error!("failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
            _ = terminate => tracing::info!("received SIGTERM, shutting down"),
        }

        let _ = tx.send(());
    });

    (waiter, shutdown_tx, shutdown_rx)
}
