use tracing::{error, info};

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

/// Resolve once the process is asked to stop
///
/// SIGTERM and SIGINT both end the server gracefully: in-flight estimates
/// finish, new connections are refused. If the handlers cannot be installed
/// the future never resolves and the process must be killed.
#[cfg(unix)]
pub async fn shutdown_signal() {
    let (mut sigterm, mut sigint) =
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(term), Ok(int)) => (term, int),
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to install signal handlers: {}", e);
                return std::future::pending().await;
            }
        };

    let name = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    info!("{} received, draining connections...", name);
}

/// Non-unix targets only see Ctrl+C
#[cfg(not(unix))]
pub async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received, draining connections..."),
        Err(e) => {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
