use tokio::select;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancels `cancellation` on Ctrl-C. Returns early if something else cancels first.
///
/// On Windows detached processes can't detect signals sent to them, `clarity stop` kills the
/// process there instead.
pub async fn detect_shutdown(cancellation: CancellationToken) {
    select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!("Can't listen for shutdown signals {e}");
                return;
            }
            info!("Shutdown requested");
            cancellation.cancel();
        },
        _ = cancellation.cancelled() => {}
    };
}
