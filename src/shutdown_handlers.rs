use crate::shutdown::{AbortReceiver, AbortSender};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Flips the abort flag on Ctrl+C (or SIGTERM on unix). The task exits on
/// its own once the flag is set from anywhere else.
pub fn setup_signal_abort_handler(abort_tx: &AbortSender) -> tokio::task::JoinHandle<()> {
    let abort_tx = abort_tx.clone();
    tokio::spawn(async move {
        let mut abort_rx = abort_tx.subscribe();

        #[cfg(unix)]
        let mut term_signal = match signal(SignalKind::terminate()) {
            Ok(signal) => Some(signal),
            Err(err) => {
                tracing::warn!("Failed to register SIGTERM handler: {}", err);
                None
            }
        };

        #[cfg(unix)]
        {
            tokio::select! {
                () = wait_until_aborted(&mut abort_rx) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Interrupted; aborting after the current step.");
                    abort_tx.send_replace(true);
                }
                () = async {
                    if let Some(signal) = term_signal.as_mut() {
                        signal.recv().await;
                    } else {
                        std::future::pending::<()>().await;
                    }
                } => {
                    tracing::warn!("Terminated; aborting after the current step.");
                    abort_tx.send_replace(true);
                }
            }
        }

        #[cfg(not(unix))]
        {
            tokio::select! {
                () = wait_until_aborted(&mut abort_rx) => {}
                _ = tokio::signal::ctrl_c() => {
                    tracing::warn!("Interrupted; aborting after the current step.");
                    abort_tx.send_replace(true);
                }
            }
        }
    })
}

async fn wait_until_aborted(abort_rx: &mut AbortReceiver) {
    if abort_rx.wait_for(|aborted| *aborted).await.is_err() {
        std::future::pending::<()>().await;
    }
}
