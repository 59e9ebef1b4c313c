use std::thread;

use tokio::sync::oneshot;

use crate::client::transport::TransportError;

/// Runs `f` on a short-lived worker thread and resolves once it returns.
/// The caller's task yields meanwhile, so the window keeps rendering. A
/// panic in storage or network code surfaces as a failed request instead
/// of taking the window down.
pub async fn run_detached<F, T>(f: F) -> Result<T, TransportError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    thread::Builder::new()
        .name("grid-query".to_string())
        .spawn(move || {
            // The receiver is gone only when the view was dropped.
            let _ = sender.send(f());
        })
        .map_err(|err| TransportError::Failed(format!("failed to start worker: {err}")))?;
    receiver
        .await
        .map_err(|_| TransportError::Failed("grid query worker panicked".to_string()))
}
