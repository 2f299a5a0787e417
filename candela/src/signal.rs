use tokio::sync::watch;

/// Resolve once a stop has been requested on `stop`.
///
/// A receiver whose sender is gone never resolves; tasks owned by a dropped
/// handle are aborted instead.
pub(crate) async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    loop {
        if *stop.borrow_and_update() {
            return;
        }
        if stop.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
