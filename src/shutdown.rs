use tokio::sync::watch;

/// Aborts a batch once it flips to `true`; the runner checks it between
/// iterations and races it against in-flight requests.
pub type AbortSender = watch::Sender<bool>;
pub type AbortReceiver = watch::Receiver<bool>;

#[must_use]
pub fn abort_channel() -> (AbortSender, AbortReceiver) {
    watch::channel(false)
}
