// ── Change notification ──
//
// One payload-less signal kind: "the store may have changed". Built on a
// `watch` channel, so back-to-back signals with no evaluation pass in
// between coalesce into one wake-up. Live queries only promise that
// deliveries converge to the final state, which makes coalescing safe.

use tokio::sync::watch;

/// Process-wide broadcaster of store change signals.
pub struct ChangeNotifier {
    tx: watch::Sender<u64>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(0);
        Self { tx }
    }

    /// Broadcast a change signal to every subscriber.
    pub fn signal(&self) {
        self.tx.send_modify(|v| *v = v.wrapping_add(1));
    }

    /// Subscribe to change signals. Dropping the returned handle
    /// deregisters the subscription.
    pub fn subscribe(&self) -> ChangeSignal {
        ChangeSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

/// A subscription handle to store change signals.
pub struct ChangeSignal {
    rx: watch::Receiver<u64>,
}

impl ChangeSignal {
    /// Wait for the next signal. Signals fired since the last await are
    /// coalesced into one. Returns `None` once the notifier is dropped.
    pub async fn changed(&mut self) -> Option<()> {
        self.rx.changed().await.ok()
    }

    /// Whether a signal fired since the last `changed().await`.
    pub fn has_pending(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_wakes_subscriber() {
        let notifier = ChangeNotifier::new();
        let mut signal = notifier.subscribe();

        notifier.signal();
        assert_eq!(signal.changed().await, Some(()));
    }

    #[tokio::test]
    async fn signals_coalesce() {
        let notifier = ChangeNotifier::new();
        let mut signal = notifier.subscribe();

        notifier.signal();
        notifier.signal();
        notifier.signal();

        assert_eq!(signal.changed().await, Some(()));
        assert!(!signal.has_pending());
    }

    #[tokio::test]
    async fn no_signal_before_first_change() {
        let notifier = ChangeNotifier::new();
        let signal = notifier.subscribe();
        assert!(!signal.has_pending());
    }

    #[tokio::test]
    async fn dropped_notifier_ends_subscription() {
        let notifier = ChangeNotifier::new();
        let mut signal = notifier.subscribe();
        drop(notifier);
        assert_eq!(signal.changed().await, None);
    }
}
