use std::time::Duration;

use tokio::sync::mpsc;

use super::WatchEvent;

/// Trailing-edge debouncer: emits once a burst has been quiet for `window`
#[derive(Debug, Clone, Copy)]
pub struct Debouncer {
    window: Duration,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    /// Fold raw signals into events until either channel closes.
    pub async fn run(self, mut raw: mpsc::UnboundedReceiver<()>, out: mpsc::Sender<WatchEvent>) {
        while raw.recv().await.is_some() {
            let mut raw_signals = 1;

            loop {
                tokio::select! {
                    _ = tokio::time::sleep(self.window) => break,
                    next = raw.recv() => match next {
                        Some(()) => raw_signals += 1,
                        None => break,
                    },
                }
            }

            tracing::debug!(raw_signals, "Snapshot change detected");
            if out.send(WatchEvent { raw_signals }).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_event() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::channel(4);
        tokio::spawn(Debouncer::new(Duration::from_millis(500)).run(raw_rx, out_tx));

        for _ in 0..3 {
            raw_tx.send(()).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        let event = out_rx.recv().await.unwrap();
        assert_eq!(event.raw_signals, 3);

        let nothing = tokio::time::timeout(Duration::from_secs(5), out_rx.recv()).await;
        assert!(nothing.is_err(), "burst must not produce a second event");
    }

    #[tokio::test(start_paused = true)]
    async fn test_separated_writes_produce_separate_events() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel();
        let (out_tx, mut out_rx) = mpsc::channel(4);
        tokio::spawn(Debouncer::new(Duration::from_millis(200)).run(raw_rx, out_tx));

        raw_tx.send(()).unwrap();
        assert_eq!(out_rx.recv().await.unwrap().raw_signals, 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        raw_tx.send(()).unwrap();
        assert_eq!(out_rx.recv().await.unwrap().raw_signals, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closed_source_ends_stream() {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<()>();
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let task = tokio::spawn(Debouncer::new(Duration::from_millis(200)).run(raw_rx, out_tx));

        drop(raw_tx);
        task.await.unwrap();
        assert!(out_rx.recv().await.is_none());
    }
}
