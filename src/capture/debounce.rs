use std::{future::Future, sync::Mutex, time::Duration};

use tokio_util::sync::CancellationToken;

/// Single-slot cancellable delay: at most one pending timer exists, and
/// scheduling replaces it (last-trigger-wins, never queued).
///
/// Cancellation races only the delay. Once the quiet period elapses the
/// work runs to completion even if a newer trigger arrives, so in-flight
/// captures finish while the next cycle is already being debounced.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<CancellationToken>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn schedule<F>(&self, work: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        {
            let mut slot = self.pending.lock().unwrap();
            if let Some(previous) = slot.replace(token.clone()) {
                previous.cancel();
            }
        }

        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
            work.await;
        });
    }

    /// Clears any pending timer; used at deactivation. The cleared cycle
    /// emits nothing.
    pub fn cancel(&self) {
        if let Some(token) = self.pending.lock().unwrap().take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    fn counting_work(counter: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_quiet_period() {
        let debouncer = Debouncer::new(Duration::from_millis(2000));
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting_work(&fired));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_triggers_fires_only_the_last() {
        let debouncer = Debouncer::new(Duration::from_millis(2000));
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..5 {
            debouncer.schedule(counting_work(&fired));
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spaced_triggers_each_fire() {
        let debouncer = Debouncer::new(Duration::from_millis(200));
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..3 {
            debouncer.schedule(counting_work(&fired));
            tokio::time::sleep(Duration::from_millis(300)).await;
        }
        assert_eq!(fired.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_clears_the_pending_timer() {
        let debouncer = Debouncer::new(Duration::from_millis(2000));
        let fired = Arc::new(AtomicUsize::new(0));

        debouncer.schedule(counting_work(&fired));
        debouncer.cancel();
        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
