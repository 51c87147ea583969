use std::future::Future;
use std::sync::Arc;
use tokio::sync::watch;

/// Fires a run's cancellation. Cloning shares the same signal.
#[derive(Clone, Debug)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

/// Observes one or more cancellation sources.
#[derive(Clone, Debug)]
pub struct CancelSignal {
    receivers: Vec<watch::Receiver<bool>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (
        CancelHandle { tx: Arc::new(tx) },
        CancelSignal {
            receivers: vec![rx],
        },
    )
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            receivers: vec![self.tx.subscribe()],
        }
    }
}

impl CancelSignal {
    /// A signal nobody can fire.
    pub fn never() -> Self {
        let (handle, signal) = cancel_pair();
        drop(handle);
        signal
    }

    /// A signal that fires when either this one or the returned handle does.
    pub fn child(&self) -> (CancelHandle, CancelSignal) {
        let (handle, own) = cancel_pair();
        let mut receivers = self.receivers.clone();
        receivers.extend(own.receivers);
        (handle, CancelSignal { receivers })
    }

    pub fn is_cancelled(&self) -> bool {
        self.receivers.iter().any(|rx| *rx.borrow())
    }

    /// Resolves once any source fires. Never resolves if none can.
    pub async fn cancelled(&self) {
        let waits = self.receivers.iter().cloned().map(|mut rx| {
            Box::pin(async move {
                loop {
                    if *rx.borrow_and_update() {
                        return;
                    }
                    if rx.changed().await.is_err() {
                        std::future::pending::<()>().await;
                    }
                }
            })
        });
        futures::future::select_all(waits).await;
    }

    /// Drives `fut` unless the signal fires first; the future is dropped then.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        if self.is_cancelled() {
            return Err(Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }
}
