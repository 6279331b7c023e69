use tokio::sync::watch;

// ============================================================================
// Cooperative Cancellation
// ============================================================================
//
// The chain checks the signal at the start of every stage. A stage that is
// already waiting on an external effect is not interrupted; it completes or
// times out on its own.
//
// ============================================================================

/// Creates a linked handle/signal pair. The handle is held by whoever may
/// abort the request, the signal is passed to `Pipeline::run_with_cancellation`.
pub fn cancellation() -> (CancellationHandle, CancellationSignal) {
    let (tx, rx) = watch::channel(false);
    (CancellationHandle { tx }, CancellationSignal { rx })
}

#[derive(Debug)]
pub struct CancellationHandle {
    tx: watch::Sender<bool>,
}

impl CancellationHandle {
    pub fn cancel(&self) {
        // send_replace never fails, even with every signal dropped
        self.tx.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancellationSignal {
    rx: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// A signal that is never raised.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::never()
    }
}
