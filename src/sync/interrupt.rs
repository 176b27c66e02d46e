//! Ctrl-C tracking for a run.
//!
//! An [`Interrupt`] stays raised once Ctrl-C arrives. Paginated reads race
//! against it, the engine checks it before every write, and the terminal
//! prompt treats it as a "no".

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::warn;

#[derive(Debug, Default)]
struct Shared {
    raised: AtomicBool,
    notify: Notify,
}

/// Shared interrupt flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    shared: Arc<Shared>,
}

impl Interrupt {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise on every Ctrl-C for the rest of the process.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn on_ctrl_c() -> Self {
        let interrupt = Self::new();
        let listener = interrupt.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, stopping before the next write");
                listener.raise();
            }
        });
        interrupt
    }

    pub fn raise(&self) {
        self.shared.raised.store(true, Ordering::SeqCst);
        self.shared.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.shared.raised.load(Ordering::SeqCst)
    }

    /// Resolves once raised; immediately if it already is.
    pub async fn raised(&self) {
        let notified = self.shared.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_raised() {
            return;
        }
        notified.await;
    }
}
