//! Re-entrancy and liveness flags shared by the flow controllers.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Allows at most one outstanding action. A second `try_enter` while one is
/// held returns `None`; the caller drops the action instead of queueing it.
#[derive(Debug, Default)]
pub(crate) struct InFlight {
    holder: AtomicU64,
    next: AtomicU64,
}

impl InFlight {
    pub(crate) fn try_enter(&self) -> Option<InFlightGuard<'_>> {
        let token = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        self.holder
            .compare_exchange(0, token, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlightGuard {
                holder: &self.holder,
                token,
            })
    }

    pub(crate) fn is_busy(&self) -> bool {
        self.holder.load(Ordering::Acquire) != 0
    }

    /// Forget the current holder. Its guard becomes inert.
    pub(crate) fn reset(&self) {
        self.holder.store(0, Ordering::Release);
    }
}

pub(crate) struct InFlightGuard<'a> {
    holder: &'a AtomicU64,
    token: u64,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        // Only release if nobody reset and re-entered in the meantime.
        let _ = self
            .holder
            .compare_exchange(self.token, 0, Ordering::AcqRel, Ordering::Acquire);
    }
}

/// Epoch captured when a remote call starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Ticket(u64);

/// Tracks whether results of in-flight calls may still be applied.
///
/// Identity changes and reloads bump the epoch; teardown clears `alive`.
#[derive(Debug)]
pub(crate) struct Liveness {
    alive: AtomicBool,
    epoch: AtomicU64,
}

impl Default for Liveness {
    fn default() -> Self {
        Self {
            alive: AtomicBool::new(true),
            epoch: AtomicU64::new(0),
        }
    }
}

impl Liveness {
    pub(crate) fn ticket(&self) -> Ticket {
        Ticket(self.epoch.load(Ordering::Acquire))
    }

    pub(crate) fn is_current(&self, ticket: Ticket) -> bool {
        self.alive.load(Ordering::Acquire) && self.epoch.load(Ordering::Acquire) == ticket.0
    }

    pub(crate) fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn shutdown(&self) {
        self.alive.store(false, Ordering::Release);
    }
}
