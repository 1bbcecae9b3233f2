//! Outbound request queue shared between callers and the I/O loop

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use hangman_protocol::Request;
use hangman_utils::Result;
use parking_lot::Mutex;
use tokio::sync::futures::Notified;
use tokio::sync::Notify;

/// FIFO of requests waiting for the socket to become writable
///
/// Any thread may push; only the I/O loop pops. Pushing raises the wake
/// flag and interrupts the loop's readiness wait so it can add write
/// interest.
#[derive(Debug, Default)]
pub(crate) struct OutboundQueue {
    pending: Mutex<VecDeque<Request>>,
    wake: AtomicBool,
    notify: Notify,
}

impl OutboundQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Append `request` if `admit` allows it
    ///
    /// `admit` runs while the queue lock is held, so a state check inside it
    /// cannot interleave with another producer's push.
    pub(crate) fn push_if<F>(&self, request: Request, admit: F) -> Result<()>
    where
        F: FnOnce() -> Result<()>,
    {
        {
            let mut pending = self.pending.lock();
            admit()?;
            tracing::trace!(kind = %request.kind(), depth = pending.len() + 1, "Request queued");
            pending.push_back(request);
        }
        self.wake();
        Ok(())
    }

    /// Take the oldest request
    pub(crate) fn pop(&self) -> Option<Request> {
        self.pending.lock().pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drop everything still queued, returning how many requests were lost
    pub(crate) fn clear(&self) -> usize {
        let mut pending = self.pending.lock();
        let dropped = pending.len();
        pending.clear();
        dropped
    }

    /// Raise the wake flag and interrupt the loop
    pub(crate) fn wake(&self) {
        self.wake.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    /// Clear the wake flag, returning whether it was set
    pub(crate) fn take_wake(&self) -> bool {
        self.wake.swap(false, Ordering::AcqRel)
    }

    /// Future resolving on the next [`wake`](Self::wake)
    ///
    /// A wake issued while nobody is waiting is remembered, so it is never
    /// lost between two polls of the loop.
    pub(crate) fn notified(&self) -> Notified<'_> {
        self.notify.notified()
    }
}
