use crossbeam::queue::SegQueue;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// FIFO hand-off between the acceptor and the workers.
///
/// Pushing never blocks. Workers park on a [`Notify`] while the queue is
/// empty instead of polling it. After [`stop`](Self::stop), `pop` keeps
/// returning queued items until the queue is drained and only then yields
/// `None`.
#[derive(Debug)]
pub(crate) struct DispatchQueue<T> {
    items: SegQueue<T>,
    notify: Notify,
    stopped: AtomicBool,
}

impl<T> DispatchQueue<T> {
    #[inline]
    pub(crate) fn new() -> Self {
        Self {
            items: SegQueue::new(),
            notify: Notify::new(),
            stopped: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn push(&self, item: T) {
        self.items.push(item);
        self.notify.notify_one();
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Sets the stop flag and wakes every parked worker.
    pub(crate) fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Waits for the next item, or `None` once stopped and empty.
    pub(crate) async fn pop(&self) -> Option<T> {
        loop {
            // Register interest before checking, so a `stop` or `push`
            // landing between the check and the await is not missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.items.pop() {
                return Some(item);
            }
            if self.stopped.load(Ordering::SeqCst) {
                return None;
            }

            notified.await;
        }
    }
}
