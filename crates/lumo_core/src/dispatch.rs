//! Render-to-logic callback dispatch
//!
//! Animation ticks run on the render context (often a background thread).
//! Application callbacks must never run inside a tick, so the render side
//! only *enqueues* them through a [`Dispatcher`]; the logic context owns the
//! [`CallbackQueue`] and runs queued jobs when it calls [`CallbackQueue::drain`].
//!
//! Every dispatched job runs exactly once, in dispatch order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;

/// A queued application callback
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Logic-side end of the dispatch channel
///
/// Owned by the application/logic context. Not `Sync`: only one context
/// drains the queue.
pub struct CallbackQueue {
    sender: Sender<Job>,
    receiver: Receiver<Job>,
    pending: Arc<AtomicUsize>,
}

impl CallbackQueue {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Get a render-side dispatcher feeding this queue
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            sender: self.sender.clone(),
            pending: Arc::clone(&self.pending),
        }
    }

    /// Number of jobs waiting to run
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Run every queued job, returning how many ran
    ///
    /// Jobs dispatched while draining (e.g. a callback that triggers another
    /// release) are picked up in the same call.
    pub fn drain(&self) -> usize {
        let mut ran = 0;
        while let Ok(job) = self.receiver.try_recv() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            job();
            ran += 1;
        }
        if ran > 0 {
            tracing::trace!("CallbackQueue: ran {} job(s)", ran);
        }
        ran
    }
}

impl Default for CallbackQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Render-side handle for enqueuing callbacks
///
/// Cheap to clone; safe to move into the animation thread.
#[derive(Clone)]
pub struct Dispatcher {
    sender: Sender<Job>,
    pending: Arc<AtomicUsize>,
}

impl Dispatcher {
    /// Enqueue a callback for the logic context
    ///
    /// Returns `false` if the queue has been dropped, in which case the
    /// callback is discarded without running.
    pub fn dispatch<F>(&self, job: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatch_boxed(Box::new(job))
    }

    /// Enqueue an already boxed callback
    pub fn dispatch_boxed(&self, job: Job) -> bool {
        self.pending.fetch_add(1, Ordering::AcqRel);
        if self.sender.send(job).is_err() {
            self.pending.fetch_sub(1, Ordering::AcqRel);
            tracing::debug!("Dispatcher: queue dropped, discarding callback");
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::thread;

    #[test]
    fn test_jobs_run_only_on_drain() {
        let queue = CallbackQueue::new();
        let count = Arc::new(AtomicU32::new(0));

        let c = Arc::clone(&count);
        queue.dispatcher().dispatch(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(queue.pending(), 1);

        assert_eq!(queue.drain(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending(), 0);

        // Nothing left to run
        assert_eq!(queue.drain(), 0);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispatch_from_other_thread_preserves_order() {
        let queue = CallbackQueue::new();
        let dispatcher = queue.dispatcher();
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        let l = Arc::clone(&log);
        thread::spawn(move || {
            for i in 0..5 {
                let l = Arc::clone(&l);
                dispatcher.dispatch(move || l.lock().unwrap().push(i));
            }
        })
        .join()
        .unwrap();

        assert_eq!(queue.drain(), 5);
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_dispatch_after_queue_dropped() {
        let dispatcher = {
            let queue = CallbackQueue::new();
            queue.dispatcher()
        };
        assert!(!dispatcher.dispatch(|| {}));
    }
}
