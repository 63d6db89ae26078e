//! Asynchronous reader/writer lock guarding the sink's shared state.
//!
//! Any number of readers may hold the lock together, or exactly one writer.
//! Waiting never blocks a thread: acquisition returns a future that resolves to
//! a [`Releaser`] once access is granted.
//!
//! # Status
//!
//! The lock is described by a single integer:
//!
//! | Value | Meaning                     |
//! |-------|-----------------------------|
//! | `0`   | free                        |
//! | `-1`  | held by one writer          |
//! | `n>0` | held by `n` readers         |
//!
//! # Writer preference
//!
//! - A reader is admitted immediately only when no writer holds the lock **and**
//!   no writer is queued. Otherwise it joins the current reader cohort.
//! - Writers queue in arrival order and are handed the lock one at a time.
//! - When a writer releases and another writer is queued, that writer goes
//!   next; the reader cohort is admitted only once the writer queue drains.
//! - The whole cohort is admitted in one step, with the status set to the
//!   cohort size before any member resumes.
//!
//! Readers can starve under sustained write pressure. Writers cannot.
//!
//! # Bookkeeping
//!
//! The status, writer queue and cohort live behind a `parking_lot` mutex that
//! is only held while the table is updated. Waiters are always resolved after
//! that mutex is released, so a woken task can never re-enter the table while
//! it is still locked.
//!
//! # Cancellation
//!
//! Dropping an acquisition future is safe at any point. A writer dropped before
//! its hand-off is skipped, however many are abandoned in a row; abandoned
//! entries at the head of the queue are also cleared on the next acquisition.
//! A reader dropped while its cohort is pending leaves the cohort, and one
//! dropped after the cohort was admitted gives its slot back.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use futures::future::{FutureExt, Shared};
use parking_lot::Mutex;
use tokio::sync::oneshot;

/// Which side of the lock a [`Releaser`] holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Reader,
    Writer,
}

/// Observable state of an [`AsyncLock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Free,
    Readers(usize),
    Writer,
}

/// All readers that started waiting since the last cohort was admitted.
struct Cohort {
    generation: u64,
    waiting: usize,
    admit: oneshot::Sender<usize>,
    admitted: Shared<oneshot::Receiver<usize>>,
}

impl Cohort {
    fn new(generation: u64) -> Self {
        let (admit, admitted) = oneshot::channel();
        Cohort {
            generation,
            waiting: 0,
            admit,
            admitted: admitted.shared(),
        }
    }
}

struct LockTable {
    status: isize,
    writers: VecDeque<oneshot::Sender<Releaser>>,
    cohort: Cohort,
}

impl LockTable {
    /// Pops the first queued writer whose acquisition is still waiting.
    fn pop_live_writer(&mut self) -> Option<oneshot::Sender<Releaser>> {
        while let Some(writer) = self.writers.pop_front() {
            if !writer.is_closed() {
                return Some(writer);
            }
        }
        None
    }

    fn drop_abandoned_writers(&mut self) {
        while self.writers.front().is_some_and(|w| w.is_closed()) {
            self.writers.pop_front();
        }
    }

    /// Chooses who holds the lock once the current writer lets go.
    ///
    /// Status stays `-1` when another writer is next.
    fn after_writer(&mut self) -> Option<Wake> {
        debug_assert_eq!(self.status, -1, "writer released while no writer held the lock");
        if let Some(writer) = self.pop_live_writer() {
            Some(Wake::Writer(writer))
        } else if self.cohort.waiting > 0 {
            let next = Cohort::new(self.cohort.generation + 1);
            let cohort = std::mem::replace(&mut self.cohort, next);
            self.status = cohort.waiting as isize;
            Some(Wake::Cohort {
                admit: cohort.admit,
                count: cohort.waiting,
            })
        } else {
            self.status = 0;
            None
        }
    }
}

enum Wake {
    Writer(oneshot::Sender<Releaser>),
    Cohort {
        admit: oneshot::Sender<usize>,
        count: usize,
    },
}

struct LockInner {
    table: Mutex<LockTable>,
}

impl LockInner {
    fn release_reader(self: &Arc<Self>) {
        let next_writer = {
            let mut table = self.table.lock();
            debug_assert!(table.status > 0, "reader released while no reader held the lock");
            table.status -= 1;
            if table.status == 0 {
                let next = table.pop_live_writer();
                if next.is_some() {
                    table.status = -1;
                }
                next
            } else {
                None
            }
        };

        if let Some(writer) = next_writer {
            self.wake(Wake::Writer(writer));
        }
    }

    fn release_writer(self: &Arc<Self>) {
        let wake = self.table.lock().after_writer();
        if let Some(wake) = wake {
            self.wake(wake);
        }
    }

    /// Resolves the next holder outside the table.
    ///
    /// A writer that went away between being picked and the hand-off gives
    /// the lock straight back; the following holder is picked in the same loop.
    fn wake(self: &Arc<Self>, mut wake: Wake) {
        loop {
            match wake {
                Wake::Writer(writer) => {
                    let handed = writer.send(Releaser::new(Arc::clone(self), Access::Writer));
                    let Err(releaser) = handed else {
                        return;
                    };
                    releaser.disarm();
                    tracing::trace!("Queued writer went away before hand-off");

                    let next = self.table.lock().after_writer();
                    match next {
                        Some(next) => wake = next,
                        None => return,
                    }
                }
                Wake::Cohort { admit, count } => {
                    tracing::trace!(readers = count, "Admitting reader cohort");
                    let _ = admit.send(count);
                    return;
                }
            }
        }
    }
}

/// Proof of access returned by [`AsyncLock::acquire_reader`] and
/// [`AsyncLock::acquire_writer`].
///
/// Releases its side of the lock exactly once: either through [`Releaser::release`]
/// or when dropped. It cannot be cloned, so a double release is not expressible.
#[must_use = "dropping a Releaser releases the lock immediately"]
pub struct Releaser {
    lock: Option<Arc<LockInner>>,
    access: Access,
}

impl Releaser {
    fn new(lock: Arc<LockInner>, access: Access) -> Self {
        Releaser {
            lock: Some(lock),
            access,
        }
    }

    /// Drops the releaser without touching the lock table.
    fn disarm(mut self) {
        self.lock = None;
    }

    pub fn kind(&self) -> Access {
        self.access
    }

    pub fn release(self) {}
}

impl Drop for Releaser {
    fn drop(&mut self) {
        let Some(lock) = self.lock.take() else {
            return;
        };
        match self.access {
            Access::Reader => lock.release_reader(),
            Access::Writer => lock.release_writer(),
        }
    }
}

impl fmt::Debug for Releaser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Releaser").field("access", &self.access).finish()
    }
}

/// Leaves or gives back a cohort slot if a waiting reader is dropped.
struct PendingReader<'a> {
    lock: &'a Arc<LockInner>,
    generation: u64,
    armed: bool,
}

impl Drop for PendingReader<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let still_waiting = {
            let mut table = self.lock.table.lock();
            if table.cohort.generation == self.generation {
                table.cohort.waiting -= 1;
                true
            } else {
                false
            }
        };

        if !still_waiting {
            // Admitted with this reader counted in; hand the slot back.
            self.lock.release_reader();
        }
    }
}

/// Reader/writer lock with writer preference and batched reader wake-up.
pub struct AsyncLock {
    inner: Arc<LockInner>,
}

impl AsyncLock {
    pub fn new() -> Self {
        AsyncLock {
            inner: Arc::new(LockInner {
                table: Mutex::new(LockTable {
                    status: 0,
                    writers: VecDeque::new(),
                    cohort: Cohort::new(0),
                }),
            }),
        }
    }

    /// Acquires shared access.
    ///
    /// Resolves without suspending when no writer holds or waits for the lock.
    /// Otherwise joins the pending reader cohort.
    pub async fn acquire_reader(&self) -> Releaser {
        let (generation, admitted) = {
            let mut table = self.inner.table.lock();
            table.drop_abandoned_writers();
            if table.status >= 0 && table.writers.is_empty() {
                table.status += 1;
                return Releaser::new(Arc::clone(&self.inner), Access::Reader);
            }
            table.cohort.waiting += 1;
            (table.cohort.generation, table.cohort.admitted.clone())
        };

        let mut pending = PendingReader {
            lock: &self.inner,
            generation,
            armed: true,
        };
        if let Ok(count) = admitted.await {
            tracing::trace!(cohort = count, "Reader admitted with cohort");
        }
        pending.armed = false;

        Releaser::new(Arc::clone(&self.inner), Access::Reader)
    }

    /// Acquires exclusive access.
    ///
    /// Resolves without suspending when the lock is free. Otherwise waits at
    /// the tail of the writer queue.
    pub async fn acquire_writer(&self) -> Releaser {
        let handed_off = {
            let mut table = self.inner.table.lock();
            if table.status == 0 {
                table.status = -1;
                return Releaser::new(Arc::clone(&self.inner), Access::Writer);
            }
            table.drop_abandoned_writers();
            let (tx, rx) = oneshot::channel();
            table.writers.push_back(tx);
            rx
        };

        match handed_off.await {
            Ok(releaser) => releaser,
            // Only closed entries are discarded without a send, and this
            // receiver is still open while it is being awaited.
            Err(_) => unreachable!("writer queue entry dropped without hand-off"),
        }
    }

    pub fn status(&self) -> LockStatus {
        match self.inner.table.lock().status {
            0 => LockStatus::Free,
            -1 => LockStatus::Writer,
            n => LockStatus::Readers(n as usize),
        }
    }

    /// Number of writers queued behind the current holder.
    pub fn queued_writers(&self) -> usize {
        self.inner.table.lock().writers.len()
    }

    /// Number of readers in the pending cohort.
    pub fn waiting_readers(&self) -> usize {
        self.inner.table.lock().cohort.waiting
    }
}

impl Default for AsyncLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AsyncLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let table = self.inner.table.lock();
        f.debug_struct("AsyncLock")
            .field("status", &table.status)
            .field("queued_writers", &table.writers.len())
            .field("waiting_readers", &table.cohort.waiting)
            .finish()
    }
}
