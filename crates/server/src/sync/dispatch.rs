use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use crate::metrics::sync_metrics::SyncMetrics;

type Task = Box<dyn FnOnce() + Send + 'static>;

/// Single dedicated worker with room for exactly one pending task.
///
/// `submit` never blocks: when a task is already waiting, the waiting one is
/// discarded in favour of the new one. At most one task runs at a time.
/// Clones share the same worker; the worker thread exits once the last
/// handle is dropped.
#[derive(Clone)]
pub struct DispatchPool {
    shared: Arc<Shared>,
    _close: Arc<CloseOnDrop>,
}

struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,
    metrics: Arc<SyncMetrics>,
}

#[derive(Default)]
struct Slot {
    pending: Option<Task>,
    closed: bool,
}

struct CloseOnDrop(Arc<Shared>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.lock().closed = true;
        self.0.wake.notify_one();
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DispatchPool {
    pub fn spawn(name: &str, metrics: Arc<SyncMetrics>) -> std::io::Result<Self> {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot::default()),
            wake: Condvar::new(),
            metrics,
        });

        let worker = Arc::clone(&shared);
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(worker))?;

        Ok(Self {
            _close: Arc::new(CloseOnDrop(Arc::clone(&shared))),
            shared,
        })
    }

    pub fn submit<F>(&self, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let displaced = {
            let mut slot = self.shared.lock();
            if slot.closed {
                return;
            }
            slot.pending.replace(Box::new(task))
        };
        self.shared.wake.notify_one();

        // Dropped outside the lock: a task's captures may do arbitrary work
        // in their destructors.
        if displaced.is_some() {
            self.shared.metrics.inc_callbacks_dropped();
            tracing::debug!("dispatch pool busy, discarded oldest pending task");
        }
    }
}

fn run_worker(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut slot = shared.lock();
            loop {
                if let Some(task) = slot.pending.take() {
                    break task;
                }
                if slot.closed {
                    return;
                }
                slot = shared
                    .wake
                    .wait(slot)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
        };

        if std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)).is_err() {
            tracing::error!("config listener callback panicked");
        }
        shared.metrics.inc_callbacks_executed();
    }
}
