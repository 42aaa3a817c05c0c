use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

#[derive(Debug, Default)]
pub struct SyncMetrics {
    rest_requests_total: AtomicU64,
    publishes_total: AtomicU64,
    publishes_confirmed_total: AtomicU64,
    publishes_unconfirmed_total: AtomicU64,
    publishes_skipped_total: AtomicU64,
    fetches_total: AtomicU64,
    store_errors_total: AtomicU64,
    callbacks_executed_total: AtomicU64,
    callbacks_dropped_total: AtomicU64,
    publish_latency_sum_us: AtomicU64,
    publish_latency_count: AtomicU64,
}

impl SyncMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_rest_requests(&self) {
        self.rest_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_publishes(&self) {
        self.publishes_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_publishes_confirmed(&self) {
        self.publishes_confirmed_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_publishes_unconfirmed(&self) {
        self.publishes_unconfirmed_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_publishes_skipped(&self) {
        self.publishes_skipped_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_fetches(&self) {
        self.fetches_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_store_errors(&self) {
        self.store_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_callbacks_executed(&self) {
        self.callbacks_executed_total
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_callbacks_dropped(&self) {
        self.callbacks_dropped_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_latency(&self, start: Instant) {
        let us = start.elapsed().as_micros() as u64;
        self.publish_latency_sum_us.fetch_add(us, Ordering::Relaxed);
        self.publish_latency_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rest_requests_total(&self) -> u64 {
        self.rest_requests_total.load(Ordering::Relaxed)
    }

    pub fn publishes_total(&self) -> u64 {
        self.publishes_total.load(Ordering::Relaxed)
    }

    pub fn publishes_confirmed_total(&self) -> u64 {
        self.publishes_confirmed_total.load(Ordering::Relaxed)
    }

    pub fn publishes_unconfirmed_total(&self) -> u64 {
        self.publishes_unconfirmed_total.load(Ordering::Relaxed)
    }

    pub fn publishes_skipped_total(&self) -> u64 {
        self.publishes_skipped_total.load(Ordering::Relaxed)
    }

    pub fn fetches_total(&self) -> u64 {
        self.fetches_total.load(Ordering::Relaxed)
    }

    pub fn store_errors_total(&self) -> u64 {
        self.store_errors_total.load(Ordering::Relaxed)
    }

    pub fn callbacks_executed_total(&self) -> u64 {
        self.callbacks_executed_total.load(Ordering::Relaxed)
    }

    pub fn callbacks_dropped_total(&self) -> u64 {
        self.callbacks_dropped_total.load(Ordering::Relaxed)
    }

    pub fn publish_latency_vals(&self) -> (u64, u64) {
        (
            self.publish_latency_sum_us.load(Ordering::Relaxed),
            self.publish_latency_count.load(Ordering::Relaxed),
        )
    }
}
