use std::sync::Arc;
use super::sync_metrics::SyncMetrics;

pub fn render_prometheus(m: &Arc<SyncMetrics>) -> String {
    let mut out = String::with_capacity(1024);

    write_counter(&mut out, "flowguard_rest_requests_total", m.rest_requests_total());
    write_counter(&mut out, "flowguard_sync_publishes_total", m.publishes_total());
    write_counter(
        &mut out,
        "flowguard_sync_publishes_confirmed_total",
        m.publishes_confirmed_total(),
    );
    write_counter(
        &mut out,
        "flowguard_sync_publishes_unconfirmed_total",
        m.publishes_unconfirmed_total(),
    );
    write_counter(&mut out, "flowguard_sync_publishes_skipped_total", m.publishes_skipped_total());
    write_counter(&mut out, "flowguard_sync_fetches_total", m.fetches_total());
    write_counter(&mut out, "flowguard_sync_store_errors_total", m.store_errors_total());
    write_counter(
        &mut out,
        "flowguard_sync_callbacks_executed_total",
        m.callbacks_executed_total(),
    );
    write_counter(&mut out, "flowguard_sync_callbacks_dropped_total", m.callbacks_dropped_total());

    let (sum, count) = m.publish_latency_vals();
    write_summary(&mut out, "flowguard_sync_publish_latency_us", sum, count);

    out
}

fn write_counter(out: &mut String, name: &str, val: u64) {
    use std::fmt::Write;
    let _ = writeln!(out, "# TYPE {name} counter");
    let _ = writeln!(out, "{name} {val}");
}

fn write_summary(out: &mut String, name: &str, sum: u64, count: u64) {
    use std::fmt::Write;
    let _ = writeln!(out, "# TYPE {name} summary");
    let _ = writeln!(out, "{name}_sum {sum}");
    let _ = writeln!(out, "{name}_count {count}");
}
