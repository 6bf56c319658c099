//! Process counters rendered in Prometheus text format.

use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    updates_received: AtomicU64,
    updates_handled: AtomicU64,
    handler_errors: AtomicU64,
    active_workers: AtomicI64,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_received(&self) {
        self.updates_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn update_handled(&self) {
        self.updates_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn handler_error(&self) {
        self.handler_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_started(&self) {
        self.active_workers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn worker_stopped(&self) {
        self.active_workers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn updates_received(&self) -> u64 {
        self.updates_received.load(Ordering::Relaxed)
    }

    pub fn updates_handled(&self) -> u64 {
        self.updates_handled.load(Ordering::Relaxed)
    }

    pub fn handler_errors(&self) -> u64 {
        self.handler_errors.load(Ordering::Relaxed)
    }

    pub fn active_workers(&self) -> i64 {
        self.active_workers.load(Ordering::Relaxed)
    }

    /// Render every metric. `sessions_confirmed` comes from the controller.
    pub fn render(&self, sessions_confirmed: u64) -> String {
        let mut out = String::new();
        write_metric(
            &mut out,
            "salon_updates_received_total",
            "counter",
            "Updates received from Telegram.",
            self.updates_received() as i64,
        );
        write_metric(
            &mut out,
            "salon_updates_handled_total",
            "counter",
            "Chat events handled without error.",
            self.updates_handled() as i64,
        );
        write_metric(
            &mut out,
            "salon_handler_errors_total",
            "counter",
            "Chat events that ended with an error.",
            self.handler_errors() as i64,
        );
        write_metric(
            &mut out,
            "salon_sessions_confirmed_total",
            "counter",
            "Consumption sessions confirmed.",
            sessions_confirmed as i64,
        );
        write_metric(
            &mut out,
            "salon_active_chat_workers",
            "gauge",
            "Chat queues with a live worker.",
            self.active_workers(),
        );
        out
    }
}

fn write_metric(out: &mut String, name: &str, kind: &str, help: &str, value: i64) {
    let _ = writeln!(out, "# HELP {name} {help}");
    let _ = writeln!(out, "# TYPE {name} {kind}");
    let _ = writeln!(out, "{name} {value}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let metrics = Metrics::new();
        metrics.update_received();
        metrics.update_received();
        metrics.update_handled();
        metrics.handler_error();
        metrics.worker_started();
        metrics.worker_started();
        metrics.worker_stopped();

        let text = metrics.render(3);
        assert!(text.contains("# TYPE salon_updates_received_total counter\nsalon_updates_received_total 2\n"));
        assert!(text.contains("salon_updates_handled_total 1\n"));
        assert!(text.contains("salon_handler_errors_total 1\n"));
        assert!(text.contains("salon_sessions_confirmed_total 3\n"));
        assert!(text.contains("# TYPE salon_active_chat_workers gauge\nsalon_active_chat_workers 1\n"));
    }

    #[test]
    fn test_every_sample_has_type() {
        let text = Metrics::new().render(0);
        let samples = text.lines().filter(|l| !l.starts_with('#')).count();
        let types = text.lines().filter(|l| l.starts_with("# TYPE")).count();
        assert_eq!(samples, 5);
        assert_eq!(types, samples);
    }
}
