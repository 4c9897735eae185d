//! Minimal metrics registry for the gateway.
//!
//! No external metrics crates; counter/gauge vectors with dynamic labels are
//! backed by `DashMap`. Labels are flattened into sorted key vectors to keep
//! deterministic ordering.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

/// Helper to escape label values.
fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn label_key(labels: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut key: Vec<(String, String)> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn render_labels(key: &[(String, String)]) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<Vec<(String, String)>, AtomicU64>,
}

impl CounterVec {
    /// Increment by 1.
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    /// Increment by an arbitrary value.
    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self.map.entry(label_key(labels)).or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for one label set (test and render helper).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for r in self.map.iter() {
            let labels = render_labels(r.key());
            let val = r.value().load(Ordering::Relaxed);
            if labels.is_empty() {
                let _ = writeln!(out, "{} {}", name, val);
            } else {
                let _ = writeln!(out, "{}{{{}}} {}", name, labels, val);
            }
        }
    }
}

#[derive(Default)]
pub struct Gauge {
    value: AtomicI64,
}

impl Gauge {
    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.value.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Relaxed)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        let _ = writeln!(out, "{} {}", name, self.get());
    }
}

/// Hub-level counters exposed at `/metrics`.
#[derive(Default)]
pub struct HubMetrics {
    /// Delivered events, labeled by event kind.
    pub events_routed: CounterVec,
    /// Dropped events, labeled by drop reason
    /// (`offline`, `backpressure`, `presence_backpressure`, `notify_full`).
    pub events_dropped: CounterVec,
    /// Presence broadcasts, labeled by state (`online` / `offline`).
    pub presence_broadcasts: CounterVec,
    /// Rejected upgrade attempts.
    pub handshake_rejections: CounterVec,
    /// Currently registered connections.
    pub connections_active: Gauge,
}

impl HubMetrics {
    /// Render all registered metrics.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.events_routed.render("duolink_events_routed_total", &mut out);
        self.events_dropped.render("duolink_events_dropped_total", &mut out);
        self.presence_broadcasts.render("duolink_presence_broadcasts_total", &mut out);
        self.handshake_rejections.render("duolink_handshake_rejections_total", &mut out);
        self.connections_active.render("duolink_connections_active", &mut out);
        out
    }
}
