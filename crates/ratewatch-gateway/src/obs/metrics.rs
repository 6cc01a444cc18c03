//! Minimal metrics registry for the gateway.
//!
//! Counter and gauge families with dynamic labels backed by `DashMap`. Label
//! sets are flattened into sorted key vectors so rendering is deterministic
//! regardless of the order callers pass them in.

use dashmap::DashMap;
use std::fmt::Write;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

type LabelKey = Vec<(String, String)>;

fn label_key(labels: &[(&str, &str)]) -> LabelKey {
    let mut key: LabelKey = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    key.sort();
    key
}

fn escape_label(v: &str) -> String {
    v.replace('\\', "\\\\").replace('"', "\\\"").replace('\n', "\\n")
}

fn render_labels(key: &LabelKey) -> String {
    key.iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label(v)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Rows sorted by label key, for stable output.
fn sorted_rows<V, F: Fn(&V) -> String>(map: &DashMap<LabelKey, V>, read: F) -> Vec<(String, String)> {
    let mut rows: Vec<(String, String)> = map
        .iter()
        .map(|r| (render_labels(r.key()), read(r.value())))
        .collect();
    rows.sort();
    rows
}

#[derive(Default)]
pub struct CounterVec {
    map: DashMap<LabelKey, AtomicU64>,
}

impl CounterVec {
    pub fn inc(&self, labels: &[(&str, &str)]) {
        self.add(labels, 1);
    }

    pub fn add(&self, labels: &[(&str, &str)], v: u64) {
        let counter = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicU64::new(0));
        counter.fetch_add(v, Ordering::Relaxed);
    }

    /// Current value for one label set (0 if never touched).
    pub fn get(&self, labels: &[(&str, &str)]) -> u64 {
        self.map
            .get(&label_key(labels))
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} counter", name);
        for (labels, val) in sorted_rows(&self.map, |c| c.load(Ordering::Relaxed).to_string()) {
            let _ = writeln!(out, "{}{{{}}} {}", name, labels, val);
        }
    }
}

#[derive(Default)]
pub struct GaugeVec {
    map: DashMap<LabelKey, AtomicI64>,
}

impl GaugeVec {
    pub fn inc(&self, labels: &[(&str, &str)]) { self.add(labels, 1); }
    pub fn dec(&self, labels: &[(&str, &str)]) { self.add(labels, -1); }

    pub fn add(&self, labels: &[(&str, &str)], v: i64) {
        let gauge = self
            .map
            .entry(label_key(labels))
            .or_insert_with(|| AtomicI64::new(0));
        gauge.fetch_add(v, Ordering::Relaxed);
    }

    pub fn get(&self, labels: &[(&str, &str)]) -> i64 {
        self.map
            .get(&label_key(labels))
            .map(|g| g.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn render(&self, name: &str, out: &mut String) {
        let _ = writeln!(out, "# TYPE {} gauge", name);
        for (labels, val) in sorted_rows(&self.map, |g| g.load(Ordering::Relaxed).to_string()) {
            let _ = writeln!(out, "{}{{{}}} {}", name, labels, val);
        }
    }
}

#[derive(Default)]
pub struct GatewayMetrics {
    pub events_recorded: CounterVec,
    pub permission_decisions: CounterVec,
    pub stream_subscribers: GaugeVec,
    pub query_errors: CounterVec,
}

impl GatewayMetrics {
    /// Render all families plus any extra lines provided by callers.
    pub fn render(&self, extra: &[(&str, u64)]) -> String {
        let mut out = String::new();
        self.events_recorded.render("ratewatch_events_recorded_total", &mut out);
        self.permission_decisions.render("ratewatch_permission_decisions_total", &mut out);
        self.stream_subscribers.render("ratewatch_stream_subscribers", &mut out);
        self.query_errors.render("ratewatch_query_errors_total", &mut out);
        for (k, v) in extra { let _ = writeln!(out, "{} {}", k, v); }
        out
    }
}
