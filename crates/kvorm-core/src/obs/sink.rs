//! Metrics sink boundary.
//!
//! Engine code never touches `obs::metrics` directly. All instrumentation
//! flows through [`MetricsEvent`] and [`MetricsSink`].
use crate::obs::metrics::{self, EventReport, TypeCounters};
use std::{cell::RefCell, rc::Rc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Rc<dyn MetricsSink>>> = RefCell::new(None);
}

///
/// ExecKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExecKind {
    Load,
    Save,
    Delete,
    Query,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    ExecStart {
        kind: ExecKind,
        type_name: &'a str,
    },
    ExecFinish {
        kind: ExecKind,
        type_name: &'a str,
        rows_touched: u64,
    },
    IndexDelta {
        type_name: &'a str,
        inserts: u64,
        removes: u64,
    },
    RelationValidation {
        type_name: &'a str,
        lookups: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default sink that writes into the thread-local metrics state.
/// Used whenever no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl GlobalMetricsSink {
    // Bump the global and per-type counters in one borrow.
    fn bump(type_name: &str, f: impl Fn(&mut TypeCounters)) {
        metrics::with_state_mut(|m| {
            let mut ops = TypeCounters::default();
            f(&mut ops);
            add_ops(&mut m.ops, &ops);

            let entry = m.types.entry(type_name.to_string()).or_default();
            f(entry);
        });
    }
}

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::ExecStart { kind, type_name } => {
                Self::bump(type_name, |c| match kind {
                    ExecKind::Load => c.load_calls = c.load_calls.saturating_add(1),
                    ExecKind::Save => c.save_calls = c.save_calls.saturating_add(1),
                    ExecKind::Delete => c.delete_calls = c.delete_calls.saturating_add(1),
                    ExecKind::Query => c.query_calls = c.query_calls.saturating_add(1),
                });
            }

            MetricsEvent::ExecFinish {
                kind,
                type_name,
                rows_touched,
            } => {
                Self::bump(type_name, |c| match kind {
                    ExecKind::Load | ExecKind::Query => {
                        c.rows_loaded = c.rows_loaded.saturating_add(rows_touched);
                    }
                    ExecKind::Save => c.rows_saved = c.rows_saved.saturating_add(rows_touched),
                    ExecKind::Delete => {
                        c.rows_deleted = c.rows_deleted.saturating_add(rows_touched);
                    }
                });
            }

            MetricsEvent::IndexDelta {
                type_name,
                inserts,
                removes,
            } => {
                Self::bump(type_name, |c| {
                    c.index_inserts = c.index_inserts.saturating_add(inserts);
                    c.index_removes = c.index_removes.saturating_add(removes);
                });
            }

            MetricsEvent::RelationValidation { type_name, lookups } => {
                Self::bump(type_name, |c| {
                    c.relation_lookups = c.relation_lookups.saturating_add(lookups);
                });
            }
        }
    }
}

// Fold a single-event delta into the global totals.
const fn add_ops(ops: &mut metrics::EventOps, delta: &TypeCounters) {
    ops.load_calls = ops.load_calls.saturating_add(delta.load_calls);
    ops.save_calls = ops.save_calls.saturating_add(delta.save_calls);
    ops.delete_calls = ops.delete_calls.saturating_add(delta.delete_calls);
    ops.query_calls = ops.query_calls.saturating_add(delta.query_calls);
    ops.rows_loaded = ops.rows_loaded.saturating_add(delta.rows_loaded);
    ops.rows_saved = ops.rows_saved.saturating_add(delta.rows_saved);
    ops.rows_deleted = ops.rows_deleted.saturating_add(delta.rows_deleted);
    ops.index_inserts = ops.index_inserts.saturating_add(delta.index_inserts);
    ops.index_removes = ops.index_removes.saturating_add(delta.index_removes);
    ops.relation_lookups = ops.relation_lookups.saturating_add(delta.relation_lookups);
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());
    match sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override on this thread.
pub fn with_metrics_sink<T>(sink: Rc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Rc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let prev = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = prev;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

/// Span
/// RAII guard that emits start/finish events for one engine call.
/// Finish accounting happens even on early return.

pub(crate) struct Span<'a> {
    kind: ExecKind,
    type_name: &'a str,
    rows: u64,
    enabled: bool,
}

impl<'a> Span<'a> {
    #[must_use]
    pub(crate) fn new(kind: ExecKind, type_name: &'a str, enabled: bool) -> Self {
        if enabled {
            record(MetricsEvent::ExecStart { kind, type_name });
        }

        Self {
            kind,
            type_name,
            rows: 0,
            enabled,
        }
    }

    pub(crate) const fn set_rows(&mut self, rows: u64) {
        self.rows = rows;
    }

    /// Record a follow-up event under the same enablement as the span.
    pub(crate) fn event(&self, event: MetricsEvent<'_>) {
        if self.enabled {
            record(event);
        }
    }
}

impl Drop for Span<'_> {
    fn drop(&mut self) {
        if self.enabled {
            record(MetricsEvent::ExecFinish {
                kind: self.kind,
                type_name: self.type_name,
                rows_touched: self.rows,
            });
        }
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Capture(RefCell<Vec<String>>);

    impl MetricsSink for Capture {
        fn record(&self, event: MetricsEvent<'_>) {
            self.0.borrow_mut().push(format!("{event:?}"));
        }
    }

    #[test]
    fn global_sink_accumulates_per_type() {
        metrics_reset_all();

        {
            let mut span = Span::new(ExecKind::Save, "Person", true);
            span.event(MetricsEvent::IndexDelta {
                type_name: "Person",
                inserts: 2,
                removes: 1,
            });
            span.set_rows(1);
        }

        let report = metrics_report();
        assert_eq!(report.ops.save_calls, 1);
        assert_eq!(report.ops.rows_saved, 1);
        assert_eq!(report.ops.index_inserts, 2);
        assert_eq!(report.types["Person"].index_removes, 1);

        metrics_reset_all();
        assert_eq!(metrics_report().ops, metrics::EventOps::default());
    }

    #[test]
    fn disabled_spans_emit_nothing() {
        let capture = Rc::new(Capture::default());
        with_metrics_sink(capture.clone(), || {
            let _span = Span::new(ExecKind::Load, "Person", false);
        });

        assert!(capture.0.borrow().is_empty());
    }

    #[test]
    fn override_is_scoped() {
        metrics_reset_all();
        let capture = Rc::new(Capture::default());

        with_metrics_sink(capture.clone(), || {
            let _span = Span::new(ExecKind::Delete, "Pet", true);
        });
        let _span = Span::new(ExecKind::Delete, "Pet", true);

        assert_eq!(capture.0.borrow().len(), 2);
        assert_eq!(metrics_report().ops.delete_calls, 1);
    }
}
