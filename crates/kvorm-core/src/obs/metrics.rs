use serde::Serialize;
use std::{
    cell::RefCell,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for engine operations.
///

#[derive(Clone, Debug, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub types: BTreeMap<String, TypeCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            types: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Entrypoints
    pub load_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,
    pub query_calls: u64,

    // Rows touched
    pub rows_loaded: u64,
    pub rows_saved: u64,
    pub rows_deleted: u64,

    // Index maintenance
    pub index_inserts: u64,
    pub index_removes: u64,

    // Relation checks
    pub relation_lookups: u64,
}

///
/// TypeCounters
///

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct TypeCounters {
    pub load_calls: u64,
    pub save_calls: u64,
    pub delete_calls: u64,
    pub query_calls: u64,
    pub rows_loaded: u64,
    pub rows_saved: u64,
    pub rows_deleted: u64,
    pub index_inserts: u64,
    pub index_removes: u64,
    pub relation_lookups: u64,
}

///
/// EventReport
/// Point-in-time snapshot of the metrics state.
///

#[derive(Clone, Debug, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub types: BTreeMap<String, TypeCounters>,
    pub since_ms: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

pub(crate) fn report() -> EventReport {
    EVENT_STATE.with(|m| {
        let state = m.borrow();

        EventReport {
            ops: state.ops.clone(),
            types: state.types.clone(),
            since_ms: state.since_ms,
        }
    })
}

/// Reset all counters and restart the window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
