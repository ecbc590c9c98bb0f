use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_int_counter, CounterVec, IntCounter};

lazy_static! {
    // ── Event counters (increment on each event) ────────────────────────────
    pub static ref MENUS_PUBLISHED_COUNTER: CounterVec = register_counter_vec!(
        "lunch_menus_published_total",
        "Menu publications by outcome (created or replaced)",
        &["outcome"]
    ).expect("metric can be registered");

    pub static ref RESERVATIONS_COUNTER: CounterVec = register_counter_vec!(
        "lunch_reservations_total",
        "Reservation mutations by action",
        &["action"]
    ).expect("metric can be registered");

    pub static ref LOGINS_COUNTER: CounterVec = register_counter_vec!(
        "lunch_admin_logins_total",
        "Admin login attempts by status",
        &["status"]
    ).expect("metric can be registered");

    // ── Sync health ─────────────────────────────────────────────────────────
    pub static ref REMOTE_FAILURES_COUNTER: CounterVec = register_counter_vec!(
        "lunch_remote_sync_failures_total",
        "Failed remote mirror calls by collection and operation",
        &["collection", "operation"]
    ).expect("metric can be registered");

    pub static ref PERSIST_FAILURES: IntCounter = register_int_counter!(
        "lunch_local_persist_failures_total",
        "Failed writes of local store state"
    ).expect("metric can be registered");
}
