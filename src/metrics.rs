use lazy_static::lazy_static;
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, register_histogram, register_int_counter,
    register_int_counter_vec, register_int_gauge,
};

lazy_static! {
    pub static ref ADMISSIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "keymeter_admissions_total",
        "Admission decisions by outcome",
        &["outcome"]
    )
    .unwrap();
    pub static ref ADMISSION_LATENCY: Histogram = register_histogram!(
        "keymeter_admission_latency_seconds",
        "Time spent deciding whether to admit a request"
    )
    .unwrap();
    pub static ref LEDGER_CONFLICTS: IntCounter = register_int_counter!(
        "keymeter_ledger_conflicts_total",
        "Compare-and-swap attempts that lost a race and were retried"
    )
    .unwrap();
    pub static ref LEDGER_PRUNED: IntCounter = register_int_counter!(
        "keymeter_ledger_pruned_total",
        "Orphaned ledger entries removed by the sweeper"
    )
    .unwrap();
    pub static ref LEDGER_SIZE: IntGauge = register_int_gauge!(
        "keymeter_ledger_entries",
        "Ledger entries seen on the last sweep"
    )
    .unwrap();
}
