use lazy_static::lazy_static;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};

lazy_static! {
    // ── Session ─────────────────────────────────────────────────────────────
    pub static ref SESSION_RESOLUTIONS_COUNTER: CounterVec = register_counter_vec!(
        "console_session_resolutions_total",
        "Session resolutions by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref IDENTITY_LOOKUPS_COUNTER: CounterVec = register_counter_vec!(
        "console_identity_lookups_total",
        "Identity lookups by strategy and status",
        &["strategy", "status"]
    ).unwrap();

    // ── Registrar API ───────────────────────────────────────────────────────
    pub static ref DOMAIN_API_REQUESTS_COUNTER: CounterVec = register_counter_vec!(
        "console_domain_api_requests_total",
        "Registrar API calls by operation and HTTP status",
        &["operation", "status"]
    ).unwrap();

    pub static ref DOMAIN_API_LATENCY: HistogramVec = register_histogram_vec!(
        "console_domain_api_request_seconds",
        "Registrar API call latency by operation",
        &["operation"]
    ).unwrap();
}

pub fn record_resolution(outcome: &str) {
    SESSION_RESOLUTIONS_COUNTER.with_label_values(&[outcome]).inc();
}

pub fn record_lookup(strategy: &str, status: &str) {
    IDENTITY_LOOKUPS_COUNTER
        .with_label_values(&[strategy, status])
        .inc();
}

pub fn record_domain_call(operation: &str, status: &str, seconds: f64) {
    DOMAIN_API_REQUESTS_COUNTER
        .with_label_values(&[operation, status])
        .inc();
    DOMAIN_API_LATENCY
        .with_label_values(&[operation])
        .observe(seconds);
}
