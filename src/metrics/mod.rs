use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::exponential_buckets;
use prometheus::Encoder;
use prometheus::HistogramOpts;
use prometheus::HistogramVec;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;

use crate::Result;
use crate::SystemError;


lazy_static! {
    pub static ref VOTES_RECORDED_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("votes_recorded", "Ballots recorded, by origin"),
        &["origin"]
    )
    .expect("metric can not be created");

    pub static ref BALLOT_REJECTION_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("ballot_rejections", "Ballots refused by the vote guard, by reason"),
        &["reason"]
    )
    .expect("metric can not be created");

    pub static ref PHASE_TRANSITION_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("phase_transitions", "Successful election phase transitions, by target phase"),
        &["to"]
    )
    .expect("metric can not be created");

    pub static ref CANDIDACY_DECISION_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("candidacy_decisions", "Candidate approval decisions, by outcome"),
        &["decision"]
    )
    .expect("metric can not be created");

    pub static ref STORE_OPERATION_DURATION_METRIC: HistogramVec = HistogramVec::new(
        HistogramOpts::new("store_operation_duration_ms", "Histogram of store operation latency in ms")
            .buckets(exponential_buckets(0.25, 2.0, 14).expect("valid buckets")),
        &["operation"]
    )
    .expect("metric can not be created");

    pub static ref STORE_TIMEOUT_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("store_timeouts", "Store operations that exceeded the operation timeout"),
        &["operation"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = Registry::new();
}

static REGISTER: Once = Once::new();

fn register_custom_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(VOTES_RECORDED_METRIC.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(BALLOT_REJECTION_METRIC.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(PHASE_TRANSITION_METRIC.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(CANDIDACY_DECISION_METRIC.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(STORE_OPERATION_DURATION_METRIC.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(STORE_TIMEOUT_METRIC.clone()))
            .expect("collector can be registered");
    });
}

/// Renders every engine metric in the Prometheus text exposition format.
pub fn gather_metrics() -> Result<String> {
    register_custom_metrics();

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| SystemError::Metrics(e.to_string()).into())
}
