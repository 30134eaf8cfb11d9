//! Optional Prometheus `/metrics` endpoint, gated behind
//! `search.metrics_enabled` since it is ambient observability rather than
//! part of the Atlas-dialect surface in §6: a process-wide registry
//! behind `once_cell`, counters/histograms updated inline by the call
//! sites that matter.

use once_cell::sync::Lazy;
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};

pub static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

pub static SEARCH_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        prometheus::opts!("oas_search_requests_total", "Number of search requests handled, by index and outcome"),
        &["index", "outcome"],
    )
    .expect("metric names are static and well-formed");
    REGISTRY.register(Box::new(counter.clone())).expect("registered once");
    counter
});

pub static SEARCH_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    let histogram = HistogramVec::new(
        prometheus::histogram_opts!("oas_search_latency_seconds", "Search request latency in seconds"),
        &["index"],
    )
    .expect("metric names are static and well-formed");
    REGISTRY.register(Box::new(histogram.clone())).expect("registered once");
    histogram
});

pub static DOCUMENTS_INDEXED: Lazy<IntCounterVec> = Lazy::new(|| {
    let counter = IntCounterVec::new(
        prometheus::opts!("oas_documents_indexed_total", "Documents written to the index, by index name"),
        &["index"],
    )
    .expect("metric names are static and well-formed");
    REGISTRY.register(Box::new(counter.clone())).expect("registered once");
    counter
});

/// Renders the registry in the Prometheus text exposition format.
pub fn render() -> String {
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&metric_families, &mut buffer).expect("text encoding never fails");
    String::from_utf8(buffer).expect("prometheus output is always valid utf8")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_registered_metric_names() {
        SEARCH_REQUESTS.with_label_values(&["products", "ok"]).inc();
        let body = render();
        assert!(body.contains("oas_search_requests_total"));
    }
}
