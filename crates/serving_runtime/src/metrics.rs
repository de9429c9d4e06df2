//! Метрики сервинга: счётчик запросов и гистограмма задержки (Prometheus text format).

use prometheus::{Encoder, Histogram, HistogramOpts, IntCounter, Registry, TextEncoder};

use crate::error::ServingError;

pub const REQUESTS_TOTAL: &str = "churn_requests_total";
pub const REQUEST_LATENCY: &str = "churn_request_latency_seconds";

/// Отдельный Registry на сервис — без глобального состояния и двойной регистрации в тестах.
pub struct ServingMetrics {
    registry: Registry,
    requests: IntCounter,
    latency: Histogram,
}

impl ServingMetrics {
    pub fn new() -> Result<Self, ServingError> {
        let registry = Registry::new();
        let requests = IntCounter::new(REQUESTS_TOTAL, "Total prediction requests")?;
        let latency = Histogram::with_opts(HistogramOpts::new(REQUEST_LATENCY, "Request latency"))?;
        registry.register(Box::new(requests.clone()))?;
        registry.register(Box::new(latency.clone()))?;
        Ok(Self {
            registry,
            requests,
            latency,
        })
    }

    pub(crate) fn requests(&self) -> &IntCounter {
        &self.requests
    }

    pub(crate) fn latency(&self) -> &Histogram {
        &self.latency
    }

    pub fn requests_total(&self) -> u64 {
        self.requests.get()
    }

    pub fn latency_observations(&self) -> u64 {
        self.latency.get_sample_count()
    }

    pub fn render(&self) -> Result<String, ServingError> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| ServingError::Metrics(prometheus::Error::Msg(e.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_contains_both_metrics() {
        let metrics = ServingMetrics::new().expect("metrics");
        metrics.requests().inc();
        metrics.latency().observe(0.01);
        let text = metrics.render().expect("render");
        assert!(text.contains("churn_requests_total 1"));
        assert!(text.contains("churn_request_latency_seconds_count 1"));
    }
}
