//! Operation instrumentation.
//!
//! Every pouch operation runs through [`instrument`], which opens a tracing
//! span (feature `tracing`) and records counters and a duration histogram
//! (feature `metrics`). With both features off it is a plain call.

use crate::error::Result;

/// Run `op` as the `operation` of `backend`, with whatever instrumentation
/// is compiled in.
pub fn instrument<T>(
    backend: &'static str,
    operation: &'static str,
    op: impl FnOnce() -> Result<T>,
) -> Result<T> {
    #[cfg(feature = "tracing")]
    let _span = tracing_helpers::pouch_operation_span(backend, operation).entered();

    #[cfg(feature = "metrics")]
    let start = std::time::Instant::now();

    let result = op();

    #[cfg(feature = "metrics")]
    METRICS.record(backend, operation, start.elapsed(), result.is_ok());

    if let Err(e) = &result {
        log::debug!("{backend}: {operation} failed: {e}");
    }
    result
}

#[cfg(feature = "metrics")]
pub use self::otel::{PouchMetrics, METRICS};

#[cfg(feature = "metrics")]
mod otel {
    use once_cell::sync::Lazy;
    use opentelemetry::{
        global,
        metrics::{Counter, Histogram},
        KeyValue,
    };
    use opentelemetry_prometheus::PrometheusExporter;
    use opentelemetry_sdk::metrics::SdkMeterProvider;
    use prometheus::Registry;
    use std::time::Duration;

    pub static METRICS: Lazy<PouchMetrics> = Lazy::new(PouchMetrics::init);

    pub struct PouchMetrics {
        pub registry: Registry,
        pub operations_total: Counter<u64>,
        pub operation_errors_total: Counter<u64>,
        pub operation_duration: Histogram<f64>,
    }

    fn exporter(registry: &Registry) -> Option<PrometheusExporter> {
        match opentelemetry_prometheus::exporter()
            .with_registry(registry.clone())
            .build()
        {
            Ok(exporter) => Some(exporter),
            Err(e) => {
                log::warn!("pouch metrics: prometheus exporter unavailable: {e}");
                None
            }
        }
    }

    impl PouchMetrics {
        pub fn init() -> Self {
            let registry = Registry::new();
            if let Some(exporter) = exporter(&registry) {
                let provider = SdkMeterProvider::builder().with_reader(exporter).build();
                global::set_meter_provider(provider);
            }
            let meter = global::meter("pouch");

            let operations_total = meter
                .u64_counter("pouch_operations_total")
                .with_description("Pouch operations executed")
                .build();

            let operation_errors_total = meter
                .u64_counter("pouch_operation_errors_total")
                .with_description("Pouch operations that returned an error")
                .build();

            let operation_duration = meter
                .f64_histogram("pouch_operation_duration_seconds")
                .with_description("Duration of pouch operations")
                .build();

            Self {
                registry,
                operations_total,
                operation_errors_total,
                operation_duration,
            }
        }

        pub fn record(&self, backend: &'static str, operation: &'static str, elapsed: Duration, ok: bool) {
            let attrs = [
                KeyValue::new("backend", backend),
                KeyValue::new("operation", operation),
            ];
            self.operations_total.add(1, &attrs);
            self.operation_duration.record(elapsed.as_secs_f64(), &attrs);
            if !ok {
                self.operation_errors_total.add(1, &attrs);
            }
        }
    }
}

#[cfg(feature = "tracing")]
pub mod tracing_helpers {
    use tracing::{span, Level, Span};

    /// Span around one pouch operation.
    pub fn pouch_operation_span(backend: &'static str, operation: &'static str) -> Span {
        span!(Level::DEBUG, "pouch_operation", backend, operation)
    }

    /// Span around one SQL statement sent to the driver.
    pub fn execute_statement_span(sql: &str) -> Span {
        span!(Level::DEBUG, "execute_statement", sql = %sql)
    }
}
