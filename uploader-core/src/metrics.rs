// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Run Metrics
//!
//! A small `prometheus` registry holding the counters and gauges a single
//! run needs to be observable: how many files were discovered, completed,
//! or failed, how many chunks moved through the queue, and how deep the
//! queue currently is. `status_report` (see `control_loop`) is the
//! human-readable complement to this machine-readable surface.

use prometheus::{Gauge, IntCounter, IntGauge, Opts, Registry};

use uploader_domain::error::UploaderError;

/// Counters and gauges for one run, registered against their own
/// `prometheus::Registry` rather than the global default so multiple runs
/// in the same process (as in the integration tests) don't collide.
pub struct RunMetrics {
    registry: Registry,
    pub files_discovered_total: IntCounter,
    pub files_completed_total: IntCounter,
    pub files_failed_total: IntCounter,
    pub chunks_enqueued_total: IntCounter,
    pub chunks_acked_total: IntCounter,
    pub queue_depth: IntGauge,
    pub scan_wait_seconds: Gauge,
}

impl RunMetrics {
    pub fn new() -> Result<Self, UploaderError> {
        let registry = Registry::new();

        let files_discovered_total = IntCounter::with_opts(Opts::new(
            "files_discovered_total",
            "Number of files admitted into the registry",
        ))
        .map_err(metrics_err("files_discovered_total"))?;

        let files_completed_total = IntCounter::with_opts(Opts::new(
            "files_completed_total",
            "Number of files that reached FullyAcked",
        ))
        .map_err(metrics_err("files_completed_total"))?;

        let files_failed_total = IntCounter::with_opts(Opts::new(
            "files_failed_total",
            "Number of files that reached Failed",
        ))
        .map_err(metrics_err("files_failed_total"))?;

        let chunks_enqueued_total = IntCounter::with_opts(Opts::new(
            "chunks_enqueued_total",
            "Number of chunks pushed onto the bounded queue",
        ))
        .map_err(metrics_err("chunks_enqueued_total"))?;

        let chunks_acked_total = IntCounter::with_opts(Opts::new(
            "chunks_acked_total",
            "Number of chunks the producer client reported delivered",
        ))
        .map_err(metrics_err("chunks_acked_total"))?;

        let queue_depth =
            IntGauge::with_opts(Opts::new("queue_depth", "Current number of chunks waiting in the queue"))
                .map_err(metrics_err("queue_depth"))?;

        let scan_wait_seconds = Gauge::with_opts(Opts::new(
            "scan_wait_seconds",
            "Current adaptive wait before the next directory scan",
        ))
        .map_err(metrics_err("scan_wait_seconds"))?;

        registry
            .register(Box::new(files_discovered_total.clone()))
            .map_err(metrics_err("files_discovered_total"))?;
        registry
            .register(Box::new(files_completed_total.clone()))
            .map_err(metrics_err("files_completed_total"))?;
        registry
            .register(Box::new(files_failed_total.clone()))
            .map_err(metrics_err("files_failed_total"))?;
        registry
            .register(Box::new(chunks_enqueued_total.clone()))
            .map_err(metrics_err("chunks_enqueued_total"))?;
        registry
            .register(Box::new(chunks_acked_total.clone()))
            .map_err(metrics_err("chunks_acked_total"))?;
        registry.register(Box::new(queue_depth.clone())).map_err(metrics_err("queue_depth"))?;
        registry
            .register(Box::new(scan_wait_seconds.clone()))
            .map_err(metrics_err("scan_wait_seconds"))?;

        Ok(Self {
            registry,
            files_discovered_total,
            files_completed_total,
            files_failed_total,
            chunks_enqueued_total,
            chunks_acked_total,
            queue_depth,
            scan_wait_seconds,
        })
    }

    /// Renders every registered metric in the Prometheus text exposition
    /// format, for a future `/metrics` endpoint or ad-hoc inspection.
    pub fn encode(&self) -> Result<String, UploaderError> {
        use prometheus::Encoder;
        let encoder = prometheus::TextEncoder::new();
        let families = self.registry.gather();
        let mut buf = Vec::new();
        encoder
            .encode(&families, &mut buf)
            .map_err(|e| UploaderError::Io(format!("encoding metrics: {e}")))?;
        String::from_utf8(buf).map_err(|e| UploaderError::Io(format!("metrics output not valid utf-8: {e}")))
    }
}

fn metrics_err(metric_name: &'static str) -> impl Fn(prometheus::Error) -> UploaderError {
    move |e| UploaderError::Configuration(format!("registering metric {metric_name}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero_and_increment() {
        let metrics = RunMetrics::new().unwrap();
        assert_eq!(metrics.files_discovered_total.get(), 0);
        metrics.files_discovered_total.inc();
        assert_eq!(metrics.files_discovered_total.get(), 1);
    }

    #[test]
    fn encode_includes_registered_metric_names() {
        let metrics = RunMetrics::new().unwrap();
        metrics.chunks_enqueued_total.inc_by(3);
        let text = metrics.encode().unwrap();
        assert!(text.contains("chunks_enqueued_total"));
    }
}
