// Execution metrics
//
// Counters, gauges, and histograms for:
// - Results by kind
// - Compile and run step durations
// - Workspace cleanup outcomes
// - In-flight requests
//
// A registry is owned by each executor rather than held globally, so
// independent executors (and tests) never share counts.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::verdict::{ResultKind, Stage};

/// Monotonically increasing counter
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

/// Value that moves up and down
#[derive(Debug, Default)]
pub struct Gauge {
    value: AtomicU64,
}

impl Gauge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc(&self) {
        self.value.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        let _ = self
            .value
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| Some(v.saturating_sub(1)));
    }

    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct HistogramBucket {
    le: f64, // upper bound in seconds
    count: AtomicU64,
}

/// Cumulative latency histogram
#[derive(Debug)]
pub struct Histogram {
    buckets: Vec<HistogramBucket>,
    sum_micros: AtomicU64,
    count: AtomicU64,
}

impl Histogram {
    /// Buckets sized for process stages: tens of milliseconds up to a minute.
    pub fn new_stage_latency() -> Self {
        let buckets = [0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]
            .into_iter()
            .map(|le| HistogramBucket {
                le,
                count: AtomicU64::new(0),
            })
            .collect();

        Self {
            buckets,
            sum_micros: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    pub fn observe(&self, value: Duration) {
        let seconds = value.as_secs_f64();
        self.sum_micros
            .fetch_add(value.as_micros() as u64, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for bucket in &self.buckets {
            if seconds <= bucket.le {
                bucket.count.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn get_count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn get_sum_micros(&self) -> u64 {
        self.sum_micros.load(Ordering::Relaxed)
    }

    pub fn get_bucket_count(&self, le: f64) -> u64 {
        self.buckets
            .iter()
            .find(|b| (b.le - le).abs() < 0.0001)
            .map(|b| b.count.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    fn export(&self, name: &str, help: &str, out: &mut String) {
        out.push_str(&format!("# HELP {} {}\n", name, help));
        out.push_str(&format!("# TYPE {} histogram\n", name));
        for bucket in &self.buckets {
            out.push_str(&format!(
                "{}_bucket{{le=\"{}\"}} {}\n",
                name,
                bucket.le,
                bucket.count.load(Ordering::Relaxed)
            ));
        }
        out.push_str(&format!("{}_bucket{{le=\"+Inf\"}} {}\n", name, self.get_count()));
        out.push_str(&format!(
            "{}_sum {}\n",
            name,
            self.get_sum_micros() as f64 / 1_000_000.0
        ));
        out.push_str(&format!("{}_count {}\n", name, self.get_count()));
    }
}

/// Metrics for one executor
#[derive(Debug)]
pub struct ExecutionMetrics {
    pub executions_total: Counter,
    results: [Counter; ResultKind::ALL.len()],

    pub cleanup_success: Counter,
    pub cleanup_failure: Counter,

    pub in_flight: Gauge,

    pub compile_duration: Histogram,
    pub run_duration: Histogram,
    pub request_duration: Histogram,
}

impl ExecutionMetrics {
    pub fn new() -> Self {
        Self {
            executions_total: Counter::new(),
            results: Default::default(),
            cleanup_success: Counter::new(),
            cleanup_failure: Counter::new(),
            in_flight: Gauge::new(),
            compile_duration: Histogram::new_stage_latency(),
            run_duration: Histogram::new_stage_latency(),
            request_duration: Histogram::new_stage_latency(),
        }
    }

    /// Record a finished request
    pub fn record_result(&self, kind: ResultKind, elapsed: Duration) {
        self.executions_total.inc();
        self.results[Self::slot(kind)].inc();
        self.request_duration.observe(elapsed);
    }

    /// Record the duration of the stage that decided a result
    pub fn record_stage(&self, stage: Stage, elapsed: Duration) {
        match stage {
            Stage::Compile => self.compile_duration.observe(elapsed),
            Stage::Run => self.run_duration.observe(elapsed),
        }
    }

    pub fn record_cleanup(&self, removed: bool) {
        if removed {
            self.cleanup_success.inc();
        } else {
            self.cleanup_failure.inc();
        }
    }

    pub fn results_of(&self, kind: ResultKind) -> u64 {
        self.results[Self::slot(kind)].get()
    }

    /// Mark a request in flight until the guard drops
    pub fn track_in_flight(&self) -> InFlight<'_> {
        self.in_flight.inc();
        InFlight { gauge: &self.in_flight }
    }

    fn slot(kind: ResultKind) -> usize {
        ResultKind::ALL
            .iter()
            .position(|k| *k == kind)
            .unwrap_or_default()
    }

    /// Export metrics in Prometheus text format
    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP codebox_executions_total Total number of execution requests\n");
        output.push_str("# TYPE codebox_executions_total counter\n");
        output.push_str(&format!(
            "codebox_executions_total {}\n",
            self.executions_total.get()
        ));

        output.push_str("# HELP codebox_results_total Results by kind\n");
        output.push_str("# TYPE codebox_results_total counter\n");
        for kind in ResultKind::ALL {
            output.push_str(&format!(
                "codebox_results_total{{kind=\"{}\"}} {}\n",
                kind,
                self.results_of(kind)
            ));
        }

        output.push_str("# HELP codebox_cleanup_total Workspace cleanup outcomes\n");
        output.push_str("# TYPE codebox_cleanup_total counter\n");
        output.push_str(&format!(
            "codebox_cleanup_total{{outcome=\"success\"}} {}\n",
            self.cleanup_success.get()
        ));
        output.push_str(&format!(
            "codebox_cleanup_total{{outcome=\"failure\"}} {}\n",
            self.cleanup_failure.get()
        ));

        output.push_str("# HELP codebox_in_flight Requests currently executing\n");
        output.push_str("# TYPE codebox_in_flight gauge\n");
        output.push_str(&format!("codebox_in_flight {}\n", self.in_flight.get()));

        self.compile_duration.export(
            "codebox_compile_duration_seconds",
            "Duration of compile steps",
            &mut output,
        );
        self.run_duration.export(
            "codebox_run_duration_seconds",
            "Duration of run steps",
            &mut output,
        );
        self.request_duration.export(
            "codebox_request_duration_seconds",
            "End-to-end request duration",
            &mut output,
        );

        output
    }
}

impl Default for ExecutionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the in-flight gauge on drop, including on unwind
pub struct InFlight<'a> {
    gauge: &'a Gauge,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.gauge.dec();
    }
}
