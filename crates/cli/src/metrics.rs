use anyhow::Result;
use prometheus::{Encoder, IntCounter, IntGauge, Opts, Registry, TextEncoder};
use std::time::SystemTime;
use typeahead_indexer::{ConsolidatorHealth, IndexSnapshot};

/// Prometheus registry for the HTTP surface, rendered on `/metrics`.
#[derive(Clone)]
pub struct MetricsExporter {
    registry: Registry,
    consolidating: IntGauge,
    pending_queries: IntGauge,
    index_words: IntGauge,
    index_nodes: IntGauge,
    consecutive_failures: IntGauge,
    last_duration_ms: IntGauge,
    last_success_unix_ms: IntGauge,
    passes: IntGauge,
    failures: IntGauge,
    skipped_ticks: IntGauge,
    queries_recorded: IntCounter,
    queries_rejected: IntCounter,
}

impl MetricsExporter {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let gauge = |name: &str, help: &str| -> Result<IntGauge> {
            let gauge = IntGauge::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(gauge.clone()))?;
            Ok(gauge)
        };
        let counter = |name: &str, help: &str| -> Result<IntCounter> {
            let counter = IntCounter::with_opts(Opts::new(name, help))?;
            registry.register(Box::new(counter.clone()))?;
            Ok(counter)
        };

        Ok(Self {
            consolidating: gauge(
                "typeahead_consolidating",
                "1 while a consolidation pass holds the ingestion gate",
            )?,
            pending_queries: gauge(
                "typeahead_pending_queries",
                "Distinct words waiting for the next pass",
            )?,
            index_words: gauge(
                "typeahead_index_words",
                "Words in the prefix index for the current window",
            )?,
            index_nodes: gauge("typeahead_index_nodes", "Nodes in the prefix index")?,
            consecutive_failures: gauge(
                "typeahead_consecutive_failures",
                "Number of consecutive failed passes",
            )?,
            last_duration_ms: gauge(
                "typeahead_last_pass_duration_ms",
                "Duration of the last pass",
            )?,
            last_success_unix_ms: gauge(
                "typeahead_last_success_unix_ms",
                "Unix timestamp (ms) of the last successful pass",
            )?,
            passes: gauge("typeahead_passes", "Completed passes since start")?,
            failures: gauge("typeahead_failures", "Failed passes since start")?,
            skipped_ticks: gauge(
                "typeahead_skipped_ticks",
                "Ticks dropped because a pass was already running",
            )?,
            queries_recorded: counter(
                "typeahead_queries_recorded_total",
                "Queries accepted by the ingestion gate",
            )?,
            queries_rejected: counter(
                "typeahead_queries_rejected_total",
                "Queries rejected while consolidating",
            )?,
            registry,
        })
    }

    pub fn record_query(&self, accepted: bool) {
        if accepted {
            self.queries_recorded.inc();
        } else {
            self.queries_rejected.inc();
        }
    }

    pub fn update(&self, health: &ConsolidatorHealth, index: &IndexSnapshot, consolidating: bool) {
        self.consolidating.set(i64::from(consolidating));
        self.pending_queries.set(as_i64(index.pending_queries as u64));
        self.index_words.set(as_i64(index.words as u64));
        self.index_nodes.set(as_i64(index.nodes as u64));
        self.consecutive_failures
            .set(i64::from(health.consecutive_failures));
        self.last_duration_ms
            .set(as_i64(health.last_duration_ms.unwrap_or(0)));
        self.last_success_unix_ms
            .set(as_i64(to_unix_ms(health.last_success)));
        self.passes.set(as_i64(health.passes));
        self.failures.set(as_i64(health.failures));
        self.skipped_ticks.set(as_i64(health.skipped_ticks));
    }

    /// Text exposition format plus its content type.
    pub fn render(&self) -> Result<(String, Vec<u8>)> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

fn as_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_unix_ms(ts: Option<SystemTime>) -> u64 {
    ts.and_then(|time| time.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|dur| u64::try_from(dur.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
