use std::collections::HashMap;

use parking_lot::RwLock;
use prometheus::core::Collector;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, TextEncoder};

use super::MetricsError;

// ─── Configuration ───────────────────────────────────────────────

/// Standard client latency buckets (seconds), 5 ms → 10 s.
/// The `+Inf` bucket is implicit and always rendered.
pub const DEFAULT_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.25, 0.5, 0.75, 1.0, 2.5, 5.0, 7.5,
    10.0,
];

/// Counter samples are exposed with this suffix, e.g. `request_count_total`.
const COUNTER_SUFFIX: &str = "_total";

// ─── Public types ────────────────────────────────────────────────

/// Injectable handle over a `prometheus::Registry`.
///
/// Families are addressed by their short name (`request_count`). Label sets
/// are checked against the declared names on every call; a mismatch fails
/// and records nothing. Series updates are atomic inside `prometheus`, the
/// lock here only guards the name → family table.
pub struct Registry {
    inner: prometheus::Registry,
    families: RwLock<HashMap<String, Family>>,
}

#[derive(Clone)]
struct Family {
    label_names: Vec<String>,
    kind: Kind,
}

#[derive(Clone)]
enum Kind {
    Counter(IntCounterVec),
    Histogram(HistogramVec),
}

// ─── Registry impl ───────────────────────────────────────────────

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: prometheus::Registry::new(),
            families: RwLock::new(HashMap::new()),
        }
    }

    /// Every family is exposed as `<namespace>_<name>`.
    pub fn with_namespace(namespace: &str) -> Result<Self, MetricsError> {
        let inner = prometheus::Registry::new_custom(Some(namespace.to_owned()), None)
            .map_err(|source| MetricsError::Registration {
                name: namespace.to_owned(),
                source,
            })?;
        Ok(Self {
            inner,
            families: RwLock::new(HashMap::new()),
        })
    }

    pub fn register_counter(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
    ) -> Result<(), MetricsError> {
        validate_label_names(name, label_names, false)?;
        let exposed = if name.ends_with(COUNTER_SUFFIX) {
            name.to_owned()
        } else {
            format!("{name}{COUNTER_SUFFIX}")
        };
        let counter = IntCounterVec::new(Opts::new(exposed, help), label_names)
            .map_err(|source| registration(name, source))?;

        self.insert(
            name,
            label_names,
            Kind::Counter(counter.clone()),
            Box::new(counter),
        )
    }

    pub fn register_histogram(
        &self,
        name: &str,
        help: &str,
        label_names: &[&str],
        buckets: &[f64],
    ) -> Result<(), MetricsError> {
        validate_label_names(name, label_names, true)?;
        let finite = buckets.iter().all(|b| b.is_finite());
        let increasing = buckets.windows(2).all(|w| w[0] < w[1]);
        if buckets.is_empty() || !finite || !increasing {
            return Err(MetricsError::InvalidBuckets(name.to_owned()));
        }

        let opts = HistogramOpts::new(name, help).buckets(buckets.to_vec());
        let histogram =
            HistogramVec::new(opts, label_names).map_err(|source| registration(name, source))?;

        self.insert(
            name,
            label_names,
            Kind::Histogram(histogram.clone()),
            Box::new(histogram),
        )
    }

    /// Add 1 to the series selected by `labels`, creating it at 0 first.
    pub fn increment_counter(
        &self,
        name: &str,
        labels: &[(&str, &str)],
    ) -> Result<(), MetricsError> {
        let family = self.family(name)?;
        match &family.kind {
            Kind::Counter(vec) => {
                let series = vec
                    .get_metric_with(&family.label_map(name, labels)?)
                    .map_err(|_| family.mismatch(name, labels))?;
                series.inc();
                Ok(())
            }
            Kind::Histogram(_) => Err(MetricsError::WrongKind {
                name: name.to_owned(),
                expected: "counter",
            }),
        }
    }

    /// Record one observation (seconds) into the series selected by `labels`.
    pub fn observe_histogram(
        &self,
        name: &str,
        labels: &[(&str, &str)],
        value: f64,
    ) -> Result<(), MetricsError> {
        if !value.is_finite() || value < 0.0 {
            return Err(MetricsError::InvalidObservation {
                name: name.to_owned(),
                value,
            });
        }

        let family = self.family(name)?;
        match &family.kind {
            Kind::Histogram(vec) => {
                let series = vec
                    .get_metric_with(&family.label_map(name, labels)?)
                    .map_err(|_| family.mismatch(name, labels))?;
                series.observe(value);
                Ok(())
            }
            Kind::Counter(_) => Err(MetricsError::WrongKind {
                name: name.to_owned(),
                expected: "histogram",
            }),
        }
    }

    /// Lines of the text exposition format. Families without any series
    /// are left out, so a cold registry yields no lines.
    pub fn render(&self) -> Result<impl Iterator<Item = String>, MetricsError> {
        let body = self.encode()?;
        let lines: Vec<String> = body.lines().map(str::to_owned).collect();
        Ok(lines.into_iter())
    }

    /// Whole scrape body, newline terminated.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.gather();
        encoder
            .encode_to_string(&metric_families)
            .map_err(MetricsError::Encode)
    }

    fn family(&self, name: &str) -> Result<Family, MetricsError> {
        self.families
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| MetricsError::UnknownMetric(name.to_owned()))
    }

    fn insert(
        &self,
        name: &str,
        label_names: &[&str],
        kind: Kind,
        collector: Box<dyn Collector>,
    ) -> Result<(), MetricsError> {
        let mut families = self.families.write();
        if families.contains_key(name) {
            return Err(MetricsError::AlreadyRegistered(name.to_owned()));
        }
        self.inner
            .register(collector)
            .map_err(|source| registration(name, source))?;
        families.insert(
            name.to_owned(),
            Family {
                label_names: label_names.iter().map(|n| (*n).to_owned()).collect(),
                kind,
            },
        );
        Ok(())
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Family impl ─────────────────────────────────────────────────

impl Family {
    /// Supplied keys must be exactly the declared set, each given once.
    fn label_map<'a>(
        &self,
        name: &str,
        labels: &[(&'a str, &'a str)],
    ) -> Result<HashMap<&'a str, &'a str>, MetricsError> {
        let map: HashMap<&str, &str> = labels.iter().copied().collect();
        if map.len() != labels.len() || map.len() != self.label_names.len() {
            return Err(self.mismatch(name, labels));
        }
        Ok(map)
    }

    fn mismatch(&self, name: &str, labels: &[(&str, &str)]) -> MetricsError {
        MetricsError::LabelMismatch {
            name: name.to_owned(),
            expected: self.label_names.clone(),
            got: labels.iter().map(|(k, _)| (*k).to_owned()).collect(),
        }
    }
}

fn validate_label_names(
    name: &str,
    label_names: &[&str],
    histogram: bool,
) -> Result<(), MetricsError> {
    let duplicated = label_names
        .iter()
        .enumerate()
        .any(|(i, a)| label_names[..i].contains(a));
    // `le` carries the bucket bound; `prometheus` only rejects it per series
    let reserved = histogram && label_names.contains(&"le");
    if duplicated || reserved {
        return Err(MetricsError::InvalidLabelNames(name.to_owned()));
    }
    Ok(())
}

fn registration(name: &str, source: prometheus::Error) -> MetricsError {
    MetricsError::Registration {
        name: name.to_owned(),
        source,
    }
}
