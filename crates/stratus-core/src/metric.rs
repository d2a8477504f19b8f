//! Metric descriptors
//!
//! Provides [`Metric`], the description of a measurement stream a resource
//! emits. Scaling policies consume metrics either by name (predefined
//! specifications) or as a full custom specification.

use std::time::Duration;

use indexmap::IndexMap;

use crate::expr::Expr;

const DEFAULT_PERIOD: Duration = Duration::from_secs(300);
const DEFAULT_STATISTIC: &str = "Average";

/// Description of a metric emitted by a resource
///
/// Dimensions may carry deferred expressions, so a metric can point at
/// resources that only get their names at deployment time.
#[derive(Debug, Clone)]
pub struct Metric {
    namespace: String,
    metric_name: String,
    dimensions: IndexMap<String, Expr>,
    period: Duration,
    statistic: String,
}

impl Metric {
    /// Create a metric with a 5 minute period and `Average` statistic
    #[must_use]
    pub fn new(namespace: impl Into<String>, metric_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            metric_name: metric_name.into(),
            dimensions: IndexMap::new(),
            period: DEFAULT_PERIOD,
            statistic: DEFAULT_STATISTIC.to_owned(),
        }
    }

    /// Add a dimension (builder form)
    #[must_use]
    pub fn with_dimension(mut self, name: impl Into<String>, value: impl Into<Expr>) -> Self {
        self.dimensions.insert(name.into(), value.into());
        self
    }

    /// Override the aggregation period (builder form)
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Override the statistic (builder form)
    #[must_use]
    pub fn with_statistic(mut self, statistic: impl Into<String>) -> Self {
        self.statistic = statistic.into();
        self
    }

    /// Metric namespace, e.g. `AWS/ECS`
    #[inline]
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Metric name, e.g. `CPUUtilization`
    #[inline]
    #[must_use]
    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }

    /// Dimensions in insertion order
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> &IndexMap<String, Expr> {
        &self.dimensions
    }

    /// Aggregation period
    #[inline]
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Statistic applied over the period
    #[inline]
    #[must_use]
    pub fn statistic(&self) -> &str {
        &self.statistic
    }

    /// Expression form of the full metric description
    ///
    /// Renders `{"namespace", "metricName", "dimensions", "period",
    /// "statistic"}` with the period in seconds; `dimensions` is omitted
    /// when there are none.
    #[must_use]
    pub fn to_expr(&self) -> Expr {
        let mut entries = IndexMap::new();
        if !self.dimensions.is_empty() {
            entries.insert("dimensions".to_owned(), Expr::map(self.dimensions.clone()));
        }
        entries.insert("metricName".to_owned(), Expr::from(self.metric_name.clone()));
        entries.insert("namespace".to_owned(), Expr::from(self.namespace.clone()));
        entries.insert("period".to_owned(), Expr::from(self.period.as_secs()));
        entries.insert("statistic".to_owned(), Expr::from(self.statistic.clone()));
        Expr::map(entries)
    }
}
