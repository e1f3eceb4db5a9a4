//! Config for rendering InfluxQL text.

use serde::{Deserialize, Serialize};

/// The default placeholder substituted for an `auto` GROUP BY interval.
pub const DEFAULT_INTERVAL_PLACEHOLDER: &str = "$__interval";

/// The default placeholder for the dashboard time range.
pub const DEFAULT_TIME_FILTER: &str = "$timeFilter";

/// The default `LIMIT` of `SHOW MEASUREMENTS` explore statements.
pub const DEFAULT_MEASUREMENTS_LIMIT: u64 = 100;

/// CLI config for rendering queries.
///
/// The placeholders are emitted verbatim and substituted later by whatever
/// executes the query.
#[derive(Debug, Clone, PartialEq, Eq, clap::Parser, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Placeholder substituted for an `auto` GROUP BY time interval.
    #[clap(
        long = "interval-placeholder",
        env = "INFLUXQL_INTERVAL_PLACEHOLDER",
        default_value = DEFAULT_INTERVAL_PLACEHOLDER,
        action
    )]
    pub interval_placeholder: String,

    /// Placeholder for the time range, always the last WHERE condition.
    #[clap(
        long = "time-filter",
        env = "INFLUXQL_TIME_FILTER",
        default_value = DEFAULT_TIME_FILTER,
        action
    )]
    pub time_filter: String,

    /// Maximum number of measurements returned by `SHOW MEASUREMENTS`
    /// explore statements.
    #[clap(
        long = "measurements-limit",
        env = "INFLUXQL_MEASUREMENTS_LIMIT",
        default_value_t = DEFAULT_MEASUREMENTS_LIMIT,
        action
    )]
    pub measurements_limit: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            interval_placeholder: DEFAULT_INTERVAL_PLACEHOLDER.to_string(),
            time_filter: DEFAULT_TIME_FILTER.to_string(),
            measurements_limit: DEFAULT_MEASUREMENTS_LIMIT,
        }
    }
}
