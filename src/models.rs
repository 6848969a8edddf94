use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

/// A raw row as it appears in the input CSV. Numeric fields that are absent
/// or unparseable are carried as `None` until the cleaning step decides
/// whether the row survives.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub row: u64,
    pub time: String,
    pub source_id: String,
    pub power_output: Option<f64>,
    pub efficiency_factor: Option<f64>,
}

/// A cleaned sensor reading.
///
/// Invariants:
/// - `timestamp` parsed successfully during cleaning.
/// - `power_output` is present (rows without it are dropped).
/// - `efficiency_ratio` is `None` until `transform()` runs, and stays `None`
///   when `efficiency_factor` is missing or zero. It is never infinite.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub timestamp: NaiveDateTime,
    pub source_id: String,
    pub power_output: f64,
    pub efficiency_factor: Option<f64>,
    pub efficiency_ratio: Option<f64>,
}

/// One cell of the weekly aggregate: total power for a source within the
/// calendar week ending on `week_ending` (a Sunday).
#[derive(Debug, Clone, Serialize)]
pub struct WeeklyPoint {
    pub source_id: String,
    pub week_ending: NaiveDate,
    pub power_output: f64,
}

/// Total output of one source across the whole dataset.
#[derive(Debug, Clone, Serialize)]
pub struct SourceTotal {
    pub source_id: String,
    pub total_output: f64,
}

/// Output of `DataProcessor::aggregate`.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateResult {
    /// Weekly sums, ordered by source (first-seen order) then week.
    pub weekly: Vec<WeeklyPoint>,
    /// Up to five sources, descending by total output, ties in encounter order.
    pub top_sources: Vec<SourceTotal>,
    pub week_count: usize,
    pub source_count: usize,
    pub total_output: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub record_count: usize,
    pub columns: Vec<String>,
    pub unique_sources: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanReport {
    pub original_count: usize,
    pub removed_count: usize,
    pub retained_count: usize,
    pub invalid_timestamps: usize,
    pub missing_power: usize,
}

impl CleanReport {
    pub fn retention_rate(&self) -> f64 {
        if self.original_count == 0 {
            0.0
        } else {
            self.retained_count as f64 / self.original_count as f64 * 100.0
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TransformReport {
    pub valid_ratios: usize,
    pub non_finite_replaced: usize,
    pub min_ratio: Option<f64>,
    pub max_ratio: Option<f64>,
    pub mean_ratio: Option<f64>,
}

/// Summary statistics over the cleaned and transformed table.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryStats {
    pub total_records: usize,
    pub unique_sources: usize,
    pub date_range_start: Option<NaiveDateTime>,
    pub date_range_end: Option<NaiveDateTime>,
    pub total_power_output: f64,
    pub avg_power_output: f64,
    pub avg_efficiency_factor: Option<f64>,
    pub avg_efficiency_ratio: Option<f64>,
}
