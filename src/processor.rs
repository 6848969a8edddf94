use crate::error::PipelineError;
use crate::models::{
    AggregateResult, CleanReport, LoadReport, RawRecord, Reading, SourceTotal, SummaryStats,
    TransformReport, WeeklyPoint,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const REQUIRED_COLUMNS: [&str; 4] = ["Time", "Source_ID", "Power_Output", "Efficiency_Factor"];

/// Timestamp formats accepted by the cleaning step, tried in order.
const TIMESTAMP_FORMATS: [&str; 5] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Processes sensor readings from renewable energy sources: loading,
/// cleaning, transformation and weekly aggregation.
///
/// Steps are strictly ordered: `load → clean → transform → aggregate`.
/// Each step returns [`PipelineError::NoDataLoaded`] when its predecessor
/// has not completed.
pub struct DataProcessor {
    path: PathBuf,
    raw: Option<Vec<RawRecord>>,
    cleaned: Option<Vec<Reading>>,
    transformed: bool,
}

impl DataProcessor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            raw: None,
            cleaned: None,
            transformed: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the input CSV into raw records.
    ///
    /// The schema check runs against the header before any row is touched;
    /// columns beyond the required four are ignored.
    pub fn load(&mut self) -> Result<LoadReport, PipelineError> {
        let file = File::open(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PipelineError::FileNotFound(self.path.clone()),
            _ => PipelineError::Io(e),
        })?;

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| self.parse_error(e))?
            .clone();

        if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
            return Err(PipelineError::EmptyInput(self.path.clone()));
        }

        let columns: Vec<String> = headers.iter().map(str::to_string).collect();

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|c| !columns.iter().any(|h| h == *c))
            .map(|c| c.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::SchemaMismatch(missing));
        }

        let idx = |name: &str| columns.iter().position(|h| h == name).unwrap_or(0);
        let time_idx = idx("Time");
        let source_idx = idx("Source_ID");
        let power_idx = idx("Power_Output");
        let factor_idx = idx("Efficiency_Factor");

        let mut records = Vec::new();
        for (i, result) in reader.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;
            records.push(RawRecord {
                // header is line 1
                row: i as u64 + 2,
                time: record.get(time_idx).unwrap_or_default().to_string(),
                source_id: record.get(source_idx).unwrap_or_default().to_string(),
                power_output: parse_float(record.get(power_idx).unwrap_or_default()),
                efficiency_factor: parse_float(record.get(factor_idx).unwrap_or_default()),
            });
        }

        if records.is_empty() {
            return Err(PipelineError::EmptyInput(self.path.clone()));
        }

        let unique_sources: HashSet<&str> =
            records.iter().map(|r| r.source_id.as_str()).collect();

        let report = LoadReport {
            record_count: records.len(),
            columns,
            unique_sources: unique_sources.len(),
        };

        debug!("loaded {} records from {}", records.len(), self.path.display());
        self.raw = Some(records);
        self.cleaned = None;
        self.transformed = false;
        Ok(report)
    }

    /// Coerces timestamps and drops rows that fail to parse or have no
    /// power output. Dropped row numbers are reported via `log::warn!`.
    pub fn clean(&mut self) -> Result<CleanReport, PipelineError> {
        let raw = self
            .raw
            .take()
            .ok_or(PipelineError::NoDataLoaded { expected: "load" })?;

        let original_count = raw.len();
        let mut invalid_timestamps = 0;
        let mut missing_power = 0;
        let mut readings = Vec::with_capacity(original_count);

        for record in raw {
            let timestamp = match parse_timestamp(&record.time) {
                Some(ts) => ts,
                None => {
                    invalid_timestamps += 1;
                    warn!(
                        "row {}: invalid timestamp {:?}, dropping",
                        record.row, record.time
                    );
                    continue;
                }
            };
            let power_output = match record.power_output {
                Some(p) => p,
                None => {
                    missing_power += 1;
                    warn!("row {}: missing Power_Output, dropping", record.row);
                    continue;
                }
            };
            readings.push(Reading {
                timestamp,
                source_id: record.source_id,
                power_output,
                efficiency_factor: record.efficiency_factor,
                efficiency_ratio: None,
            });
        }

        let report = CleanReport {
            original_count,
            removed_count: original_count - readings.len(),
            retained_count: readings.len(),
            invalid_timestamps,
            missing_power,
        };

        self.cleaned = Some(readings);
        self.transformed = false;
        Ok(report)
    }

    /// Computes `efficiency_ratio = power_output / efficiency_factor`,
    /// replacing non-finite results with `None`.
    pub fn transform(&mut self) -> Result<TransformReport, PipelineError> {
        let readings = self
            .cleaned
            .as_mut()
            .ok_or(PipelineError::NoDataLoaded { expected: "clean" })?;

        let mut non_finite_replaced = 0;
        for reading in readings.iter_mut() {
            reading.efficiency_ratio = match reading.efficiency_factor {
                Some(factor) => {
                    let ratio = reading.power_output / factor;
                    if ratio.is_finite() {
                        Some(ratio)
                    } else {
                        non_finite_replaced += 1;
                        None
                    }
                }
                None => None,
            };
        }

        let valid: Vec<f64> = readings.iter().filter_map(|r| r.efficiency_ratio).collect();
        let report = TransformReport {
            valid_ratios: valid.len(),
            non_finite_replaced,
            min_ratio: valid.iter().copied().reduce(f64::min),
            max_ratio: valid.iter().copied().reduce(f64::max),
            mean_ratio: if valid.is_empty() {
                None
            } else {
                Some(valid.iter().sum::<f64>() / valid.len() as f64)
            },
        };

        self.transformed = true;
        Ok(report)
    }

    /// Buckets readings into calendar weeks (week-ending Sunday), sums power
    /// per source and week, and ranks sources by total output.
    ///
    /// Ranking is a stable descending sort, so ties keep the order in which
    /// sources first appear in the cleaned data.
    pub fn aggregate(&self) -> Result<AggregateResult, PipelineError> {
        let readings = self.readings()?;

        // First-seen order per source is the tie-break for the ranking.
        let mut source_order: Vec<String> = Vec::new();
        let mut source_index: HashMap<String, usize> = HashMap::new();
        let mut weekly_sums: HashMap<(usize, NaiveDate), f64> = HashMap::new();

        for reading in readings {
            let idx = match source_index.get(&reading.source_id) {
                Some(&i) => i,
                None => {
                    let i = source_order.len();
                    source_order.push(reading.source_id.clone());
                    source_index.insert(reading.source_id.clone(), i);
                    i
                }
            };
            let week = week_ending_sunday(reading.timestamp);
            *weekly_sums.entry((idx, week)).or_insert(0.0) += reading.power_output;
        }

        let mut weekly = Vec::with_capacity(weekly_sums.len());
        let mut totals = vec![0.0f64; source_order.len()];
        for (idx, source_id) in source_order.iter().enumerate() {
            let mut weeks: BTreeMap<NaiveDate, f64> = BTreeMap::new();
            for ((i, week), sum) in &weekly_sums {
                if *i == idx {
                    weeks.insert(*week, *sum);
                }
            }
            for (week_ending, power_output) in weeks {
                totals[idx] += power_output;
                weekly.push(WeeklyPoint {
                    source_id: source_id.clone(),
                    week_ending,
                    power_output,
                });
            }
        }

        let mut ranked: Vec<usize> = (0..source_order.len()).collect();
        // sort_by is stable: equal totals preserve encounter order
        ranked.sort_by(|&a, &b| totals[b].total_cmp(&totals[a]));

        let top_sources: Vec<SourceTotal> = ranked
            .into_iter()
            .take(5)
            .map(|i| SourceTotal {
                source_id: source_order[i].clone(),
                total_output: totals[i],
            })
            .collect();

        let week_count = weekly
            .iter()
            .map(|w| w.week_ending)
            .collect::<HashSet<_>>()
            .len();

        Ok(AggregateResult {
            total_output: weekly.iter().map(|w| w.power_output).sum(),
            week_count,
            source_count: source_order.len(),
            weekly,
            top_sources,
        })
    }

    /// Summary statistics over the cleaned and transformed table.
    pub fn summary(&self) -> Result<SummaryStats, PipelineError> {
        let readings = self.readings()?;

        let total_records = readings.len();
        let unique_sources: HashSet<&str> =
            readings.iter().map(|r| r.source_id.as_str()).collect();
        let total_power_output: f64 = readings.iter().map(|r| r.power_output).sum();

        let mean = |values: Vec<f64>| -> Option<f64> {
            if values.is_empty() {
                None
            } else {
                Some(values.iter().sum::<f64>() / values.len() as f64)
            }
        };

        Ok(SummaryStats {
            total_records,
            unique_sources: unique_sources.len(),
            date_range_start: readings.iter().map(|r| r.timestamp).min(),
            date_range_end: readings.iter().map(|r| r.timestamp).max(),
            total_power_output,
            avg_power_output: if total_records == 0 {
                0.0
            } else {
                total_power_output / total_records as f64
            },
            avg_efficiency_factor: mean(
                readings.iter().filter_map(|r| r.efficiency_factor).collect(),
            ),
            avg_efficiency_ratio: mean(
                readings.iter().filter_map(|r| r.efficiency_ratio).collect(),
            ),
        })
    }

    /// The cleaned, transformed readings. Available once `transform()` ran.
    pub fn readings(&self) -> Result<&[Reading], PipelineError> {
        if !self.transformed {
            return Err(PipelineError::NoDataLoaded {
                expected: "transform",
            });
        }
        self.cleaned
            .as_deref()
            .ok_or(PipelineError::NoDataLoaded { expected: "clean" })
    }

    fn parse_error(&self, source: csv::Error) -> PipelineError {
        PipelineError::Parse {
            path: self.path.clone(),
            source,
        }
    }
}

/// The Sunday on or after the reading's date, matching a right-labeled
/// weekly resample.
pub fn week_ending_sunday(timestamp: NaiveDateTime) -> NaiveDate {
    let date = timestamp.date();
    let offset = (7 - date.weekday().num_days_from_sunday()) % 7;
    date + Duration::days(i64::from(offset))
}

fn parse_float(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse().ok()
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}
