use crate::models::{AggregateResult, Reading, SourceTotal, WeeklyPoint};
use anyhow::Result;
use chrono::NaiveDate;
use log::debug;
use plotly::common::{Marker, Mode, Title};
use plotly::layout::{Axis, Layout};
use plotly::{Plot, Scatter};
use plotters::prelude::*;
use std::collections::HashMap;
use std::path::PathBuf;

/// Fixed palette for the top-5 trend series, indexed by rank.
const PALETTE: [RGBColor; 5] = [
    RGBColor(0x2e, 0x86, 0xab),
    RGBColor(0xa2, 0x3b, 0x72),
    RGBColor(0xf1, 0x8f, 0x01),
    RGBColor(0xc7, 0x3e, 0x1d),
    RGBColor(0x6a, 0x99, 0x4e),
];

const TREND_CHART_FILE: &str = "weekly_output_trend.png";
const DASHBOARD_FILE: &str = "efficiency_dashboard.html";

/// Generates visual reports for grid performance from processed data.
pub struct ReportGenerator<'a> {
    readings: &'a [Reading],
    weekly: &'a [WeeklyPoint],
    top_sources: &'a [SourceTotal],
    output_dir: PathBuf,
}

impl<'a> ReportGenerator<'a> {
    /// Creates the output directory if it does not exist yet.
    pub fn new(
        readings: &'a [Reading],
        aggregate: &'a AggregateResult,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self> {
        let output_dir = output_dir.into();
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            readings,
            weekly: &aggregate.weekly,
            top_sources: &aggregate.top_sources,
            output_dir,
        })
    }

    /// Static line chart of weekly power output for the top-5 sources.
    /// With no data the chart is rendered empty, without series.
    pub fn render_trend_chart(&self) -> Result<PathBuf> {
        let output_path = self.output_dir.join(TREND_CHART_FILE);

        let series: Vec<(&str, Vec<(NaiveDate, f64)>)> = self
            .top_sources
            .iter()
            .map(|source| {
                let points: Vec<(NaiveDate, f64)> = self
                    .weekly
                    .iter()
                    .filter(|w| w.source_id == source.source_id)
                    .map(|w| (w.week_ending, w.power_output))
                    .collect();
                (source.source_id.as_str(), points)
            })
            .collect();

        let all_points = series.iter().flat_map(|(_, pts)| pts.iter());
        let min_date = all_points.clone().map(|(d, _)| *d).min();
        let max_date = all_points.clone().map(|(d, _)| *d).max();
        let max_power = all_points
            .clone()
            .map(|(_, p)| *p)
            .fold(f64::NEG_INFINITY, f64::max);
        let min_power = all_points.map(|(_, p)| *p).fold(f64::INFINITY, f64::min);

        // Degenerate ranges still produce a valid, empty chart.
        let today = chrono::Utc::now().date_naive();
        let min_date = min_date.unwrap_or(today);
        let mut max_date = max_date.unwrap_or(today);
        if max_date <= min_date {
            max_date = min_date + chrono::Duration::days(7);
        }
        let y_low = min_power.min(0.0);
        let y_high = if max_power.is_finite() && max_power > 0.0 {
            max_power * 1.1
        } else {
            1.0
        };
        let y_low = if y_low.is_finite() { y_low } else { 0.0 };

        // Scoped so the backend's borrow of the path ends before we return it.
        {
            let root = BitMapBackend::new(&output_path, (1400, 700)).into_drawing_area();
            root.fill(&WHITE)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(
                    "Weekly Power Output Trends - Top 5 Renewable Sources",
                    ("sans-serif", 30).into_font(),
                )
                .margin(15)
                .x_label_area_size(50)
                .y_label_area_size(80)
                .build_cartesian_2d(min_date..max_date, y_low..y_high)?;

            chart
                .configure_mesh()
                .x_desc("Week")
                .y_desc("Total Power Output (kWh)")
                .draw()?;

            for (rank, (source_id, points)) in series.iter().enumerate() {
                let color = PALETTE[rank % PALETTE.len()];

                chart
                    .draw_series(LineSeries::new(
                        points.iter().copied(),
                        color.stroke_width(2),
                    ))?
                    .label(*source_id)
                    .legend(move |(x, y)| {
                        PathElement::new(vec![(x, y), (x + 10, y)], color.stroke_width(2))
                    });

                chart.draw_series(
                    points
                        .iter()
                        .map(|(date, power)| Circle::new((*date, *power), 4, color.filled())),
                )?;

                debug!("plotted {}: {} weeks", source_id, points.len());
            }

            if !series.is_empty() {
                chart
                    .configure_series_labels()
                    .background_style(&WHITE.mix(0.8))
                    .border_style(&BLACK)
                    .draw()?;
            }

            root.present()?;
        }

        Ok(output_path)
    }

    /// Interactive scatter of efficiency factor vs power output, one trace
    /// per source, written as a self-contained HTML page.
    pub fn render_scatter_dashboard(&self) -> Result<PathBuf> {
        let output_path = self.output_dir.join(DASHBOARD_FILE);

        // Group readings per source, keeping first-seen order.
        let mut order: Vec<&str> = Vec::new();
        let mut groups: HashMap<&str, Vec<&Reading>> = HashMap::new();
        for reading in self.readings {
            let entry = groups.entry(reading.source_id.as_str()).or_default();
            if entry.is_empty() {
                order.push(reading.source_id.as_str());
            }
            entry.push(reading);
        }

        let mut plot = Plot::new();

        for source_id in order {
            let rows = &groups[source_id];
            let mut xs = Vec::new();
            let mut ys = Vec::new();
            let mut hover = Vec::new();

            for reading in rows {
                // Rows without an efficiency factor have no x position.
                let Some(factor) = reading.efficiency_factor else {
                    continue;
                };
                xs.push(factor);
                ys.push(reading.power_output);
                let ratio = reading
                    .efficiency_ratio
                    .map(|r| format!("{r:.2}"))
                    .unwrap_or_else(|| "n/a".to_string());
                hover.push(format!(
                    "{}<br>Time: {}<br>Power: {:.2} kWh<br>Factor: {:.4}<br>Ratio: {}",
                    reading.source_id,
                    reading.timestamp.format("%Y-%m-%d %H:%M"),
                    reading.power_output,
                    factor,
                    ratio
                ));
            }

            let trace = Scatter::new(xs, ys)
                .name(source_id)
                .mode(Mode::Markers)
                .marker(Marker::new().size(6).opacity(0.7))
                .text_array(hover);
            plot.add_trace(trace);
        }

        plot.set_layout(
            Layout::new()
                .title(Title::new(
                    "Efficiency Factor vs Power Output - Interactive Dashboard",
                ))
                .x_axis(Axis::new().title(Title::new("Efficiency Factor")))
                .y_axis(Axis::new().title(Title::new("Power Output (kWh)"))),
        );

        std::fs::write(&output_path, plot.to_html())?;

        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processor::DataProcessor;
    use std::io::Write;
    use tempfile::TempDir;

    fn sample_processor(dir: &TempDir) -> DataProcessor {
        let csv = "Time,Source_ID,Power_Output,Efficiency_Factor\n\
                   2024-01-01 06:00:00,SOLAR_1,10.0,0.8\n\
                   2024-01-02 06:00:00,WIND_1,20.0,0.0\n\
                   2024-01-08 06:00:00,SOLAR_1,5.0,0.4\n";
        let path = dir.path().join("sensor_data.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(csv.as_bytes()).unwrap();

        let mut processor = DataProcessor::new(path);
        processor.load().unwrap();
        processor.clean().unwrap();
        processor.transform().unwrap();
        processor
    }

    #[test]
    fn dashboard_is_written_and_output_dir_created() {
        let dir = TempDir::new().unwrap();
        let processor = sample_processor(&dir);
        let aggregate = processor.aggregate().unwrap();

        let output_dir = dir.path().join("reports");
        assert!(!output_dir.exists());

        let generator =
            ReportGenerator::new(processor.readings().unwrap(), &aggregate, output_dir.clone())
                .unwrap();
        let path = generator.render_scatter_dashboard().unwrap();

        assert!(output_dir.is_dir());
        assert!(path.ends_with("efficiency_dashboard.html"));
        let html = std::fs::read_to_string(&path).unwrap();
        assert!(!html.is_empty());
        assert!(html.contains("SOLAR_1"));
        assert!(html.contains("WIND_1"));
    }

    #[test]
    fn trend_chart_is_written() {
        let dir = TempDir::new().unwrap();
        let processor = sample_processor(&dir);
        let aggregate = processor.aggregate().unwrap();

        let generator = ReportGenerator::new(
            processor.readings().unwrap(),
            &aggregate,
            dir.path().join("reports"),
        )
        .unwrap();
        let path = generator.render_trend_chart().unwrap();

        assert!(path.ends_with("weekly_output_trend.png"));
        assert!(path.is_file());
        assert!(std::fs::metadata(&path).unwrap().len() > 0);
    }

    #[test]
    fn trend_chart_handles_empty_aggregate() {
        let dir = TempDir::new().unwrap();
        let aggregate = AggregateResult {
            weekly: vec![],
            top_sources: vec![],
            week_count: 0,
            source_count: 0,
            total_output: 0.0,
        };
        let generator =
            ReportGenerator::new(&[], &aggregate, dir.path().join("reports")).unwrap();
        let path = generator.render_trend_chart().unwrap();
        assert!(path.is_file());
    }

    #[test]
    fn dashboard_handles_empty_aggregate() {
        let dir = TempDir::new().unwrap();
        let aggregate = AggregateResult {
            weekly: vec![],
            top_sources: vec![],
            week_count: 0,
            source_count: 0,
            total_output: 0.0,
        };
        let generator =
            ReportGenerator::new(&[], &aggregate, dir.path().join("reports")).unwrap();
        let path = generator.render_scatter_dashboard().unwrap();
        assert!(path.exists());
    }
}
