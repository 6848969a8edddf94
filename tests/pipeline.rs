use chrono::NaiveDate;
use grid_monitor::{DataProcessor, PipelineError, ReportGenerator};
use std::io::Write;
use tempfile::TempDir;

fn write_csv(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("sensor_data.csv");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

#[test]
fn two_rows_one_source_two_weeks() {
    // 2024-01-07 and 2024-01-14 are Sundays
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "Time,Source_ID,Power_Output,Efficiency_Factor\n\
         2024-01-02 12:00:00,HYDRO_1,42.0,0.7\n\
         2024-01-09 12:00:00,HYDRO_1,18.0,0.9\n",
    );

    let mut processor = DataProcessor::new(path);
    processor.load().unwrap();
    processor.clean().unwrap();
    processor.transform().unwrap();
    let aggregate = processor.aggregate().unwrap();

    assert_eq!(aggregate.weekly.len(), 2);
    assert_eq!(
        aggregate.weekly[0].week_ending,
        NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()
    );
    assert_eq!(aggregate.weekly[0].power_output, 42.0);
    assert_eq!(
        aggregate.weekly[1].week_ending,
        NaiveDate::from_ymd_opt(2024, 1, 14).unwrap()
    );
    assert_eq!(aggregate.weekly[1].power_output, 18.0);

    assert_eq!(aggregate.top_sources.len(), 1);
    assert_eq!(aggregate.top_sources[0].source_id, "HYDRO_1");
    assert_eq!(aggregate.top_sources[0].total_output, 60.0);
}

#[test]
fn full_pipeline_produces_reports_and_summary() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "Time,Source_ID,Power_Output,Efficiency_Factor\n\
         2024-02-01 00:00:00,SOLAR_A,100.0,0.8\n\
         2024-02-01 06:00:00,SOLAR_B,90.0,0.9\n\
         2024-02-02 00:00:00,WIND_A,80.0,0.0\n\
         bad-timestamp,SOLAR_A,10.0,0.5\n\
         2024-02-09 00:00:00,SOLAR_A,,0.5\n\
         2024-02-09 06:00:00,SOLAR_B,25.0,0.5\n",
    );

    let mut processor = DataProcessor::new(path);
    let load = processor.load().unwrap();
    assert_eq!(load.record_count, 6);

    let clean = processor.clean().unwrap();
    assert_eq!(clean.retained_count, 4);
    assert_eq!(clean.removed_count, 2);

    let transform = processor.transform().unwrap();
    // WIND_A divides by zero
    assert_eq!(transform.non_finite_replaced, 1);
    assert_eq!(transform.valid_ratios, 3);

    let aggregate = processor.aggregate().unwrap();
    assert_eq!(aggregate.source_count, 3);
    // weekly totals cover every cleaned reading exactly once
    assert_eq!(aggregate.total_output, 100.0 + 90.0 + 80.0 + 25.0);

    let stats = processor.summary().unwrap();
    assert_eq!(stats.total_records, 4);
    assert_eq!(stats.unique_sources, 3);
    assert_eq!(
        stats.date_range_start.unwrap().date(),
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    );
    assert_eq!(
        stats.date_range_end.unwrap().date(),
        NaiveDate::from_ymd_opt(2024, 2, 9).unwrap()
    );

    let output_dir = dir.path().join("reports");
    let generator =
        ReportGenerator::new(processor.readings().unwrap(), &aggregate, output_dir.clone())
            .unwrap();
    let dashboard = generator.render_scatter_dashboard().unwrap();

    assert!(output_dir.is_dir());
    assert!(dashboard.exists());
    let html = std::fs::read_to_string(dashboard).unwrap();
    assert!(html.contains("SOLAR_A"));
}

#[test]
fn schema_mismatch_surfaces_before_rows() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(&dir, "Time,Source_ID\n2024-01-01,S1\n");

    let mut processor = DataProcessor::new(path);
    match processor.load() {
        Err(PipelineError::SchemaMismatch(missing)) => {
            assert_eq!(
                missing,
                vec!["Power_Output".to_string(), "Efficiency_Factor".to_string()]
            );
        }
        other => panic!("expected SchemaMismatch, got {other:?}"),
    }
}

#[test]
fn malformed_csv_is_a_parse_error() {
    let dir = TempDir::new().unwrap();
    let path = write_csv(
        &dir,
        "Time,Source_ID,Power_Output,Efficiency_Factor\n\
         2024-01-01 00:00:00,S1,1.0,0.5,extra,fields,here\n",
    );

    let mut processor = DataProcessor::new(path);
    assert!(matches!(
        processor.load(),
        Err(PipelineError::Parse { .. })
    ));
}
