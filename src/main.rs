use anyhow::Result;
use clap::Parser;
use grid_monitor::{DataProcessor, ReportGenerator};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "grid-monitor")]
#[command(about = "Renewable grid performance monitor: process sensor data and generate reports")]
struct Args {
    /// Input CSV of sensor readings
    #[arg(default_value = "sensor_data.csv")]
    input: PathBuf,

    /// Directory for generated reports
    #[arg(long, default_value = "reports")]
    output_dir: PathBuf,
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    if let Err(e) = run(&args) {
        println!("\nERROR: {e:#}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    println!("🌱 Renewable Grid Performance Monitor");
    println!("Target file: {}", args.input.display());
    println!("{}", "=".repeat(60));

    let mut processor = DataProcessor::new(&args.input);

    println!("\nSTEP 1: Reading data from file");
    let load = processor.load()?;
    println!("  Loaded {} records", load.record_count);
    println!("  Columns: {}", load.columns.join(", "));
    println!("  Unique sources: {}", load.unique_sources);

    println!("\nSTEP 2: Cleaning data");
    let clean = processor.clean()?;
    println!("  Original records: {}", clean.original_count);
    println!(
        "  Records removed: {} ({} invalid timestamps, {} missing power)",
        clean.removed_count, clean.invalid_timestamps, clean.missing_power
    );
    println!(
        "  Records retained: {} ({:.1}%)",
        clean.retained_count,
        clean.retention_rate()
    );

    println!("\nSTEP 3: Transforming data");
    let transform = processor.transform()?;
    if transform.non_finite_replaced > 0 {
        println!(
            "  Warning: {} non-finite ratio values replaced",
            transform.non_finite_replaced
        );
    }
    println!("  Valid efficiency ratios: {}", transform.valid_ratios);
    if let (Some(min), Some(max), Some(mean)) = (
        transform.min_ratio,
        transform.max_ratio,
        transform.mean_ratio,
    ) {
        println!("  Ratio min: {min:.2}  max: {max:.2}  mean: {mean:.2}");
    }

    println!("\nSTEP 4: Aggregating to weekly data");
    let aggregate = processor.aggregate()?;
    println!("  Total weeks: {}", aggregate.week_count);
    println!("  Sources tracked: {}", aggregate.source_count);
    println!("  Total power output: {:.2} kWh", aggregate.total_output);
    println!("\n  Top {} producing sources:", aggregate.top_sources.len());
    for (rank, source) in aggregate.top_sources.iter().enumerate() {
        println!(
            "    {}. {}: {:.2} kWh",
            rank + 1,
            source.source_id,
            source.total_output
        );
    }

    info!("data processing completed, generating reports");

    println!("\nSTEP 5: Creating weekly trend chart");
    let generator =
        ReportGenerator::new(processor.readings()?, &aggregate, &args.output_dir)?;
    let trend_path = generator.render_trend_chart()?;
    println!("  Static report saved to: {}", trend_path.display());

    println!("\nSTEP 6: Creating interactive dashboard");
    let dashboard_path = generator.render_scatter_dashboard()?;
    println!("  Interactive dashboard saved to: {}", dashboard_path.display());

    let stats = processor.summary()?;
    println!("\n{}", "=".repeat(60));
    println!("SUMMARY");
    println!("{}", "=".repeat(60));
    println!("Total records processed: {}", stats.total_records);
    println!("Unique sources: {}", stats.unique_sources);
    if let (Some(start), Some(end)) = (stats.date_range_start, stats.date_range_end) {
        println!(
            "Period: {} to {}",
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        );
    }
    println!("Total power output: {:.2} kWh", stats.total_power_output);
    println!("Average power: {:.2} kWh", stats.avg_power_output);
    if let Some(factor) = stats.avg_efficiency_factor {
        println!("Average efficiency factor: {factor:.4}");
    }
    if let Some(ratio) = stats.avg_efficiency_ratio {
        println!("Average efficiency ratio: {ratio:.2}");
    }
    println!("\nOutput files:");
    println!("  1. {}", trend_path.display());
    println!("  2. {}", dashboard_path.display());
    println!("{}", "=".repeat(60));
    println!("\n✅ Grid monitor completed successfully");

    Ok(())
}
