pub mod error;
pub mod models;
pub mod processor;
pub mod report;

pub use error::PipelineError;
pub use models::{
    AggregateResult, CleanReport, LoadReport, Reading, SourceTotal, SummaryStats, TransformReport,
    WeeklyPoint,
};
pub use processor::DataProcessor;
pub use report::ReportGenerator;
