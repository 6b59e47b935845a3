pub mod metrics_report;

pub use metrics_report::MetricsReportJob;
