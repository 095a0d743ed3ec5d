//! Runs in its own test binary so the global logger sees only this test.

use chrono::NaiveDate;
use log::{Level, LevelFilter, Log, Metadata, Record};
use parish_records::aggregation::summary::SummaryReport;
use parish_records::config::PipelineConfig;
use parish_records::core::record::{Disbursement, DisbursementSet, RawAmount};
use std::sync::atomic::{AtomicUsize, Ordering};

struct WarningCounter {
    skipped: AtomicUsize,
}

impl Log for WarningCounter {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if record.level() == Level::Warn && record.args().to_string().starts_with("Skipping record") {
            self.skipped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn flush(&self) {}
}

static COUNTER: WarningCounter = WarningCounter {
    skipped: AtomicUsize::new(0),
};

#[test]
fn summary_report_warns_once_per_rejected_record() {
    log::set_logger(&COUNTER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let date = NaiveDate::from_ymd_opt(1760, 3, 25).unwrap();
    let set: DisbursementSet = vec![
        Disbursement::new("St Mary", date, "Funeral", "Poor", RawAmount::new(0, 5, 0)),
        Disbursement::new("St Mary", date, "Perambulation", "Custom", RawAmount::new(0, -1, 0)),
    ]
    .into_iter()
    .collect();

    let report = SummaryReport::build(&set, &PipelineConfig::default()).unwrap();

    assert_eq!(report.rejected, vec![1]);
    assert_eq!(COUNTER.skipped.load(Ordering::SeqCst), 1);
}
