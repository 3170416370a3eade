use std::sync::LazyLock;
use std::time::Duration;

use prometheus::*;

static METRIC_SEARCH_COUNT: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "imcatalog_search_count",
        "count of search requests",
        &["kind", "status"]
    )
    .unwrap()
});

static METRIC_SEARCH_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "imcatalog_search_duration",
        "duration of the search request in seconds",
        &["kind"]
    )
    .unwrap()
});

static METRIC_INGESTED_RECORDS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "imcatalog_ingested_records",
        "count of catalog records by ingestion outcome",
        &["status"]
    )
    .unwrap()
});

static METRIC_BATCH_WRITES: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "imcatalog_batch_writes",
        "count of batch write calls to the vector store",
        &["status"]
    )
    .unwrap()
});

/// 记录一次检索的结果与耗时
pub fn observe_search<T, E>(kind: &str, result: &std::result::Result<T, E>, duration: Duration) {
    let status = if result.is_ok() { "ok" } else { "error" };
    METRIC_SEARCH_COUNT.with_label_values(&[kind, status]).inc();
    METRIC_SEARCH_DURATION
        .with_label_values(&[kind])
        .observe(duration.as_secs_f64());
}

/// 按结果增加导入记录计数
pub fn inc_ingested(status: &str, count: usize) {
    METRIC_INGESTED_RECORDS
        .with_label_values(&[status])
        .inc_by(count as u64);
}

pub fn inc_batch_write(status: &str) {
    METRIC_BATCH_WRITES.with_label_values(&[status]).inc();
}
