//! Output boundary: Arrow RecordBatch conversion and a Hive-partitioned
//! Parquet writer.
//!
//! Generation itself is single-threaded; only the per-partition Parquet
//! writes fan out, over a table that is already final.

use crate::table::{EventRecord, EventTable};
use anyhow::{Context, Result};
use arrow::array::{
    ArrayRef, Date32Array, Float64Array, Int32Array, Int64Array, StringArray,
    TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::NaiveDate;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::Path;
use std::sync::Arc;

/// The fixed 38-column schema. Identical for every scenario and for an
/// empty table; column order matches [`EventTable::COLUMNS`].
pub fn events_schema() -> Schema {
    Schema::new(vec![
        Field::new("event_date", DataType::Date32, false),
        Field::new(
            "event_timestamp",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
        Field::new("event_name", DataType::Utf8, false),
        Field::new("user_pseudo_id", DataType::Utf8, false),
        Field::new("ga_session_id", DataType::Int64, false),
        Field::new("ga_session_number", DataType::Int32, false),
        Field::new("session_id", DataType::Utf8, false),
        Field::new("page_location", DataType::Utf8, false),
        Field::new("page_referrer", DataType::Utf8, true),
        Field::new("page_path", DataType::Utf8, false),
        Field::new("page_num_dom", DataType::Int32, false),
        Field::new("stay_ms", DataType::Int64, false),
        Field::new("load_time_ms", DataType::Int64, false),
        Field::new("total_duration_ms", DataType::Int64, false),
        Field::new("max_page_reached", DataType::Int32, false),
        Field::new("total_pages", DataType::Int32, false),
        Field::new("scroll_pct", DataType::Float64, false),
        Field::new("utm_source", DataType::Utf8, false),
        Field::new("utm_medium", DataType::Utf8, false),
        Field::new("utm_campaign", DataType::Utf8, true),
        Field::new("utm_content", DataType::Utf8, true),
        Field::new("device_type", DataType::Utf8, false),
        Field::new("direction", DataType::Utf8, false),
        Field::new("ab_variant", DataType::Utf8, false),
        Field::new("ab_test_target", DataType::Utf8, true),
        Field::new("cv_type", DataType::Utf8, true),
        Field::new("cv_value", DataType::Int64, true),
        Field::new("value", DataType::Int64, true),
        Field::new("form_page_number", DataType::Int32, true),
        Field::new("form_duration_ms", DataType::Int64, true),
        Field::new("form_direction", DataType::Utf8, true),
        Field::new("click_x_rel", DataType::Float64, true),
        Field::new("click_y_rel", DataType::Float64, true),
        Field::new("elem_tag", DataType::Utf8, true),
        Field::new("elem_id", DataType::Utf8, true),
        Field::new("elem_classes", DataType::Utf8, true),
        Field::new("link_url", DataType::Utf8, true),
        Field::new("video_src", DataType::Utf8, true),
    ])
}

fn days_since_epoch(date: NaiveDate) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).expect("valid date");
    date.signed_duration_since(epoch).num_days() as i32
}

fn records_to_batch(events: &[&EventRecord]) -> RecordBatch {
    let schema = Arc::new(events_schema());

    let event_dates: Date32Array = events
        .iter()
        .map(|e| Some(days_since_epoch(e.event_date)))
        .collect();
    let timestamps: TimestampMillisecondArray = events
        .iter()
        .map(|e| Some(e.event_timestamp.timestamp_millis()))
        .collect();
    let event_names: StringArray =
        events.iter().map(|e| Some(e.event_name.as_str())).collect();
    let user_ids: StringArray = events
        .iter()
        .map(|e| Some(e.user_pseudo_id.as_str()))
        .collect();
    let ga_session_ids: Int64Array =
        events.iter().map(|e| Some(e.ga_session_id)).collect();
    let ga_session_numbers: Int32Array =
        events.iter().map(|e| Some(e.ga_session_number)).collect();
    let session_ids: StringArray =
        events.iter().map(|e| Some(e.session_id.as_str())).collect();
    let page_locations: StringArray = events
        .iter()
        .map(|e| Some(e.page_location.as_str()))
        .collect();
    let page_referrers: StringArray = events.iter().map(|e| e.page_referrer).collect();
    let page_paths: StringArray =
        events.iter().map(|e| Some(e.page_path.as_str())).collect();
    let page_nums: Int32Array = events.iter().map(|e| Some(e.page_num_dom)).collect();
    let stay_ms: Int64Array = events.iter().map(|e| Some(e.stay_ms)).collect();
    let load_time_ms: Int64Array =
        events.iter().map(|e| Some(e.load_time_ms)).collect();
    let total_duration_ms: Int64Array =
        events.iter().map(|e| Some(e.total_duration_ms)).collect();
    let max_pages: Int32Array =
        events.iter().map(|e| Some(e.max_page_reached)).collect();
    let total_pages: Int32Array = events.iter().map(|e| Some(e.total_pages)).collect();
    let scroll_pcts: Float64Array = events.iter().map(|e| Some(e.scroll_pct)).collect();
    let utm_sources: StringArray =
        events.iter().map(|e| Some(e.utm_source)).collect();
    let utm_mediums: StringArray =
        events.iter().map(|e| Some(e.utm_medium)).collect();
    let utm_campaigns: StringArray = events.iter().map(|e| e.utm_campaign).collect();
    let utm_contents: StringArray =
        events.iter().map(|e| e.utm_content.as_deref()).collect();
    let device_types: StringArray = events
        .iter()
        .map(|e| Some(e.device_type.as_str()))
        .collect();
    let directions: StringArray =
        events.iter().map(|e| Some(e.direction.as_str())).collect();
    let ab_variants: StringArray =
        events.iter().map(|e| Some(e.ab_variant.as_str())).collect();
    let ab_targets: StringArray = events
        .iter()
        .map(|e| e.ab_test_target.map(|t| t.as_str()))
        .collect();
    let cv_types: StringArray = events
        .iter()
        .map(|e| e.cv_type.map(|t| t.as_str()))
        .collect();
    let cv_values: Int64Array = events.iter().map(|e| e.cv_value).collect();
    let values: Int64Array = events.iter().map(|e| e.value).collect();
    let form_pages: Int32Array =
        events.iter().map(|e| e.form_page_number).collect();
    let form_durations: Int64Array =
        events.iter().map(|e| e.form_duration_ms).collect();
    let form_directions: StringArray = events
        .iter()
        .map(|e| e.form_direction.map(|d| d.as_str()))
        .collect();
    let click_xs: Float64Array = events.iter().map(|e| e.click_x_rel).collect();
    let click_ys: Float64Array = events.iter().map(|e| e.click_y_rel).collect();
    let elem_tags: StringArray = events.iter().map(|e| e.elem_tag).collect();
    let elem_ids: StringArray = events.iter().map(|e| e.elem_id).collect();
    let elem_classes: StringArray = events.iter().map(|e| e.elem_classes).collect();
    let link_urls: StringArray =
        events.iter().map(|e| e.link_url.as_deref()).collect();
    let video_srcs: StringArray =
        events.iter().map(|e| e.video_src.as_deref()).collect();

    let columns: Vec<ArrayRef> = vec![
        Arc::new(event_dates),
        Arc::new(timestamps),
        Arc::new(event_names),
        Arc::new(user_ids),
        Arc::new(ga_session_ids),
        Arc::new(ga_session_numbers),
        Arc::new(session_ids),
        Arc::new(page_locations),
        Arc::new(page_referrers),
        Arc::new(page_paths),
        Arc::new(page_nums),
        Arc::new(stay_ms),
        Arc::new(load_time_ms),
        Arc::new(total_duration_ms),
        Arc::new(max_pages),
        Arc::new(total_pages),
        Arc::new(scroll_pcts),
        Arc::new(utm_sources),
        Arc::new(utm_mediums),
        Arc::new(utm_campaigns),
        Arc::new(utm_contents),
        Arc::new(device_types),
        Arc::new(directions),
        Arc::new(ab_variants),
        Arc::new(ab_targets),
        Arc::new(cv_types),
        Arc::new(cv_values),
        Arc::new(values),
        Arc::new(form_pages),
        Arc::new(form_durations),
        Arc::new(form_directions),
        Arc::new(click_xs),
        Arc::new(click_ys),
        Arc::new(elem_tags),
        Arc::new(elem_ids),
        Arc::new(elem_classes),
        Arc::new(link_urls),
        Arc::new(video_srcs),
    ];

    RecordBatch::try_new(schema, columns).expect("schema matches assembled columns")
}

/// Convert the whole table to one Arrow RecordBatch.
pub fn events_to_batch(table: &EventTable) -> RecordBatch {
    let refs: Vec<&EventRecord> = table.events.iter().collect();
    records_to_batch(&refs)
}

/// Write one day's rows to `<dir>/event_date=YYYY-MM-DD/data.parquet`.
pub fn write_day_to_parquet(
    output_dir: &Path,
    date: NaiveDate,
    events: &[&EventRecord],
) -> Result<usize> {
    if events.is_empty() {
        return Ok(0);
    }

    let partition_dir = output_dir.join(format!("event_date={}", date));
    fs::create_dir_all(&partition_dir)
        .with_context(|| format!("Failed to create partition directory: {:?}", partition_dir))?;

    let file_path = partition_dir.join("data.parquet");
    let file = File::create(&file_path)
        .with_context(|| format!("Failed to create parquet file: {:?}", file_path))?;

    let batch = records_to_batch(events);
    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, batch.schema(), Some(props))
        .context("Failed to create Parquet writer")?;
    writer.write(&batch).context("Failed to write record batch")?;
    writer.close().context("Failed to close Parquet writer")?;

    Ok(events.len())
}

/// Write the table as Hive-partitioned Parquet, one partition per
/// `event_date`, partitions written in parallel. Returns the row count.
pub fn write_events_to_parquet(output_dir: &Path, table: &EventTable) -> Result<usize> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {:?}", output_dir))?;

    let mut days: BTreeMap<NaiveDate, Vec<&EventRecord>> = BTreeMap::new();
    for event in &table.events {
        days.entry(event.event_date).or_default().push(event);
    }
    let days: Vec<(NaiveDate, Vec<&EventRecord>)> = days.into_iter().collect();

    let written: usize = days
        .par_iter()
        .map(|(date, events)| write_day_to_parquet(output_dir, *date, events))
        .collect::<Result<Vec<usize>>>()?
        .into_iter()
        .sum();

    Ok(written)
}
