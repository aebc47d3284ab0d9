//! Hive-style partition splitting

use crate::error::{Error, Result};
use arrow::array::{Array, UInt32Array};
use arrow::compute::take_record_batch;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use std::collections::BTreeMap;

/// Directory name used for a null partition value
pub const NULL_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// Rows of one partition, with the partition columns removed
#[derive(Debug, Clone)]
pub struct PartitionSlice {
    /// `column=value` directory names, outermost first
    pub segments: Vec<String>,
    /// Remaining columns of the rows in this partition
    pub batch: RecordBatch,
}

/// Split a batch by the values of `columns`.
///
/// Slices come back sorted by their partition values (as rendered in the
/// directory names); rows keep their relative order within a slice. An
/// empty batch yields no slices.
pub fn split_partitions(batch: &RecordBatch, columns: &[&str]) -> Result<Vec<PartitionSlice>> {
    let schema = batch.schema();
    let key_indices = columns
        .iter()
        .map(|name| {
            schema
                .index_of(name)
                .map_err(|_| Error::column_not_found(*name))
        })
        .collect::<Result<Vec<usize>>>()?;

    let mut groups: BTreeMap<Vec<String>, Vec<u32>> = BTreeMap::new();
    for row in 0..batch.num_rows() {
        let mut key = Vec::with_capacity(key_indices.len());
        for &idx in &key_indices {
            let array = batch.column(idx);
            if array.is_null(row) {
                key.push(NULL_PARTITION.to_string());
            } else {
                key.push(array_value_to_string(array, row)?);
            }
        }
        let row = u32::try_from(row)
            .map_err(|_| Error::output(format!("row {row} exceeds partition index range")))?;
        groups.entry(key).or_default().push(row);
    }

    let keep: Vec<usize> = (0..batch.num_columns())
        .filter(|idx| !key_indices.contains(idx))
        .collect();
    let data = batch.project(&keep)?;

    groups
        .into_iter()
        .map(|(values, rows)| {
            let segments = columns
                .iter()
                .zip(values)
                .map(|(name, value)| format!("{name}={value}"))
                .collect();
            let batch = take_record_batch(&data, &UInt32Array::from(rows))?;
            Ok(PartitionSlice { segments, batch })
        })
        .collect()
}
