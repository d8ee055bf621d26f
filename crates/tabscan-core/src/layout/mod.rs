//! Table reconstruction: rows, columns and confidence tiers.

mod columns;
mod confidence;
mod rows;

pub use columns::order_columns;
pub use confidence::{ConfidenceThresholds, Tier, DEFAULT_GREEN_THRESHOLD, DEFAULT_YELLOW_THRESHOLD};
pub use rows::{group_into_rows, Row, DEFAULT_Y_THRESHOLD};

use crate::error::EmptyResult;
use crate::models::detection::Detection;
use crate::models::table::Table;

/// Cluster detections into rows and order each row left to right.
pub fn build_table(detections: &[Detection], y_threshold: f32) -> Result<Table, EmptyResult> {
    if detections.is_empty() {
        return Err(EmptyResult::NoDetections);
    }

    let rows = group_into_rows(detections, y_threshold);
    if rows.is_empty() {
        return Err(EmptyResult::NoRows);
    }

    Ok(order_columns(&rows))
}
