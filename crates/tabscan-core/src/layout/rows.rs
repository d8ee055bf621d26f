//! Row clustering by vertical proximity.

use std::cmp::Ordering;

use tracing::debug;

use crate::models::detection::Detection;

/// Default vertical tolerance in pixels.
pub const DEFAULT_Y_THRESHOLD: f32 = 10.0;

/// Detections judged to lie on one text line, in discovery order.
#[derive(Debug, Clone)]
pub struct Row<'a> {
    anchor_y: f32,
    members: Vec<&'a Detection>,
}

impl<'a> Row<'a> {
    fn start(first: &'a Detection) -> Self {
        Self {
            anchor_y: first.position.y,
            members: vec![first],
        }
    }

    /// `y` of the detection that opened the row.
    pub fn anchor_y(&self) -> f32 {
        self.anchor_y
    }

    /// Members in the order they joined the row.
    pub fn members(&self) -> &[&'a Detection] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Group detections into rows.
///
/// Detections are stably sorted by `y`. A detection joins the open row when
/// its `y` is within `y_threshold` of the row's first member; otherwise it
/// opens a new row. The anchor never moves, so slowly drifting lines split
/// rather than chain together.
pub fn group_into_rows(detections: &[Detection], y_threshold: f32) -> Vec<Row<'_>> {
    let mut sorted: Vec<&Detection> = detections.iter().collect();
    sorted.sort_by(|a, b| {
        a.position
            .y
            .partial_cmp(&b.position.y)
            .unwrap_or(Ordering::Equal)
    });

    let mut rows = Vec::new();
    let mut current: Option<Row<'_>> = None;

    for detection in sorted {
        match current.as_mut() {
            Some(row) if (detection.position.y - row.anchor_y).abs() <= y_threshold => {
                row.members.push(detection);
            }
            _ => {
                if let Some(row) = current.replace(Row::start(detection)) {
                    rows.push(row);
                }
            }
        }
    }

    if let Some(row) = current {
        rows.push(row);
    }

    debug!(
        "Clustered {} detections into {} rows (y_threshold={})",
        detections.len(),
        rows.len(),
        y_threshold
    );

    rows
}
