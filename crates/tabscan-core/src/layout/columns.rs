//! Left-to-right ordering of row members into cells.

use std::cmp::Ordering;

use crate::models::table::{Cell, Table};

use super::rows::Row;

/// Sort each row by `x` and strip geometry, producing the table.
///
/// The sort is stable, so detections sharing an `x` keep the order in which
/// they joined the row.
pub fn order_columns(rows: &[Row<'_>]) -> Table {
    let rows = rows
        .iter()
        .map(|row| {
            let mut members = row.members().to_vec();
            members.sort_by(|a, b| {
                a.position
                    .x
                    .partial_cmp(&b.position.x)
                    .unwrap_or(Ordering::Equal)
            });
            members
                .into_iter()
                .map(|d| Cell::new(d.text.clone(), d.confidence))
                .collect()
        })
        .collect();

    Table::new(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::rows::group_into_rows;
    use crate::models::detection::{box_corners, Detection, Point};

    fn det(x: f32, y: f32, text: &str) -> Detection {
        Detection {
            position: Point::new(x, y),
            text: text.to_string(),
            confidence: 0.5,
            region: box_corners(x, y, 1.0, 1.0),
        }
    }

    fn texts(table: &Table) -> Vec<Vec<&str>> {
        table
            .rows()
            .iter()
            .map(|r| r.iter().map(|c| c.text.as_str()).collect())
            .collect()
    }

    #[test]
    fn test_rows_sorted_by_x() {
        let detections = vec![
            det(300.0, 10.0, "c"),
            det(100.0, 12.0, "a"),
            det(200.0, 8.0, "b"),
        ];
        let rows = group_into_rows(&detections, 10.0);
        let table = order_columns(&rows);

        assert_eq!(texts(&table), vec![vec!["a", "b", "c"]]);
    }

    #[test]
    fn test_equal_x_keeps_row_insertion_order() {
        // Insertion order inside the row follows the y sort: "upper" first.
        let detections = vec![det(50.0, 14.0, "lower"), det(50.0, 10.0, "upper")];
        let rows = group_into_rows(&detections, 10.0);
        let table = order_columns(&rows);

        assert_eq!(texts(&table), vec![vec!["upper", "lower"]]);
    }

    #[test]
    fn test_row_order_is_preserved() {
        let detections = vec![det(0.0, 90.0, "z"), det(0.0, 10.0, "x"), det(0.0, 50.0, "y")];
        let rows = group_into_rows(&detections, 10.0);
        let table = order_columns(&rows);

        assert_eq!(texts(&table), vec![vec!["x"], vec!["y"], vec!["z"]]);
    }
}
