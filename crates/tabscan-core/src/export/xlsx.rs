//! Confidence-colored XLSX grid export.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{
    Color, DocProperties, ExcelDateTime, Format, FormatPattern, Workbook, XlsxError,
};
use tracing::info;

use crate::error::ExportError;
use crate::layout::{ConfidenceThresholds, Tier};
use crate::models::table::{Cell, Table};

use super::write_atomically;

/// Writes a [`Table`] as a single-sheet workbook.
///
/// Table row `r` becomes sheet row `r`, cell `c` of that row becomes sheet
/// column `c`. Trailing cells of short rows stay empty with no fill. Each
/// column is as wide as its longest text plus a fixed padding.
#[derive(Debug, Clone)]
pub struct GridExporter {
    thresholds: ConfidenceThresholds,
    column_padding: usize,
}

impl GridExporter {
    /// Create an exporter with the default padding of two characters.
    pub fn new(thresholds: ConfidenceThresholds) -> Self {
        Self {
            thresholds,
            column_padding: 2,
        }
    }

    /// Set the characters added to each column's longest text.
    pub fn with_column_padding(mut self, padding: usize) -> Self {
        self.column_padding = padding;
        self
    }

    /// Column widths in character units.
    pub fn column_widths(&self, table: &Table) -> Vec<usize> {
        (0..table.column_count())
            .map(|col| {
                let longest = table.column(col).map(measured_width).max().unwrap_or(0);
                longest + self.column_padding
            })
            .collect()
    }

    /// Serialize the workbook into memory.
    ///
    /// The document creation date is fixed so identical tables produce
    /// identical bytes.
    pub fn to_buffer(&self, table: &Table) -> Result<Vec<u8>, XlsxError> {
        let mut workbook = Workbook::new();
        let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
        workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

        let high = tier_format(Tier::High);
        let medium = tier_format(Tier::Medium);
        let low = tier_format(Tier::Low);

        let worksheet = workbook.add_worksheet();

        for (row_idx, row) in table.rows().iter().enumerate() {
            let row_num = u32::try_from(row_idx).map_err(|_| XlsxError::RowColumnLimitError)?;
            for (col_idx, cell) in row.iter().enumerate() {
                let col_num =
                    u16::try_from(col_idx).map_err(|_| XlsxError::RowColumnLimitError)?;
                let format = match self.thresholds.classify(cell.confidence) {
                    Tier::High => &high,
                    Tier::Medium => &medium,
                    Tier::Low => &low,
                };
                worksheet.write_string_with_format(row_num, col_num, &cell.text, format)?;
            }
        }

        for (col_idx, width) in self.column_widths(table).into_iter().enumerate() {
            let col_num = u16::try_from(col_idx).map_err(|_| XlsxError::RowColumnLimitError)?;
            worksheet.set_column_width(col_num, width as f64)?;
        }

        workbook.save_to_buffer()
    }

    /// Write the workbook to `path`, returning the path on success.
    ///
    /// On failure nothing is left at `path`.
    pub fn export(&self, table: &Table, path: &Path) -> Result<PathBuf, ExportError> {
        let bytes = self.to_buffer(table).map_err(|source| ExportError::Workbook {
            path: path.to_path_buf(),
            source,
        })?;
        write_atomically(path, &bytes)?;

        info!(
            "Workbook with {} rows x {} columns saved at: {}",
            table.row_count(),
            table.column_count(),
            path.display()
        );

        Ok(path.to_path_buf())
    }
}

fn tier_format(tier: Tier) -> Format {
    Format::new()
        .set_pattern(FormatPattern::Solid)
        .set_background_color(Color::RGB(tier.fill_rgb()))
}

/// Rendered width of a text in characters.
pub fn text_width(text: &str) -> usize {
    text.chars().count()
}

/// Width of a grid position; blank trailing positions measure zero.
fn measured_width(cell: Option<&Cell>) -> usize {
    cell.map(|c| text_width(&c.text)).unwrap_or(0)
}
