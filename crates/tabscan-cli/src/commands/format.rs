//! Stdout renderings of a reconstructed table.

use console::style;

use tabscan_core::export::text_width;
use tabscan_core::pipeline::PipelineReport;
use tabscan_core::{ConfidenceThresholds, Table, Tier};

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned grid colored by confidence tier
    Text,
    /// Full report as JSON
    Json,
    /// Cell texts as CSV
    Csv,
}

pub fn format_report(
    report: &PipelineReport,
    thresholds: &ConfidenceThresholds,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Text => Ok(format_text(&report.table, thresholds)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => format_csv(&report.table),
    }
}

/// One record per table row, short rows padded with empty fields.
pub fn format_csv(table: &Table) -> anyhow::Result<String> {
    let columns = table.column_count();
    let mut wtr = csv::Writer::from_writer(vec![]);

    for row in table.rows() {
        let mut record: Vec<&str> = row.iter().map(|c| c.text.as_str()).collect();
        record.resize(columns, "");
        wtr.write_record(&record)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

pub fn format_text(table: &Table, thresholds: &ConfidenceThresholds) -> String {
    let widths: Vec<usize> = (0..table.column_count())
        .map(|col| {
            table
                .column(col)
                .map(|cell| cell.map(|c| text_width(&c.text)).unwrap_or(0))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut output = String::new();
    for row in table.rows() {
        let mut line = Vec::with_capacity(row.len());
        for (col, cell) in row.iter().enumerate() {
            let padding = widths[col].saturating_sub(text_width(&cell.text));
            let text = format!("{}{}", cell.text, " ".repeat(padding));
            let styled = match thresholds.classify(cell.confidence) {
                Tier::High => style(text).green(),
                Tier::Medium => style(text).yellow(),
                Tier::Low => style(text).red(),
            };
            line.push(styled.to_string());
        }
        output.push_str(line.join(" | ").trim_end());
        output.push('\n');
    }

    output
}

/// One-line explanation of the tier colors.
pub fn legend(thresholds: &ConfidenceThresholds) -> String {
    format!(
        "{} >= {:.2}, {} >= {:.2}, {} below",
        Tier::High.color_name(),
        thresholds.green(),
        Tier::Medium.color_name(),
        thresholds.yellow(),
        Tier::Low.color_name()
    )
}
