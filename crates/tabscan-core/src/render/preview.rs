//! PNG snapshot of the exported grid.

use ab_glyph::FontVec;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

use crate::layout::ConfidenceThresholds;
use crate::models::table::Table;

pub const PREVIEW_CELL_WIDTH: u32 = 100;
pub const PREVIEW_CELL_HEIGHT: u32 = 30;

const BLANK_COLOR: Rgb<u8> = Rgb([255, 255, 255]);
const GRID_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const TEXT_COLOR: Rgb<u8> = Rgb([0, 0, 0]);

/// Draw the table as fixed-size cells filled with their tier color.
///
/// Blank positions of short rows are white. Text is centered in its cell and
/// only drawn when a font is available.
pub fn draw_table_preview(
    table: &Table,
    thresholds: &ConfidenceThresholds,
    font: Option<&FontVec>,
    font_scale: f32,
) -> RgbImage {
    let cols = table.column_count().max(1) as u32;
    let rows = table.row_count().max(1) as u32;
    let mut canvas = RgbImage::from_pixel(
        cols * PREVIEW_CELL_WIDTH,
        rows * PREVIEW_CELL_HEIGHT,
        BLANK_COLOR,
    );

    for row in 0..rows {
        for col in 0..cols {
            let x = (col * PREVIEW_CELL_WIDTH) as i32;
            let y = (row * PREVIEW_CELL_HEIGHT) as i32;
            let rect = Rect::at(x, y).of_size(PREVIEW_CELL_WIDTH, PREVIEW_CELL_HEIGHT);
            let cell = table.cell(row as usize, col as usize);

            let fill = cell
                .map(|c| Rgb(thresholds.classify(c.confidence).fill_bytes()))
                .unwrap_or(BLANK_COLOR);
            draw_filled_rect_mut(&mut canvas, rect, fill);
            draw_hollow_rect_mut(&mut canvas, rect, GRID_COLOR);

            if let (Some(cell), Some(font)) = (cell, font) {
                let (w, h) = text_size(font_scale, font, &cell.text);
                let tx = x + (PREVIEW_CELL_WIDTH as i32 - w as i32) / 2;
                let ty = y + (PREVIEW_CELL_HEIGHT as i32 - h as i32) / 2;
                draw_text_mut(&mut canvas, TEXT_COLOR, tx, ty, font_scale, font, &cell.text);
            }
        }
    }

    canvas
}
