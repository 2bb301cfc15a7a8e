/// Side-by-side preview sheets written as image files.
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Layout of a preview sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    /// Space between cells and around the border, in pixels.
    pub gap: u32,
    /// Cells larger than this (on either side) are scaled down to fit.
    pub max_cell: Option<u32>,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            gap: 8,
            max_cell: Some(512),
        }
    }
}

fn fit_cell(img: &DynamicImage, max_cell: Option<u32>) -> RgbaImage {
    match max_cell {
        Some(max) if img.width() > max || img.height() > max => {
            img.resize(max, max, FilterType::Triangle).to_rgba8()
        }
        _ => img.to_rgba8(),
    }
}

/// Arrange rows of images into one sheet. Rows may differ in length; each
/// column is as wide as its widest cell.
pub fn contact_sheet(rows: &[Vec<DynamicImage>], layout: SheetLayout) -> RgbaImage {
    let cells: Vec<Vec<RgbaImage>> = rows
        .iter()
        .map(|row| row.iter().map(|img| fit_cell(img, layout.max_cell)).collect())
        .collect();

    let columns = cells.iter().map(Vec::len).max().unwrap_or(0);
    let mut col_widths = vec![0u32; columns];
    for row in &cells {
        for (c, cell) in row.iter().enumerate() {
            col_widths[c] = col_widths[c].max(cell.width());
        }
    }
    let row_heights: Vec<u32> = cells
        .iter()
        .map(|row| row.iter().map(RgbaImage::height).max().unwrap_or(0))
        .collect();

    let gap = layout.gap;
    let width = col_widths.iter().sum::<u32>() + gap * (columns as u32 + 1);
    let height = row_heights.iter().sum::<u32>() + gap * (cells.len() as u32 + 1);
    let mut sheet = RgbaImage::from_pixel(width.max(1), height.max(1), BACKGROUND);

    let mut y = gap;
    for (row, row_height) in cells.iter().zip(&row_heights) {
        let mut x = gap;
        for (cell, col_width) in row.iter().zip(&col_widths) {
            imageops::overlay(&mut sheet, cell, x as i64, y as i64);
            x += col_width + gap;
        }
        y += row_height + gap;
    }

    sheet
}

/// Original next to its enhanced version.
pub fn side_by_side(
    original: &DynamicImage,
    enhanced: &DynamicImage,
    layout: SheetLayout,
) -> RgbaImage {
    contact_sheet(&[vec![original.clone(), enhanced.clone()]], layout)
}
