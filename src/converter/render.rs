//! PDF output built from plain lines of text with printpdf's builtin fonts.

use printpdf::*;
use std::io::BufWriter;

use super::ConvertError;

/// Columns a text line is wrapped at
pub const WRAP_COLUMNS: usize = 90;

const FONT_SIZE: f32 = 9.0;
const LINE_HEIGHT: Mm = Mm(4.5);
const MARGIN: Mm = Mm(18.0);
const TOP: Mm = Mm(280.0);
const A4_PORTRAIT: (Mm, Mm) = (Mm(210.0), Mm(297.0));
const A4_LANDSCAPE: (Mm, Mm) = (Mm(297.0), Mm(210.0));
const MAX_CELL_WIDTH: usize = 30;

// Courier glyphs are 0.6 em wide; 1 pt = 0.3528 mm
fn char_width_mm(font_size: f32) -> f32 {
    0.6 * font_size * 0.3528
}

fn font_error(e: impl std::fmt::Display) -> ConvertError {
    ConvertError::Render(format!("PDF font error: {e}"))
}

/// Greedy word wrap; words longer than `width` are split
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let head: String = word.chars().take(width).collect();
            word = word.chars().skip(width).collect();
            lines.push(head);
        }

        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    size: (Mm, Mm),
    font_size: f32,
    y: Mm,
    pages: usize,
}

impl PageWriter {
    fn new(title: &str, size: (Mm, Mm), font_size: f32) -> Result<Self, ConvertError> {
        let (doc, page1, layer1) = PdfDocument::new(title, size.0, size.1, "Layer 1");
        let layer = doc.get_page(page1).get_layer(layer1);
        let font = doc.add_builtin_font(BuiltinFont::Courier).map_err(font_error)?;
        let bold = doc.add_builtin_font(BuiltinFont::CourierBold).map_err(font_error)?;
        let top = size.1 - (A4_PORTRAIT.1 - TOP);

        Ok(Self {
            doc,
            layer,
            font,
            bold,
            size,
            font_size,
            y: top,
            pages: 1,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(self.size.0, self.size.1, "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = self.size.1 - (A4_PORTRAIT.1 - TOP);
        self.pages += 1;
    }

    fn line(&mut self, text: &str, bold: bool) {
        if self.y < MARGIN {
            self.new_page();
        }
        let font = if bold { &self.bold } else { &self.font };
        self.layer.use_text(text, self.font_size, MARGIN, self.y, font);
        self.y -= LINE_HEIGHT;
    }

    fn gap(&mut self) {
        self.y -= LINE_HEIGHT;
    }

    fn finish(self) -> Result<Vec<u8>, ConvertError> {
        log::debug!("rendered PDF with {} page(s)", self.pages);
        let mut buf = BufWriter::new(Vec::new());
        self.doc
            .save(&mut buf)
            .map_err(|e| ConvertError::Render(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| ConvertError::Render(format!("PDF buffer error: {e}")))
    }
}

/// A4 portrait document: optional bold heading, then each line wrapped at
/// [`WRAP_COLUMNS`]. Empty input lines become vertical gaps.
pub fn text_pdf(title: &str, heading: Option<&str>, lines: &[String]) -> Result<Vec<u8>, ConvertError> {
    let mut writer = PageWriter::new(title, A4_PORTRAIT, FONT_SIZE)?;

    if let Some(heading) = heading {
        writer.line(heading, true);
        writer.gap();
    }

    for line in lines {
        if line.trim().is_empty() {
            writer.gap();
            continue;
        }
        for wrapped in wrap_text(line, WRAP_COLUMNS) {
            writer.line(&wrapped, false);
        }
    }

    writer.finish()
}

fn fit_cell(value: &str, width: usize) -> String {
    let count = value.chars().count();
    if count <= width {
        format!("{value:<width$}")
    } else {
        let mut cut: String = value.chars().take(width.saturating_sub(1)).collect();
        cut.push('~');
        cut
    }
}

/// Lay out rows as a fixed-width table; the first row is the header.
///
/// Wide tables switch to landscape, then shrink the font until the widest
/// line fits between the margins.
pub fn table_pdf(title: &str, rows: &[Vec<String>]) -> Result<Vec<u8>, ConvertError> {
    let columns = rows.iter().map(Vec::len).max().unwrap_or(0);
    let widths: Vec<usize> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|row| row.get(c))
                .map(|cell| cell.chars().count())
                .max()
                .unwrap_or(0)
                .clamp(1, MAX_CELL_WIDTH)
        })
        .collect();
    let line_chars = widths.iter().sum::<usize>() + 2 * columns.saturating_sub(1);

    let page = if line_chars > WRAP_COLUMNS {
        A4_LANDSCAPE
    } else {
        A4_PORTRAIT
    };
    let usable = page.0.0 - 2.0 * MARGIN.0;
    let font_size = if line_chars == 0 {
        FONT_SIZE
    } else {
        FONT_SIZE.min(usable / (line_chars as f32 * char_width_mm(1.0)))
    };

    let mut writer = PageWriter::new(title, page, font_size)?;
    for (i, row) in rows.iter().enumerate() {
        let line = widths
            .iter()
            .enumerate()
            .map(|(c, width)| fit_cell(row.get(c).map(String::as_str).unwrap_or(""), *width))
            .collect::<Vec<_>>()
            .join("  ");
        let line = line.trim_end();

        if i == 0 {
            writer.line(line, true);
            writer.line(&"-".repeat(line_chars), false);
        } else {
            writer.line(line, false);
        }
    }

    writer.finish()
}
